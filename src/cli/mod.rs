//! Terminal presentation of the store

pub mod board;
pub mod currencies;
pub mod setup;
pub mod ui;
