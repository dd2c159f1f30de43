//! Domain types, normalization and the derived view

pub mod coerce;
pub mod config;
pub mod currency;
pub mod feed;
pub mod format;
pub mod log;
pub mod market;
pub mod state;
pub mod view;

// Re-export main types for cleaner imports
pub use currency::{CurrencyCatalog, CurrencyMeta};
pub use feed::{Endpoint, FetchError, MarketFeed};
pub use market::CoinRow;
pub use state::MarketState;
pub use view::{SortDir, SortKey, ViewState};
