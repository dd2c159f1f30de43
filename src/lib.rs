pub mod cli;
pub mod core;
pub mod poller;
pub mod providers;
pub mod store;

use crate::cli::board::BoardOptions;
use crate::core::MarketState;
use crate::core::config::AppConfig;
use crate::providers::HttpMarketFeed;
use crate::store::MarketStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Currencies,
    Market(BoardOptions),
    Watch(BoardOptions),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("mktdash starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let feed = HttpMarketFeed::new(
        &config.api,
        config.request_timeout_secs.map(Duration::from_secs),
    )?;
    let mut state = MarketState::from_config(&config);

    match command {
        AppCommand::Currencies => {
            let store = MarketStore::new(Arc::new(feed), state);
            cli::currencies::run(&store).await
        }
        AppCommand::Market(options) => {
            options.apply(&mut state);
            let store = MarketStore::new(Arc::new(feed), state);
            cli::board::run(&store, &options).await
        }
        AppCommand::Watch(options) => {
            options.apply(&mut state);
            let store = MarketStore::new(Arc::new(feed), state);
            cli::board::watch(&store, &options).await
        }
    }
}
