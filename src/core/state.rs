use super::config::AppConfig;
use super::currency::CurrencyCatalog;
use super::market::{CoinRow, FALLBACK_QUOTE};
use super::view::ViewState;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Everything the presentation layer reads: catalog, row snapshot, fetch
/// status and the UI inputs of the derived view.
#[derive(Debug, Clone)]
pub struct MarketState {
    pub currencies: Vec<String>,
    pub currency_meta: CurrencyCatalog,
    pub base_currency: String,

    pub coins: Vec<CoinRow>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,

    pub view: ViewState,
    pub polling: Duration,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            currencies: Vec::new(),
            currency_meta: CurrencyCatalog::new(),
            base_currency: FALLBACK_QUOTE.to_string(),
            coins: Vec::new(),
            loading: false,
            error: None,
            last_updated: None,
            view: ViewState::default(),
            polling: Duration::from_millis(super::config::DEFAULT_POLLING_MS),
        }
    }
}

impl MarketState {
    /// Initial state seeded from the view and polling settings in `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            view: ViewState {
                search: config.view.search.clone(),
                sort_by: config.view.sort_by,
                sort_dir: config.view.sort_dir,
                favorites: config.favorites.iter().cloned().collect(),
                only_favorites: config.view.only_favorites,
            },
            polling: Duration::from_millis(config.polling_ms),
            ..Self::default()
        }
    }

    /// Replaces the catalog wholesale and re-selects the base currency.
    pub fn apply_catalog(&mut self, catalog: CurrencyCatalog) {
        if let Some(base) = catalog.preferred_base() {
            self.base_currency = base.to_string();
        }
        self.currencies = catalog.codes().to_vec();
        self.currency_meta = catalog;
    }

    /// Replaces the row snapshot and stamps the update time.
    pub fn apply_market(&mut self, coins: Vec<CoinRow>, at: DateTime<Utc>) {
        self.coins = coins;
        self.last_updated = Some(at);
    }
}
