//! Application state and the actions the presentation layer calls.

use crate::core::currency::normalize_currencies;
use crate::core::market::normalize_market;
use crate::core::view::derive_view;
use crate::core::{CoinRow, MarketFeed, MarketState, SortKey};
use crate::poller::Poller;
use chrono::Utc;
use futures::FutureExt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

/// State and feed shared with the polling task.
struct Shared {
    feed: Arc<dyn MarketFeed>,
    state: RwLock<MarketState>,
    revision: watch::Sender<u64>,
}

/// Clears the loading flag when a market fetch ends, including when the
/// fetch future is dropped mid-flight.
struct LoadingGuard<'a>(&'a Shared);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.write().loading = false;
        self.0.bump();
    }
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, MarketState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MarketState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    #[instrument(name = "FetchCurrencies", skip(self))]
    async fn fetch_currencies(&self) {
        match self.feed.fetch_currencies().await {
            Ok(payload) => {
                let catalog = normalize_currencies(&payload);
                let mut state = self.write();
                state.apply_catalog(catalog);
                debug!(
                    currencies = state.currencies.len(),
                    base = %state.base_currency,
                    "Currency catalog replaced"
                );
            }
            Err(e) => {
                warn!(error = %e, "Currency fetch failed");
                self.write().error = Some(e.to_string());
            }
        }
        self.bump();
    }

    #[instrument(name = "FetchMarket", skip(self))]
    async fn fetch_market(&self) {
        let base_currency = {
            let mut state = self.write();
            state.loading = true;
            state.error = None;
            state.base_currency.clone()
        };
        self.bump();
        let _loading = LoadingGuard(self);

        match self.feed.fetch_market().await {
            Ok(payload) => {
                let coins = normalize_market(&payload, Some(&base_currency));
                debug!(rows = coins.len(), "Market snapshot replaced");
                self.write().apply_market(coins, Utc::now());
            }
            Err(e) => {
                warn!(error = %e, "Market fetch failed");
                self.write().error = Some(e.to_string());
            }
        }
    }
}

/// The dashboard's single application-state object.
///
/// Construct one per session and pass it by reference. Dropping it, or
/// calling [`MarketStore::dispose`], stops polling.
pub struct MarketStore {
    shared: Arc<Shared>,
    poller: Poller,
}

impl MarketStore {
    pub fn new(feed: Arc<dyn MarketFeed>, initial: MarketState) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                feed,
                state: RwLock::new(initial),
                revision,
            }),
            poller: Poller::new(),
        }
    }

    /// Replaces the currency catalog and re-selects the base currency. On
    /// failure the previous catalog stays and `error` is set.
    pub async fn fetch_currencies(&self) {
        self.shared.fetch_currencies().await
    }

    /// Replaces the row snapshot using the base currency current at call
    /// time. On failure the previous rows stay and `error` is set.
    pub async fn fetch_market(&self) {
        self.shared.fetch_market().await
    }

    /// Fetches the market now and then on every polling interval.
    pub fn start_polling(&self) {
        let every = self.shared.read().polling;
        let shared = Arc::clone(&self.shared);
        self.poller.start(
            every,
            Box::new(move || {
                let shared = Arc::clone(&shared);
                async move { shared.fetch_market().await }.boxed()
            }),
        );
    }

    pub fn stop_polling(&self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Changes the interval used by the next [`MarketStore::start_polling`].
    pub fn set_polling_interval(&self, every: Duration) {
        self.shared.write().polling = every;
    }

    /// Stops polling and releases the timer.
    pub fn dispose(&self) {
        debug!("Disposing market store");
        self.stop_polling();
    }

    /// Adds or removes a row key from the favorites. Returns whether the key
    /// is a favorite afterwards.
    pub fn toggle_favorite(&self, key: &str) -> bool {
        let mut state = self.shared.write();
        let favorites = &mut state.view.favorites;
        let now_favorite = if favorites.remove(key) {
            false
        } else {
            favorites.insert(key.to_string());
            true
        };
        drop(state);
        self.shared.bump();
        now_favorite
    }

    /// Selecting the current key flips the direction; a new key starts
    /// descending.
    pub fn set_sort(&self, key: SortKey) {
        let mut state = self.shared.write();
        if state.view.sort_by == key {
            state.view.sort_dir = state.view.sort_dir.toggled();
        } else {
            state.view.sort_by = key;
            state.view.sort_dir = Default::default();
        }
        drop(state);
        self.shared.bump();
    }

    pub fn set_search(&self, search: &str) {
        self.shared.write().view.search = search.to_string();
        self.shared.bump();
    }

    pub fn set_only_favorites(&self, only: bool) {
        self.shared.write().view.only_favorites = only;
        self.shared.bump();
    }

    /// Overrides the base currency used by the next market fetch.
    pub fn set_base_currency(&self, code: &str) {
        self.shared.write().base_currency = code.to_uppercase();
        self.shared.bump();
    }

    /// The filtered and sorted rows for the current view settings.
    pub fn filtered_sorted_coins(&self) -> Vec<CoinRow> {
        let state = self.shared.read();
        derive_view(&state.coins, &state.view)
    }

    pub fn snapshot(&self) -> MarketState {
        self.shared.read().clone()
    }

    /// Notifies on every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}

impl Drop for MarketStore {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feed::{Endpoint, FetchError};
    use crate::core::view::SortDir;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tokio::time::sleep;

    type Scripted = Mutex<VecDeque<Result<Value, FetchError>>>;

    /// Replays queued responses; an empty queue answers with an empty list.
    #[derive(Default)]
    struct ScriptedFeed {
        currencies: Scripted,
        market: Scripted,
        market_calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedFeed {
        fn with_currencies(self, response: Result<Value, FetchError>) -> Self {
            self.currencies.lock().unwrap().push_back(response);
            self
        }

        fn with_market(self, response: Result<Value, FetchError>) -> Self {
            self.market.lock().unwrap().push_back(response);
            self
        }
    }

    #[async_trait]
    impl MarketFeed for ScriptedFeed {
        async fn fetch_currencies(&self) -> Result<Value, FetchError> {
            self.currencies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!([])))
        }

        async fn fetch_market(&self) -> Result<Value, FetchError> {
            self.market_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.market
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!([])))
        }
    }

    fn status(endpoint: Endpoint, status: u16) -> Result<Value, FetchError> {
        Err(FetchError::Status { endpoint, status })
    }

    fn store_with(feed: ScriptedFeed) -> (MarketStore, Arc<ScriptedFeed>) {
        let feed = Arc::new(feed);
        let store = MarketStore::new(feed.clone(), MarketState::default());
        (store, feed)
    }

    fn xbt_aud() -> Value {
        json!({
            "pair": { "primary": "Xbt", "secondary": "Aud" },
            "price": { "last": 50000, "bestBid": 49990, "bestOffer": 50010,
                       "change": { "percent": 3.2, "direction": "up" } },
            "volume": { "secondary": 120000 }
        })
    }

    #[tokio::test]
    async fn test_fetch_currencies_selects_base() {
        let (store, _) = store_with(
            ScriptedFeed::default()
                .with_currencies(Ok(json!({ "currencies": [{ "code": "eur" }, { "code": "aud" }] }))),
        );
        store.fetch_currencies().await;

        let state = store.snapshot();
        assert_eq!(state.currencies, vec!["EUR", "AUD"]);
        assert_eq!(state.base_currency, "AUD");
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_currency_fetch_keeps_catalog() {
        let (store, _) = store_with(
            ScriptedFeed::default()
                .with_currencies(Ok(json!([{ "code": "usd" }])))
                .with_currencies(status(Endpoint::Currency, 502)),
        );
        store.fetch_currencies().await;
        store.fetch_currencies().await;

        let state = store.snapshot();
        assert_eq!(state.currencies, vec!["USD"]);
        assert!(state.currency_meta.contains("USD"));
        assert_eq!(state.error.as_deref(), Some("Currency API 502"));
    }

    #[tokio::test]
    async fn test_fetch_market_replaces_rows() {
        let (store, _) = store_with(
            ScriptedFeed::default()
                .with_market(Ok(json!({ "data": [xbt_aud()] })))
                .with_market(Ok(json!([{ "symbol": "eth" }]))),
        );
        store.fetch_market().await;
        let first = store.snapshot();
        assert_eq!(first.coins.len(), 1);
        assert_eq!(first.coins[0].id, "Xbt_Aud");
        assert!(first.last_updated.is_some());
        assert!(!first.loading);

        store.fetch_market().await;
        let second = store.snapshot();
        assert_eq!(second.coins.len(), 1);
        assert_eq!(second.coins[0].id, "eth_USD");
        assert!(second.last_updated >= first.last_updated);
    }

    #[tokio::test]
    async fn test_failed_market_fetch_keeps_rows() {
        let (store, _) = store_with(
            ScriptedFeed::default()
                .with_market(Ok(json!([xbt_aud()])))
                .with_market(status(Endpoint::Market, 500)),
        );
        store.fetch_market().await;
        let before = store.snapshot();

        store.fetch_market().await;
        let after = store.snapshot();
        assert_eq!(after.coins, before.coins);
        assert_eq!(after.last_updated, before.last_updated);
        assert_eq!(after.error.as_deref(), Some("Market API 500"));
        assert!(!after.loading);
    }

    #[tokio::test]
    async fn test_market_fetch_clears_previous_error() {
        let (store, _) = store_with(
            ScriptedFeed::default()
                .with_market(status(Endpoint::Market, 500))
                .with_market(Ok(json!([]))),
        );
        store.fetch_market().await;
        assert!(store.snapshot().error.is_some());
        store.fetch_market().await;
        assert!(store.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_loading_flag_spans_the_fetch() {
        let gate = Arc::new(Notify::new());
        let feed = ScriptedFeed {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        let (store, _) = store_with(feed);
        let mut updates = store.subscribe();

        let fetch = store.fetch_market();
        tokio::pin!(fetch);
        tokio::select! {
            _ = &mut fetch => panic!("fetch should wait on the gate"),
            _ = updates.changed() => {}
        }
        assert!(store.snapshot().loading);

        gate.notify_one();
        fetch.await;
        assert!(!store.snapshot().loading);
    }

    #[tokio::test]
    async fn test_market_rows_use_current_base() {
        let (store, _) = store_with(ScriptedFeed::default().with_market(Ok(json!([{ "symbol": "btc" }]))));
        store.set_base_currency("aud");
        store.fetch_market().await;
        assert_eq!(store.snapshot().coins[0].name, "btc/AUD");
    }

    #[tokio::test]
    async fn test_toggle_favorite_twice_restores_set() {
        let (store, _) = store_with(ScriptedFeed::default());
        let before = store.snapshot().view.favorites;

        assert!(store.toggle_favorite("Xbt_Aud"));
        assert!(store.snapshot().view.favorites.contains("Xbt_Aud"));
        assert!(!store.toggle_favorite("Xbt_Aud"));
        assert_eq!(store.snapshot().view.favorites, before);
    }

    #[tokio::test]
    async fn test_set_sort_toggles_and_switches() {
        let (store, _) = store_with(ScriptedFeed::default());
        let view = || store.snapshot().view;
        assert_eq!((view().sort_by, view().sort_dir), (SortKey::Price, SortDir::Desc));

        store.set_sort(SortKey::Price);
        assert_eq!(view().sort_dir, SortDir::Asc);
        store.set_sort(SortKey::Price);
        assert_eq!(view().sort_dir, SortDir::Desc);

        store.set_sort(SortKey::Price);
        store.set_sort(SortKey::Name);
        assert_eq!((view().sort_by, view().sort_dir), (SortKey::Name, SortDir::Desc));
    }

    #[tokio::test]
    async fn test_filtered_sorted_coins_follows_view() {
        let (store, _) = store_with(ScriptedFeed::default().with_market(Ok(json!([
            xbt_aud(),
            { "pair": { "primary": "Eth", "secondary": "Usd" }, "price": { "last": 3000 } }
        ]))));
        store.fetch_market().await;

        let ids = |rows: Vec<CoinRow>| rows.into_iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(store.filtered_sorted_coins()), vec!["Xbt_Aud", "Eth_Usd"]);

        store.set_search("eth");
        assert_eq!(ids(store.filtered_sorted_coins()), vec!["Eth_Usd"]);

        store.set_search("");
        store.set_only_favorites(true);
        assert_eq!(store.filtered_sorted_coins().len(), 2);
        store.toggle_favorite("Xbt_Aud");
        assert_eq!(ids(store.filtered_sorted_coins()), vec!["Xbt_Aud"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_fetches_until_disposed() {
        let (store, feed) = store_with(ScriptedFeed::default());
        store.set_polling_interval(Duration::from_millis(100));
        store.start_polling();
        assert!(store.is_polling());

        sleep(Duration::from_millis(250)).await;
        assert_eq!(feed.market_calls.load(Ordering::SeqCst), 3);

        store.dispose();
        assert!(!store.is_polling());
        sleep(Duration::from_millis(500)).await;
        assert_eq!(feed.market_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_survives_failed_ticks() {
        let (store, feed) = store_with(
            ScriptedFeed::default()
                .with_market(status(Endpoint::Market, 500))
                .with_market(Ok(json!([xbt_aud()]))),
        );
        store.set_polling_interval(Duration::from_millis(100));
        store.start_polling();

        sleep(Duration::from_millis(150)).await;
        let state = store.snapshot();
        assert_eq!(feed.market_calls.load(Ordering::SeqCst), 2);
        assert!(state.error.is_none());
        assert_eq!(state.coins.len(), 1);
    }
}
