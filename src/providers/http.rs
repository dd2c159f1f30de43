use crate::core::config::ApiConfig;
use crate::core::feed::{Endpoint, FetchError, MarketFeed};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("mktdash/", env!("CARGO_PKG_VERSION"));

/// Reads both endpoints over plain HTTP GET.
#[derive(Clone)]
pub struct HttpMarketFeed {
    http: reqwest::Client,
    currency_url: String,
    market_url: String,
}

impl HttpMarketFeed {
    pub fn new(api: &ApiConfig, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            currency_url: api.currency_url(),
            market_url: api.market_url(),
        })
    }

    #[instrument(name = "FeedFetch", skip_all, fields(endpoint = %endpoint), level = "debug")]
    async fn get_json(&self, endpoint: Endpoint, url: &str) -> Result<Value, FetchError> {
        debug!("Requesting {}", url);
        let transport = |source| FetchError::Transport { endpoint, source };

        let response = self.http.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(transport)?;
        debug!(bytes = text.len(), "Received response body");
        serde_json::from_str(&text).map_err(|source| FetchError::Parse { endpoint, source })
    }
}

#[async_trait]
impl MarketFeed for HttpMarketFeed {
    async fn fetch_currencies(&self) -> Result<Value, FetchError> {
        self.get_json(Endpoint::Currency, &self.currency_url).await
    }

    async fn fetch_market(&self) -> Result<Value, FetchError> {
        self.get_json(Endpoint::Market, &self.market_url).await
    }
}
