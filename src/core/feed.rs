//! Upstream feed abstraction and its error taxonomy

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Display;
use thiserror::Error;

/// The two upstream endpoints the dashboard reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Currency,
    Market,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Endpoint::Currency => "Currency",
                Endpoint::Market => "Market",
            }
        )
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    /// Non-2xx response.
    #[error("{endpoint} API {status}")]
    Status { endpoint: Endpoint, status: u16 },

    /// Body was not valid JSON. Shown as the parser's own message.
    #[error("{source}")]
    Parse {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },

    /// Connection, timeout or body read failure.
    #[error("{endpoint} API request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
}

/// Fetches raw JSON bodies from the upstream endpoints. Shape handling is
/// left to the normalizers.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn fetch_currencies(&self) -> Result<Value, FetchError>;
    async fn fetch_market(&self) -> Result<Value, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_embeds_code() {
        let err = FetchError::Status {
            endpoint: Endpoint::Market,
            status: 503,
        };
        assert_eq!(err.to_string(), "Market API 503");

        let err = FetchError::Status {
            endpoint: Endpoint::Currency,
            status: 404,
        };
        assert_eq!(err.to_string(), "Currency API 404");
    }

    #[test]
    fn test_parse_message_is_the_parser_message() {
        let source = serde_json::from_str::<Value>("{oops").unwrap_err();
        let cause = source.to_string();
        let err = FetchError::Parse {
            endpoint: Endpoint::Currency,
            source,
        };
        assert_eq!(err.to_string(), cause);
    }
}
