use super::view::{SortDir, SortKey};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_POLLING_MS: u64 = 10_000;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub currency_path: String,
    pub market_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "https://user26614.requestly.tech/test/api".to_string(),
            currency_path: "/currency".to_string(),
            market_path: "/market".to_string(),
        }
    }
}

impl ApiConfig {
    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn currency_url(&self) -> String {
        self.join(&self.currency_path)
    }

    pub fn market_url(&self) -> String {
        self.join(&self.market_path)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub search: String,
    pub sort_by: SortKey,
    pub sort_dir: SortDir,
    pub only_favorites: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub polling_ms: u64,
    pub request_timeout_secs: Option<u64>,
    pub favorites: Vec<String>,
    pub view: ViewConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api: ApiConfig::default(),
            polling_ms: DEFAULT_POLLING_MS,
            request_timeout_secs: None,
            favorites: Vec::new(),
            view: ViewConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config at the default location, or defaults when no file
    /// has been set up there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "mktdash", "mktdash")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
api:
  base_url: "http://localhost:8080/test/api/"
  market_path: "/tickers"
polling_ms: 5000
request_timeout_secs: 3
favorites:
  - "Xbt_Aud"
  - "Eth_Aud"
view:
  search: "xbt"
  sort_by: change24h
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.api.base_url, "http://localhost:8080/test/api/");
        assert_eq!(config.api.currency_path, "/currency");
        assert_eq!(
            config.api.market_url(),
            "http://localhost:8080/test/api/tickers"
        );
        assert_eq!(
            config.api.currency_url(),
            "http://localhost:8080/test/api/currency"
        );
        assert_eq!(config.polling_ms, 5000);
        assert_eq!(config.request_timeout_secs, Some(3));
        assert_eq!(config.favorites, vec!["Xbt_Aud", "Eth_Aud"]);
        assert_eq!(config.view.search, "xbt");
        assert_eq!(config.view.sort_by, SortKey::Change24h);
        assert_eq!(config.view.sort_dir, SortDir::Desc);
        assert!(!config.view.only_favorites);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.polling_ms, DEFAULT_POLLING_MS);
        assert_eq!(
            config.api.market_url(),
            "https://user26614.requestly.tech/test/api/market"
        );
        assert_eq!(config.view.sort_by, SortKey::Price);
    }

    #[test]
    fn test_invalid_sort_key_is_rejected() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("view:\n  sort_by: rank\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = AppConfig::load_from_path("/nonexistent/mktdash/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
