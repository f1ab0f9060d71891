use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_STORE_PATH: &str = "tracking_data.json";
const DEFAULT_FALLBACK_REDIRECT_URL: &str = "https://google.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub store_path: Option<PathBuf>,
    pub fallback_redirect_url: String,
    pub production: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TRACKER_BIND_ADDR value '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr_raw = env::var("TRACKER_BIND_ADDR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let bind_addr = bind_addr_raw
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind_addr_raw,
                source,
            })?;

        let log_filter = env::var("TRACKER_LOG_FILTER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let store_path = env::var("TRACKER_STORE_PATH")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(DEFAULT_STORE_PATH)));

        let fallback_redirect_url = env::var("TRACKER_FALLBACK_REDIRECT_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_FALLBACK_REDIRECT_URL.to_string());

        let production = env::var("TRACKER_ENV")
            .ok()
            .map(|value| value.trim().to_lowercase() == "production")
            .unwrap_or(false);

        Ok(Self {
            bind_addr,
            log_filter,
            store_path,
            fallback_redirect_url,
            production,
        })
    }
}

#[cfg(test)]
impl Config {
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_filter: "debug".to_string(),
            store_path: None,
            fallback_redirect_url: "https://fallback.example/home".to_string(),
            production: false,
        }
    }
}
