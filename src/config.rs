//! Runtime configuration parsed from environment variables.
//!
//! Every knob has a default so the client runs against a stock device with no
//! environment at all.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://192.168.4.1";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATE_PATH: &str = ".embedcord/state.json";
pub const DEFAULT_CACHE_VERSION: &str = "vite-app-cache-v1";
pub const DEFAULT_CACHE_DIR: &str = ".embedcord/cache";
pub const DEFAULT_PROXY_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL in {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("EMBEDCORD_POLL_INTERVAL_MS must be greater than zero")]
    ZeroPollInterval,
}

// =============================================================================
// CHAT
// =============================================================================

/// Settings for the chat sync client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Device origin, without trailing slash.
    pub base_url: Url,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Where the persisted username lives.
    pub state_path: PathBuf,
}

impl ChatConfig {
    /// Build from environment variables.
    ///
    /// - `EMBEDCORD_BASE_URL`: device origin (default `http://192.168.4.1`)
    /// - `EMBEDCORD_POLL_INTERVAL_MS`: default 1000
    /// - `EMBEDCORD_REQUEST_TIMEOUT_SECS`: default 10
    /// - `EMBEDCORD_STATE_PATH`: default `.embedcord/state.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the poll interval is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let poll_interval_ms = env_parse("EMBEDCORD_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS);
        if poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(Self {
            base_url: env_url("EMBEDCORD_BASE_URL", DEFAULT_BASE_URL)?,
            poll_interval: Duration::from_millis(poll_interval_ms),
            request_timeout: Duration::from_secs(env_parse(
                "EMBEDCORD_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            state_path: std::env::var("EMBEDCORD_STATE_PATH")
                .map_or_else(|_| PathBuf::from(DEFAULT_STATE_PATH), PathBuf::from),
        })
    }
}

// =============================================================================
// PROXY
// =============================================================================

/// Settings for the asset caching proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Origin the proxy forwards cache misses to.
    pub upstream: Url,
    pub cache_version: String,
    pub cache_dir: PathBuf,
    pub port: u16,
    pub request_timeout: Duration,
}

impl ProxyConfig {
    /// Build from environment variables.
    ///
    /// - `EMBEDCORD_UPSTREAM`: defaults to `EMBEDCORD_BASE_URL`, then the stock device
    /// - `EMBEDCORD_CACHE_VERSION`: default `vite-app-cache-v1`
    /// - `EMBEDCORD_CACHE_DIR`: default `.embedcord/cache`
    /// - `PORT`: default 8080
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let upstream = match std::env::var("EMBEDCORD_UPSTREAM") {
            Ok(raw) => parse_url("EMBEDCORD_UPSTREAM", &raw)?,
            Err(_) => env_url("EMBEDCORD_BASE_URL", DEFAULT_BASE_URL)?,
        };
        Ok(Self {
            upstream,
            cache_version: std::env::var("EMBEDCORD_CACHE_VERSION").unwrap_or_else(|_| DEFAULT_CACHE_VERSION.into()),
            cache_dir: std::env::var("EMBEDCORD_CACHE_DIR").map_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR), PathBuf::from),
            port: env_parse("PORT", DEFAULT_PROXY_PORT),
            request_timeout: Duration::from_secs(env_parse(
                "EMBEDCORD_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
        })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_url(var: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_owned());
    parse_url(var, &raw)
}

/// Parse an origin URL, dropping any trailing slash from the path.
pub(crate) fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl { var, value: raw.to_owned() };
    let url = Url::parse(raw.trim_end_matches('/')).map_err(|_| invalid())?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    Ok(url)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
