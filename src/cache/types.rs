//! Request, response, and cache entry types for the asset cache worker.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache metadata is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("worker lifecycle step not allowed in state {0:?}")]
    InvalidState(super::worker::WorkerState),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network request failed: {0}")]
    Request(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// REQUEST
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level page load.
    Navigate,
    /// Script, stylesheet, image, API call.
    #[default]
    Subresource,
}

#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub mode: RequestMode,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: Vec::new(), body: Vec::new(), mode: RequestMode::Subresource }
    }

    #[must_use]
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    #[must_use]
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Cache key: the URL without its fragment.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Mirrors the browser's response tainting: only `Basic` (same-origin)
/// responses are eligible for caching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    Basic,
    Cors,
    Opaque,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// Built by the worker itself (offline error).
    Synthetic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub response_type: ResponseType,
    pub source: ResponseSource,
}

impl FetchResponse {
    /// Whether this response may be stored: status 200 and same-origin.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    /// Synthetic `408` returned when an asset cannot be fetched at all.
    #[must_use]
    pub fn offline() -> Self {
        Self::synthetic(408, "Network error happened")
    }

    /// Synthetic `502` for pass-through requests whose network fetch failed.
    #[must_use]
    pub fn bad_gateway() -> Self {
        Self::synthetic(502, "Bad gateway")
    }

    fn synthetic(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: body.as_bytes().to_vec(),
            response_type: ResponseType::Error,
            source: ResponseSource::Synthetic,
        }
    }

    #[must_use]
    pub fn from_cache(entry: &CacheEntry) -> Self {
        Self {
            status: entry.status,
            headers: entry.headers.clone(),
            body: entry.body.clone(),
            response_type: entry.response_type,
            source: ResponseSource::Cache,
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// =============================================================================
// CACHE ENTRY
// =============================================================================

/// A captured response, keyed by request URL within a named cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Stored next to the metadata on disk, not inside it.
    #[serde(skip)]
    pub body: Vec<u8>,
    pub response_type: ResponseType,
    /// Milliseconds since the Unix epoch.
    pub cached_at: u64,
}

impl CacheEntry {
    #[must_use]
    pub fn capture(url: impl Into<String>, response: &FetchResponse) -> Self {
        let cached_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        Self {
            url: url.into(),
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            response_type: response.response_type,
            cached_at,
        }
    }
}
