//! Network access for the asset cache worker.
//!
//! `HttpNetwork` forwards requests with `reqwest` and classifies each response
//! as same-origin (`Basic`) or cross-origin (`Cors`) relative to the origin the
//! worker serves.

use std::time::Duration;

use tracing::debug;
use url::{Origin, Url};

use super::types::{FetchRequest, FetchResponse, NetworkError, ResponseSource, ResponseType};

const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Headers that describe a single hop and must not be forwarded.
pub(crate) const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "host",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Fetches a request from the network. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] only when no response was received at all;
    /// error statuses are ordinary responses.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError>;
}

pub struct HttpNetwork {
    http: reqwest::Client,
    origin: Origin,
}

impl HttpNetwork {
    /// Build a network client whose same-origin responses are those from `origin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(origin: &Url, request_timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| NetworkError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, origin: origin.origin() })
    }

    fn classify(&self, request_url: &Url, final_url: &Url) -> ResponseType {
        if request_url.origin() == self.origin && final_url.origin() == self.origin {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait::async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        let mut builder = self.http.request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| NetworkError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let response_type = self.classify(&request.url, response.url());
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()) && name.as_str() != "content-length")
            .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Request(e.to_string()))?
            .to_vec();

        debug!(url = %request.url, status, ?response_type, "network fetch");
        Ok(FetchResponse { status, headers, body, response_type, source: ResponseSource::Network })
    }
}

pub(crate) fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

#[cfg(test)]
#[path = "network_test.rs"]
mod tests;
