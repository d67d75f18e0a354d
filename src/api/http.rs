//! HTTP client for the device's message store.
//!
//! Thin `reqwest` wrapper for `GET/POST /api/messages`. Pure parsing in
//! `parse_messages` for testability.

use std::time::Duration;

use url::Url;

use super::types::{ApiError, MessageApi};
use crate::message::{Group, Message, OutgoingMessage};

const MESSAGES_PATH: &str = "api/messages";
const CONNECT_TIMEOUT_SECS: u64 = 5;

pub struct HttpMessageApi {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpMessageApi {
    /// Build a client for the store rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &Url, request_timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint: messages_endpoint(base_url) })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl MessageApi for HttpMessageApi {
    async fn fetch_messages(&self, group: Group) -> Result<Vec<Message>, ApiError> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("group", group.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        parse_messages(status, &text)
    }

    async fn post_message(&self, message: &OutgoingMessage) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .form(message)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        Ok(())
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Join the messages path onto `base_url`, keeping any path prefix the base carries.
fn messages_endpoint(base_url: &Url) -> Url {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);
    // Joining a relative path onto an http(s) base cannot fail.
    base.join(MESSAGES_PATH).unwrap_or(base)
}

fn parse_messages(status: u16, body: &str) -> Result<Vec<Message>, ApiError> {
    if status != 200 {
        return Err(ApiError::Status { status, body: body.to_owned() });
    }
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
