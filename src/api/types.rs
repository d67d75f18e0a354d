//! API error type and the client trait.

use crate::message::{Group, Message, OutgoingMessage};

// =============================================================================
// ERROR
// =============================================================================

/// Failures talking to the message store.
///
/// The sync client treats every variant the same way (log and keep polling);
/// the split exists for logs and for send status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure: connect, timeout, or body read.
    #[error("request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("unexpected status {status}")]
    Status { status: u16, body: String },

    /// The response body was not a JSON array of messages.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// CLIENT TRAIT
// =============================================================================

/// Client for the remote message store. Enables mocking in tests.
#[async_trait::async_trait]
pub trait MessageApi: Send + Sync {
    /// Fetch every message stored for `group`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure, non-200 status, or an
    /// undecodable body.
    async fn fetch_messages(&self, group: Group) -> Result<Vec<Message>, ApiError>;

    /// Post a new message.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or a non-success status.
    async fn post_message(&self, message: &OutgoingMessage) -> Result<(), ApiError>;
}
