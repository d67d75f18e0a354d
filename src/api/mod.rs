//! Message-store API: the device's `/api/messages` endpoints.
//!
//! DESIGN
//! ======
//! The sync client talks to the store through the `MessageApi` trait so tests
//! can substitute an in-process mock. `HttpMessageApi` is the real
//! implementation over `reqwest`.

pub mod http;
pub mod types;

pub use http::HttpMessageApi;
pub use types::{ApiError, MessageApi};
