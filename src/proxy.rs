//! Local caching proxy: runs the asset cache worker in front of the device.
//!
//! DESIGN
//! ======
//! Every request lands on one fallback handler. The handler rebuilds the URL
//! against the upstream origin, decides whether the request is a top-level
//! navigation, and hands it to `AssetCacheWorker::handle_fetch`. The worker
//! always answers, so the handler never produces its own error pages except
//! for unreadable request bodies.
//!
//! A navigation registers the requesting address as a page controlled by the
//! worker. Serve the router with connect info
//! (`into_make_service_with_connect_info::<SocketAddr>()`).
//!
//! Responses carry an `x-cache` header (`hit`, `miss`, or `synthetic`) naming
//! where the body came from.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};
use url::Url;

use crate::cache::network::is_hop_by_hop;
use crate::cache::{AssetCacheWorker, FetchRequest, FetchResponse, RequestMode, ResponseSource};

/// Largest request body forwarded upstream.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const CACHE_STATUS_HEADER: &str = "x-cache";
const SEC_FETCH_MODE: &str = "sec-fetch-mode";

#[derive(Clone)]
struct ProxyState {
    worker: Arc<AssetCacheWorker>,
    upstream: Arc<Url>,
}

/// Build the proxy router for `worker`, forwarding misses to `upstream`.
#[must_use]
pub fn app(worker: Arc<AssetCacheWorker>, upstream: Url) -> Router {
    Router::new()
        .fallback(handle)
        .layer(TraceLayer::new_for_http())
        .with_state(ProxyState { worker, upstream: Arc::new(upstream) })
}

async fn handle(
    State(state): State<ProxyState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            warn!(uri = %parts.uri, error = %e, "request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let mode = if is_navigation(&parts.method, &parts.headers) {
        let client = peer.ip().to_string();
        if !state.worker.controls(&client) {
            debug!(%client, "page opened");
            state.worker.register_client(client);
        }
        RequestMode::Navigate
    } else {
        RequestMode::Subresource
    };
    let request = FetchRequest {
        method: parts.method,
        url: upstream_url(&state.upstream, &parts.uri),
        headers: header_pairs(&parts.headers),
        body,
        mode,
    };

    into_response(state.worker.handle_fetch(request).await)
}

// =============================================================================
// REQUEST MAPPING
// =============================================================================

/// The upstream URL for an incoming request: same path and query, upstream origin.
pub(crate) fn upstream_url(upstream: &Url, uri: &Uri) -> Url {
    let mut url = upstream.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    url
}

/// A request is a navigation when the browser says so, or when it is a GET
/// asking for HTML (clients that do not send fetch metadata).
pub(crate) fn is_navigation(method: &Method, headers: &HeaderMap) -> bool {
    if let Some(mode) = headers.get(SEC_FETCH_MODE).and_then(|v| v.to_str().ok()) {
        return mode.eq_ignore_ascii_case("navigate");
    }
    *method == Method::GET
        && headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"))
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
        .collect()
}

// =============================================================================
// RESPONSE MAPPING
// =============================================================================

fn cache_status(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Cache => "hit",
        ResponseSource::Network => "miss",
        ResponseSource::Synthetic => "synthetic",
    }
}

fn into_response(fetched: FetchResponse) -> Response {
    let status = StatusCode::from_u16(fetched.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let label = cache_status(fetched.source);

    let mut response = Response::new(Body::from(fetched.body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    for (name, value) in &fetched.headers {
        if is_hop_by_hop(name) || name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) else {
            continue;
        };
        headers.append(name, value);
    }
    headers.insert(HeaderName::from_static(CACHE_STATUS_HEADER), HeaderValue::from_static(label));
    response
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;
