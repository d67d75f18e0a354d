//! Asset cache worker: lifecycle and the cache-first fetch policy.
//!
//! DESIGN
//! ======
//! Lifecycle is `Installing → Activating → Active`, with `Redundant` once a
//! worker is retired. Install never waits for older workers (skip waiting)
//! and pre-caches nothing: asset names are content-hashed, so entries are
//! filled lazily as pages request them. Activation deletes every cache whose
//! name is not this worker's version tag, then claims all known clients.
//!
//! FETCH POLICY
//! ============
//! - non-GET, worker not yet active, or a live API path (`/api/`): straight
//!   to the network, never cached
//! - cache hit in the current version: served without touching the network
//! - miss: network; a 200 same-origin response is stored before returning
//! - network failure: navigations get the cached shell document, everything
//!   else a synthetic 408
//!
//! ERROR HANDLING
//! ==============
//! `handle_fetch` never fails. Cache read errors count as misses and cache
//! write errors are logged; the caller always gets a response.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reqwest::Method;
use tracing::{debug, info, warn};

use super::network::Network;
use super::storage::CacheStorage;
use super::types::{CacheEntry, CacheError, FetchRequest, FetchResponse};

/// Shell documents tried, in order, when a navigation cannot reach the network.
const SHELL_PATHS: [&str; 2] = ["/index.html", "/"];

/// Path prefixes whose responses change between requests and are never cached.
const NETWORK_ONLY_PREFIXES: [&str; 1] = ["/api/"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Activating,
    Active,
    Redundant,
}

/// Outcome of activation, for logging and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub deleted_caches: Vec<String>,
    pub claimed_clients: usize,
}

pub struct AssetCacheWorker {
    version: String,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: Mutex<WorkerState>,
    /// Page id -> version of the worker controlling it, if any.
    clients: Mutex<HashMap<String, Option<String>>>,
}

impl AssetCacheWorker {
    #[must_use]
    pub fn new(version: impl Into<String>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            version: version.into(),
            storage,
            network,
            state: Mutex::new(WorkerState::Installing),
            clients: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_state(&self, next: WorkerState) {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        debug!(version = %self.version, from = ?*state, to = ?next, "worker state change");
        *state = next;
    }

    /// Install and immediately move on to activation (skip waiting).
    ///
    /// # Errors
    ///
    /// Returns an error if the worker was already retired.
    pub fn install(&self) -> Result<(), CacheError> {
        let state = self.state();
        if state != WorkerState::Installing {
            return Err(CacheError::InvalidState(state));
        }
        info!(version = %self.version, "worker installing; skipping wait");
        self.set_state(WorkerState::Activating);
        Ok(())
    }

    /// Delete caches from other versions, claim clients, and go active.
    ///
    /// # Errors
    ///
    /// Returns an error if cache storage fails or the worker is not installed.
    pub async fn activate(&self) -> Result<ActivationReport, CacheError> {
        let state = self.state();
        if state != WorkerState::Activating {
            return Err(CacheError::InvalidState(state));
        }

        let mut deleted_caches = Vec::new();
        for name in self.storage.keys().await? {
            if name != self.version && self.storage.delete(&name).await? {
                deleted_caches.push(name);
            }
        }
        let claimed_clients = self.claim();
        self.set_state(WorkerState::Active);

        info!(version = %self.version, deleted = ?deleted_caches, claimed_clients, "worker active");
        Ok(ActivationReport { deleted_caches, claimed_clients })
    }

    /// Install then activate.
    ///
    /// # Errors
    ///
    /// Returns an error if either step fails.
    pub async fn start(&self) -> Result<ActivationReport, CacheError> {
        self.install()?;
        self.activate().await
    }

    /// Retire this worker; it stops intercepting and only passes requests through.
    pub fn retire(&self) {
        self.set_state(WorkerState::Redundant);
    }

    // =========================================================================
    // CLIENTS
    // =========================================================================

    /// Track an open page. Pages opened while active are controlled at once.
    pub fn register_client(&self, id: impl Into<String>) {
        let controller = (self.state() == WorkerState::Active).then(|| self.version.clone());
        self.lock_clients().insert(id.into(), controller);
    }

    /// Number of tracked pages this worker controls.
    #[must_use]
    pub fn controlled_clients(&self) -> usize {
        self.lock_clients()
            .values()
            .filter(|c| c.as_deref() == Some(self.version.as_str()))
            .count()
    }

    pub fn unregister_client(&self, id: &str) {
        self.lock_clients().remove(id);
    }

    #[must_use]
    pub fn controls(&self, id: &str) -> bool {
        self.lock_clients()
            .get(id)
            .is_some_and(|c| c.as_deref() == Some(self.version.as_str()))
    }

    /// Take control of every open page without a reload. Returns how many changed hands.
    fn claim(&self) -> usize {
        let mut clients = self.lock_clients();
        let mut claimed = 0;
        for controller in clients.values_mut() {
            if controller.as_deref() != Some(self.version.as_str()) {
                *controller = Some(self.version.clone());
                claimed += 1;
            }
        }
        claimed
    }

    fn lock_clients(&self) -> std::sync::MutexGuard<'_, HashMap<String, Option<String>>> {
        self.clients.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // =========================================================================
    // FETCH
    // =========================================================================

    /// Answer a request under the cache-first policy.
    pub async fn handle_fetch(&self, request: FetchRequest) -> FetchResponse {
        if request.method != Method::GET || self.state() != WorkerState::Active || is_network_only(&request) {
            return self.pass_through(&request).await;
        }

        let key = request.cache_key();
        match self.storage.match_in(&self.version, &key).await {
            Ok(Some(entry)) => {
                debug!(url = %key, "cache hit");
                return FetchResponse::from_cache(&entry);
            }
            Ok(None) => {}
            Err(e) => warn!(url = %key, error = %e, "cache read failed; treating as miss"),
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store(CacheEntry::capture(key, &response)).await;
                }
                response
            }
            Err(e) => {
                warn!(url = %key, error = %e, navigate = request.is_navigation(), "network fetch failed");
                self.offline_response(&request).await
            }
        }
    }

    async fn pass_through(&self, request: &FetchRequest) -> FetchResponse {
        match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %request.url, method = %request.method, error = %e, "pass-through fetch failed");
                FetchResponse::bad_gateway()
            }
        }
    }

    async fn store(&self, entry: CacheEntry) {
        let url = entry.url.clone();
        match self.storage.put(&self.version, entry).await {
            Ok(()) => info!(url = %url, cache = %self.version, "caching new resource"),
            Err(e) => warn!(url = %url, cache = %self.version, error = %e, "cache write failed"),
        }
    }

    async fn offline_response(&self, request: &FetchRequest) -> FetchResponse {
        if request.is_navigation() {
            for path in SHELL_PATHS {
                let Ok(shell_url) = request.url.join(path) else {
                    continue;
                };
                match self.storage.match_any(shell_url.as_str()).await {
                    Ok(Some(entry)) => {
                        debug!(url = %request.url, shell = %shell_url, "serving cached shell");
                        return FetchResponse::from_cache(&entry);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(shell = %shell_url, error = %e, "shell lookup failed"),
                }
            }
        }
        FetchResponse::offline()
    }
}

fn is_network_only(request: &FetchRequest) -> bool {
    let path = request.url.path();
    NETWORK_ONLY_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;
