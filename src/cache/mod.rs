//! Asset cache worker: cache-first serving of the built web client.
//!
//! DESIGN
//! ======
//! - `types`: requests, responses, cache entries, and errors
//! - `storage`: named caches (`CacheStorage`), in memory or on disk
//! - `network`: the upstream fetcher (`Network`)
//! - `worker`: lifecycle and the fetch policy tying the two together
//!
//! The worker sees storage and network only through traits, so tests run it
//! against in-memory caches and scripted networks.

pub mod network;
pub mod storage;
pub mod types;
pub mod worker;

pub use network::{HttpNetwork, Network};
pub use storage::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};
pub use types::{CacheEntry, CacheError, FetchRequest, FetchResponse, NetworkError, RequestMode, ResponseSource, ResponseType};
pub use worker::{ActivationReport, AssetCacheWorker, WorkerState};
