//! Offline cache for the application's static assets.
//!
//! This module provides the `AssetCacheManager`, a lifecycle controller that
//! keeps a versioned copy of the asset list so the application works without
//! network access:
//!
//! - Install: fetch every asset into a cache named `<prefix><timestamp>`
//! - Activate: make that version current and purge older prefixed versions
//! - Fetch: answer from the current cache first, otherwise the network
//! - Restore: on start-up, resume the version the last activation recorded
//!
//! Storage and network access sit behind the `CacheStorage` and `Fetcher`
//! traits. `AssetWorker` runs a manager in the background for a host.

pub mod error;
pub mod manager;
pub mod network;
pub mod store;
pub mod worker;

pub use error::AssetError;
pub use manager::{
    Activation, AssetCacheManager, Installation, LifecycleState, Restoration, Served, ServedFrom,
    DEFAULT_ASSETS, DEFAULT_CACHE_PREFIX,
};
pub use network::{AssetResponse, Fetcher, HttpFetcher};
pub use store::{CacheStorage, CachedData, DiskCacheStore, MemoryCacheStore};
pub use worker::{AssetWorker, WorkerEvent};
