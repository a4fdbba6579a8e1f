//! Config Editor Service Worker
//!
//! This crate provides the offline cache runtime for the config editor PWA.
//! A worker version owns one named asset cache: the cache is populated with a
//! fixed asset list during install, caches left behind by prior versions are
//! evicted during activation, and intercepted fetches follow a network-first
//! policy with cache fallback. Requests to the device API are never cached
//! and never answered from cache.
//!
//! # Architecture
//!
//! - `fetch`: request/response types, fetch events, network collaborator
//! - `cache`: Cache API (named caches of request/response pairs)
//! - `lifecycle`: worker state machine and lifecycle events
//! - `worker`: the offline cache manager (install/activate/fetch handlers)
//! - `host`: hosting-runtime contract (phase ordering, fetch dispatch)

#![no_std]

extern crate alloc;

pub mod cache;
pub mod fetch;
pub mod host;
pub mod lifecycle;
pub mod worker;

pub use cache::{Cache, CacheError, CacheStorage};
pub use fetch::{FetchEvent, NetworkError, NetworkFetch, Request, Response};
pub use host::{FetchOutcome, WorkerHost};
pub use lifecycle::{LifecycleEvent, LifecycleManager, WorkerState};
pub use worker::{OfflineWorker, WorkerId};

use alloc::string::String;
use alloc::vec::Vec;

/// Service worker error types.
#[derive(Debug, Clone)]
pub enum ServiceWorkerError {
    /// State transition not allowed by the lifecycle.
    InvalidStateTransition,
    /// Cache store error. Raised by install when an asset cannot be
    /// fetched and by activation when an eviction fails.
    Cache(CacheError),
}

impl From<CacheError> for ServiceWorkerError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err)
    }
}

/// Worker configuration.
///
/// The cache identifier and the precache asset list are deployment inputs;
/// they are handed to the worker at construction time rather than read from
/// module constants.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name of the cache this worker version owns.
    pub cache_name: String,
    /// Asset URLs fetched and stored during install.
    pub precache_assets: Vec<String>,
}

impl WorkerConfig {
    /// Create a new configuration.
    pub fn new(cache_name: impl Into<String>, precache_assets: Vec<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            precache_assets,
        }
    }

    /// Get the cache name.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Get the precache asset list.
    pub fn precache_assets(&self) -> &[String] {
        &self.precache_assets
    }
}
