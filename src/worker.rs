//! Offline Cache Worker
//!
//! The worker owns one versioned cache. Install populates it with the
//! configured asset list, activation evicts every cache from prior versions,
//! and intercepted fetches are served network-first with cache fallback.
//! API traffic bypasses the worker entirely.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::cache::CacheStorage;
use crate::fetch::{FetchEvent, NetworkFetch, Response};
use crate::lifecycle::WorkerState;
use crate::{ServiceWorkerError, WorkerConfig};

/// Worker global ID counter
static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// URL substring marking device API requests. Matching requests are never
/// cached and never answered from cache.
pub const API_PATH_MARKER: &str = "/api/";

/// Worker ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Create a new unique ID
    pub fn new() -> Self {
        Self(NEXT_WORKER_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Get raw value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A worker instance
pub struct OfflineWorker {
    /// Unique identifier
    id: WorkerId,
    /// Configuration
    config: WorkerConfig,
    /// Current state
    pub(crate) state: WorkerState,
}

impl OfflineWorker {
    /// Create a new worker
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            id: WorkerId::new(),
            config,
            state: WorkerState::Parsed,
        }
    }

    /// Get the worker ID
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Get the configuration
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Name of the cache this worker version owns
    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    /// Get current state
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Check if the worker is active
    pub fn is_active(&self) -> bool {
        self.state == WorkerState::Activated
    }

    /// Check if the worker is installing
    pub fn is_installing(&self) -> bool {
        self.state == WorkerState::Installing
    }

    /// Check if the worker is waiting
    pub fn is_waiting(&self) -> bool {
        self.state == WorkerState::Installed
    }

    /// Install handler: open the versioned cache and populate it with the
    /// configured asset list.
    ///
    /// All-or-nothing: if any asset fetch fails, nothing is stored and the
    /// install fails. No retry is attempted.
    pub fn handle_install(
        &self,
        storage: &mut CacheStorage,
        net: &dyn NetworkFetch,
    ) -> Result<(), ServiceWorkerError> {
        log::debug!(
            "[SW] install: populating cache '{}' ({} assets)",
            self.config.cache_name,
            self.config.precache_assets.len()
        );
        let cache = storage.open(&self.config.cache_name);
        cache.add_all(&self.config.precache_assets, net)?;
        log::debug!("[SW] install: cache '{}' ready", self.config.cache_name);
        Ok(())
    }

    /// Activate handler: delete every cache whose name differs from the
    /// current identifier.
    pub fn handle_activate(
        &self,
        storage: &mut CacheStorage,
    ) -> Result<(), ServiceWorkerError> {
        let stale: Vec<_> = storage
            .keys()
            .into_iter()
            .filter(|name| name != &self.config.cache_name)
            .collect();
        for name in stale {
            storage.delete(&name)?;
            log::debug!("[SW] activate: evicted stale cache '{}'", name);
        }
        Ok(())
    }

    /// Fetch handler: network-first with cache fallback.
    ///
    /// API requests are left untouched; the event stays un-responded and the
    /// request proceeds on the default network path. For everything else a
    /// resolved network response is returned as-is, error statuses included,
    /// and nothing is ever written back to the cache. Only an outright
    /// network failure falls back to the cache store.
    pub fn handle_fetch(
        &self,
        event: &mut FetchEvent,
        storage: &CacheStorage,
        net: &dyn NetworkFetch,
    ) {
        if event.request().url.contains(API_PATH_MARKER) {
            return;
        }

        match net.fetch(event.request()) {
            Ok(response) => event.respond_with(response),
            Err(_) => match storage.match_request(event.request()) {
                Some(cached) => {
                    log::debug!("[SW] fetch: served '{}' from cache", event.request().url);
                    event.respond_with(cached);
                }
                None => {
                    log::warn!(
                        "[SW] fetch: offline and '{}' not cached",
                        event.request().url
                    );
                    event.respond_with(Response::error());
                }
            },
        }
    }
}
