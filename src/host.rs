//! Hosting Runtime Contract
//!
//! Owns the cache store and the current worker, and enforces the lifecycle
//! ordering: install runs to settlement before activation begins, and
//! activation runs to settlement before the worker controls fetches.
//! Concurrent fetch events share read access to the cache store; fetch
//! never mutates it.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use spin::RwLock;

use crate::cache::CacheStorage;
use crate::fetch::{FetchEvent, NetworkFetch, Request, Response};
use crate::lifecycle::{LifecycleEvent, LifecycleManager, WorkerState};
use crate::worker::{OfflineWorker, WorkerId};
use crate::{ServiceWorkerError, WorkerConfig};

/// Outcome of dispatching a fetch through the host.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A controlled response (network or cache).
    Respond(Response),
    /// Not intercepted; the default network path applies.
    Passthrough,
}

impl FetchOutcome {
    /// Get the response, if the fetch was intercepted.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Respond(response) => Some(response),
            Self::Passthrough => None,
        }
    }

    /// Check if the request went through uncontrolled.
    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough)
    }
}

/// Worker host.
///
/// The cache store outlives worker versions: caches accumulate across
/// registrations until an activating worker evicts them.
pub struct WorkerHost<N: NetworkFetch> {
    /// Shared cache store
    storage: RwLock<CacheStorage>,
    /// Worker currently controlling fetches
    controller: RwLock<Option<OfflineWorker>>,
    /// Lifecycle state machine and event log
    lifecycle: RwLock<LifecycleManager>,
    /// Network fetch primitive
    network: N,
}

impl<N: NetworkFetch> WorkerHost<N> {
    /// Create a new host around a network primitive.
    pub fn new(network: N) -> Self {
        Self {
            storage: RwLock::new(CacheStorage::new()),
            controller: RwLock::new(None),
            lifecycle: RwLock::new(LifecycleManager::new()),
            network,
        }
    }

    /// Register a new worker version and drive it through its lifecycle.
    ///
    /// Install is held pending until every asset is fetched and stored; any
    /// failure marks the worker redundant and leaves the previous controller
    /// (and its cache) in place. Activation is held pending until every
    /// stale cache is deleted. Only then does the worker take control.
    pub fn register(&self, config: WorkerConfig) -> Result<WorkerId, ServiceWorkerError> {
        let mut worker = OfflineWorker::new(config);
        let id = worker.id();
        let mut lifecycle = self.lifecycle.write();

        lifecycle.transition_state(&mut worker, WorkerState::Installing)?;
        let installed = {
            let mut storage = self.storage.write();
            worker.handle_install(&mut storage, &self.network)
        };
        if let Err(err) = installed {
            log::warn!("[SW] install failed, worker {} is redundant", id.raw());
            lifecycle.transition_state(&mut worker, WorkerState::Redundant)?;
            return Err(err);
        }
        lifecycle.transition_state(&mut worker, WorkerState::Installed)?;

        lifecycle.transition_state(&mut worker, WorkerState::Activating)?;
        let activated = {
            let mut storage = self.storage.write();
            worker.handle_activate(&mut storage)
        };
        if let Err(err) = activated {
            log::warn!("[SW] activate failed, worker {} is redundant", id.raw());
            lifecycle.transition_state(&mut worker, WorkerState::Redundant)?;
            return Err(err);
        }
        lifecycle.transition_state(&mut worker, WorkerState::Activated)?;

        let mut controller = self.controller.write();
        if let Some(old) = controller.as_mut() {
            lifecycle.transition_state(old, WorkerState::Redundant)?;
        }
        *controller = Some(worker);
        lifecycle.dispatch(LifecycleEvent::ControllerChange);
        log::info!("[SW] worker {} activated, controlling fetches", id.raw());

        Ok(id)
    }

    /// Dispatch a fetch through the controlling worker.
    ///
    /// Without an active controller the request passes through untouched.
    pub fn fetch(&self, request: Request) -> FetchOutcome {
        let controller = self.controller.read();
        let worker = match controller.as_ref() {
            Some(worker) if worker.is_active() => worker,
            _ => return FetchOutcome::Passthrough,
        };

        let mut event = FetchEvent::new(request);
        {
            let storage = self.storage.read();
            worker.handle_fetch(&mut event, &storage, &self.network);
        }

        match event.take_response() {
            Some(response) => FetchOutcome::Respond(response),
            None => FetchOutcome::Passthrough,
        }
    }

    /// State of the controlling worker, if any.
    pub fn controller_state(&self) -> Option<WorkerState> {
        self.controller.read().as_ref().map(|w| w.state())
    }

    /// ID of the controlling worker, if any.
    pub fn controller_id(&self) -> Option<WorkerId> {
        self.controller.read().as_ref().map(|w| w.id())
    }

    /// Names of the caches currently in the store.
    pub fn cache_names(&self) -> Vec<String> {
        self.storage.read().keys()
    }

    /// Look up a request in the cache store without dispatching a fetch.
    pub fn cached_response(&self, request: &Request) -> Option<Response> {
        self.storage.read().match_request(request)
    }

    /// Register a lifecycle event listener.
    pub fn add_lifecycle_listener(
        &self,
        listener: Box<dyn Fn(&LifecycleEvent) + Send + Sync>,
    ) {
        self.lifecycle.write().add_listener(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{response_with_body, MockNetwork};
    use crate::fetch::NetworkError;
    use alloc::string::ToString;
    use alloc::sync::Arc;
    use alloc::vec;
    use spin::Mutex;

    fn config(version: &str) -> WorkerConfig {
        WorkerConfig::new(
            alloc::format!("config-editor-{}", version),
            vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
            ],
        )
    }

    #[test]
    fn test_register_installs_and_activates() {
        let host = WorkerHost::new(MockNetwork::online());
        host.register(config("v1")).unwrap();
        assert_eq!(host.controller_state(), Some(WorkerState::Activated));
        assert_eq!(host.cache_names(), vec!["config-editor-v1".to_string()]);
        assert!(host
            .cached_response(&Request::new("/manifest.json"))
            .is_some());
    }

    #[test]
    fn test_register_new_version_evicts_old_cache() {
        let host = WorkerHost::new(MockNetwork::online());
        let v0 = host.register(config("v0")).unwrap();
        let v1 = host.register(config("v1")).unwrap();
        assert_ne!(v0, v1);
        assert_eq!(host.controller_id(), Some(v1));
        assert_eq!(host.cache_names(), vec!["config-editor-v1".to_string()]);
    }

    #[test]
    fn test_register_failure_keeps_previous_controller() {
        let net = MockNetwork::online().route("/nope.html", Err(NetworkError::Unreachable));
        let host = WorkerHost::new(net);
        let v0 = host.register(config("v0")).unwrap();

        // v1 cannot fetch its assets; the v0 worker stays in control and
        // its cache survives untouched.
        let failing = WorkerConfig::new("config-editor-v1", vec!["/nope.html".to_string()]);
        assert!(host.register(failing).is_err());

        assert_eq!(host.controller_id(), Some(v0));
        assert_eq!(host.controller_state(), Some(WorkerState::Activated));
        assert!(host.cache_names().contains(&"config-editor-v0".to_string()));
        assert!(host.cached_response(&Request::new("/")).is_some());
    }

    #[test]
    fn test_fetch_before_registration_passes_through() {
        let host = WorkerHost::new(MockNetwork::online());
        let outcome = host.fetch(Request::new("/index.html"));
        assert!(outcome.is_passthrough());
    }

    #[test]
    fn test_fetch_api_passes_through() {
        let host = WorkerHost::new(MockNetwork::online());
        host.register(config("v1")).unwrap();
        let outcome = host.fetch(Request::new("/api/config"));
        assert!(outcome.is_passthrough());
    }

    #[test]
    fn test_fetch_network_first_through_host() {
        let net = MockNetwork::online().route("/", Ok(response_with_body(200, b"live")));
        let host = WorkerHost::new(net);
        host.register(config("v1")).unwrap();
        let outcome = host.fetch(Request::new("/"));
        let resp = outcome.response().unwrap();
        assert_eq!(resp.body.as_deref(), Some(&b"live"[..]));
    }

    #[test]
    fn test_fetch_offline_served_from_cache_through_host() {
        // Online during install, connectivity lost afterwards; precached
        // assets are still served.
        let net = MockNetwork::online();
        let host = WorkerHost::new(&net);
        host.register(config("v1")).unwrap();

        net.go_offline();
        let outcome = host.fetch(Request::new("/index.html"));
        let resp = outcome.response().unwrap();
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn test_fetch_offline_uncached_fails_load() {
        let net = MockNetwork::online();
        let host = WorkerHost::new(&net);
        host.register(config("v1")).unwrap();

        net.go_offline();
        let outcome = host.fetch(Request::new("/never-cached.css"));
        let resp = outcome.response().unwrap();
        assert!(resp.is_error());
    }

    #[test]
    fn test_controller_change_event_emitted() {
        let host = WorkerHost::new(MockNetwork::online());
        let seen = Arc::new(Mutex::new(0usize));
        let seen_clone = seen.clone();
        host.add_lifecycle_listener(Box::new(move |event| {
            if matches!(event, LifecycleEvent::ControllerChange) {
                *seen_clone.lock() += 1;
            }
        }));
        host.register(config("v1")).unwrap();
        assert_eq!(*seen.lock(), 1);
    }
}
