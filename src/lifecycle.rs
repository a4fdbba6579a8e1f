//! Worker Lifecycle Management
//!
//! Handles worker state transitions and lifecycle events. The hosting
//! runtime advances a phase only after the phase handler's result has
//! settled; that discipline is the only ordering guarantee in the system.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::worker::{OfflineWorker, WorkerId};
use crate::ServiceWorkerError;

/// Worker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Initial state, configuration parsed
    Parsed,
    /// Installing (install handler running)
    Installing,
    /// Installed, waiting to activate
    Installed,
    /// Activating (activate handler running)
    Activating,
    /// Active and controlling fetches
    Activated,
    /// Marked for removal
    Redundant,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::Parsed
    }
}

/// Lifecycle event types
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Install event
    Install(InstallEvent),
    /// Activate event
    Activate(ActivateEvent),
    /// State change
    StateChange(StateChangeEvent),
    /// A new worker took control of fetches
    ControllerChange,
}

/// Install event data
#[derive(Debug, Clone)]
pub struct InstallEvent {
    /// Worker ID
    pub worker_id: WorkerId,
}

/// Activate event data
#[derive(Debug, Clone)]
pub struct ActivateEvent {
    /// Worker ID
    pub worker_id: WorkerId,
}

/// State change event data
#[derive(Debug, Clone)]
pub struct StateChangeEvent {
    /// Worker ID
    pub worker_id: WorkerId,
    /// Old state
    pub old_state: WorkerState,
    /// New state
    pub new_state: WorkerState,
}

/// Lifecycle manager
pub struct LifecycleManager {
    /// Pending events
    pending_events: Vec<LifecycleEvent>,
    /// Event listeners
    listeners: Vec<Box<dyn Fn(&LifecycleEvent) + Send + Sync>>,
}

impl LifecycleManager {
    /// Create new lifecycle manager
    pub fn new() -> Self {
        Self {
            pending_events: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Add event listener
    pub fn add_listener(&mut self, listener: Box<dyn Fn(&LifecycleEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    /// Dispatch an event
    pub fn dispatch(&mut self, event: LifecycleEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
        self.pending_events.push(event);
    }

    /// Get pending events
    pub fn pending_events(&self) -> &[LifecycleEvent] {
        &self.pending_events
    }

    /// Clear pending events
    pub fn clear_pending(&mut self) {
        self.pending_events.clear();
    }

    /// Transition worker state
    pub fn transition_state(
        &mut self,
        worker: &mut OfflineWorker,
        new_state: WorkerState,
    ) -> Result<(), ServiceWorkerError> {
        let old_state = worker.state;

        if !is_valid_transition(old_state, new_state) {
            return Err(ServiceWorkerError::InvalidStateTransition);
        }

        worker.state = new_state;

        self.dispatch(LifecycleEvent::StateChange(StateChangeEvent {
            worker_id: worker.id(),
            old_state,
            new_state,
        }));

        match new_state {
            WorkerState::Installing => {
                self.dispatch(LifecycleEvent::Install(InstallEvent {
                    worker_id: worker.id(),
                }));
            }
            WorkerState::Activating => {
                self.dispatch(LifecycleEvent::Activate(ActivateEvent {
                    worker_id: worker.id(),
                }));
            }
            _ => {}
        }

        Ok(())
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a state transition is valid
fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use WorkerState::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Installed)
            | (Installing, Redundant)   // install failed
            | (Installed, Activating)
            | (Activating, Activated)
            | (Activating, Redundant)   // activate failed
            | (Activated, Redundant)    // replaced by new worker
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkerConfig;
    use alloc::string::ToString;
    use alloc::sync::Arc;
    use alloc::vec;
    use spin::Mutex;

    fn make_worker() -> OfflineWorker {
        OfflineWorker::new(WorkerConfig::new(
            "config-editor-v1",
            vec!["/".to_string()],
        ))
    }

    #[test]
    fn test_valid_transition_parsed_to_installing() {
        let mut manager = LifecycleManager::new();
        let mut worker = make_worker();
        assert!(manager
            .transition_state(&mut worker, WorkerState::Installing)
            .is_ok());
        assert_eq!(worker.state(), WorkerState::Installing);
    }

    #[test]
    fn test_valid_transition_full_lifecycle() {
        let mut manager = LifecycleManager::new();
        let mut worker = make_worker();
        for state in [
            WorkerState::Installing,
            WorkerState::Installed,
            WorkerState::Activating,
            WorkerState::Activated,
        ] {
            manager.transition_state(&mut worker, state).unwrap();
        }
        assert!(worker.is_active());
    }

    #[test]
    fn test_invalid_transition_parsed_to_activated() {
        let mut manager = LifecycleManager::new();
        let mut worker = make_worker();
        let result = manager.transition_state(&mut worker, WorkerState::Activated);
        assert!(matches!(
            result,
            Err(ServiceWorkerError::InvalidStateTransition)
        ));
    }

    #[test]
    fn test_invalid_transition_installing_to_activating() {
        let mut manager = LifecycleManager::new();
        let mut worker = make_worker();
        manager
            .transition_state(&mut worker, WorkerState::Installing)
            .unwrap();
        // Cannot skip Installed
        let result = manager.transition_state(&mut worker, WorkerState::Activating);
        assert!(result.is_err());
    }

    #[test]
    fn test_install_failure_routes_to_redundant() {
        let mut manager = LifecycleManager::new();
        let mut worker = make_worker();
        manager
            .transition_state(&mut worker, WorkerState::Installing)
            .unwrap();
        manager
            .transition_state(&mut worker, WorkerState::Redundant)
            .unwrap();
        assert_eq!(worker.state(), WorkerState::Redundant);
    }

    #[test]
    fn test_transition_dispatches_install_event() {
        let mut manager = LifecycleManager::new();
        let mut worker = make_worker();
        manager
            .transition_state(&mut worker, WorkerState::Installing)
            .unwrap();
        // StateChange + Install
        assert_eq!(manager.pending_events().len(), 2);
        assert!(manager
            .pending_events()
            .iter()
            .any(|e| matches!(e, LifecycleEvent::Install(_))));
    }

    #[test]
    fn test_listener_observes_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let mut manager = LifecycleManager::new();
        manager.add_listener(Box::new(move |event| {
            if let LifecycleEvent::StateChange(change) = event {
                seen_clone.lock().push(change.new_state);
            }
        }));

        let mut worker = make_worker();
        manager
            .transition_state(&mut worker, WorkerState::Installing)
            .unwrap();
        manager
            .transition_state(&mut worker, WorkerState::Installed)
            .unwrap();
        assert_eq!(
            seen.lock().as_slice(),
            &[WorkerState::Installing, WorkerState::Installed]
        );
    }

    #[test]
    fn test_clear_pending_events() {
        let mut manager = LifecycleManager::new();
        let mut worker = make_worker();
        manager
            .transition_state(&mut worker, WorkerState::Installing)
            .unwrap();
        manager.clear_pending();
        assert!(manager.pending_events().is_empty());
    }
}
