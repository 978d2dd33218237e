use crate::dispatcher::{ControlCode, ControlDispatcher, DispatchOutcome};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Routes manager callbacks to the service instance of one `run` invocation.
///
/// The control handler handed to the manager captures the registry rather
/// than a process-wide instance pointer. The slot is filled for the duration
/// of a [`RegistrationGuard`]; codes arriving outside it are dropped.
pub struct ServiceRegistry {
    run_id: Uuid,
    slot: RwLock<Option<Arc<ControlDispatcher>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            slot: RwLock::new(None),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Fill the slot until the returned guard is dropped
    pub fn install(self: &Arc<Self>, dispatcher: Arc<ControlDispatcher>) -> RegistrationGuard {
        *self.slot.write() = Some(dispatcher);
        debug!(run_id = %self.run_id, "Service instance registered");
        RegistrationGuard {
            registry: Arc::clone(self),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Forward `code` to the registered dispatcher, if any
    pub fn dispatch(&self, code: ControlCode) -> DispatchOutcome {
        let dispatcher = self.slot.read().clone();
        match dispatcher {
            Some(dispatcher) => dispatcher.dispatch(code),
            None => {
                debug!(run_id = %self.run_id, "No registered instance for {:?}", code);
                DispatchOutcome::Ignored
            }
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the registry slot filled; clears it on drop
pub struct RegistrationGuard {
    registry: Arc<ServiceRegistry>,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        *self.registry.slot.write() = None;
        debug!(run_id = %self.registry.run_id, "Service instance unregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleController;
    use crate::status::{ServiceIdentity, ServiceState};
    use crate::testing::{RecordingHooks, RecordingReporter};

    fn dispatcher() -> (Arc<ControlDispatcher>, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::default());
        let controller = Arc::new(LifecycleController::new(
            ServiceIdentity::new("registry-test", true),
            Arc::new(RecordingHooks::default()),
            reporter.clone(),
        ));
        controller.startup().unwrap();
        (Arc::new(ControlDispatcher::new(controller)), reporter)
    }

    #[test]
    fn test_dispatch_without_instance_is_ignored() {
        let registry = ServiceRegistry::new();
        assert!(!registry.is_installed());
        assert_eq!(
            registry.dispatch(ControlCode::Stop),
            DispatchOutcome::Ignored
        );
    }

    #[test]
    fn test_registration_is_scoped_to_guard() {
        let registry = Arc::new(ServiceRegistry::new());
        let (dispatcher, reporter) = dispatcher();

        {
            let _guard = registry.install(Arc::clone(&dispatcher));
            assert!(registry.is_installed());
            assert_eq!(
                registry.dispatch(ControlCode::Interrogate),
                DispatchOutcome::Handled
            );
        }

        assert!(!registry.is_installed());
        let reports_before = reporter.len();
        assert_eq!(
            registry.dispatch(ControlCode::Stop),
            DispatchOutcome::Ignored
        );
        assert_eq!(reporter.len(), reports_before);
        assert_eq!(dispatcher.controller().current_state(), ServiceState::Running);
    }

    #[test]
    fn test_each_registry_has_its_own_run_id() {
        assert_ne!(ServiceRegistry::new().run_id(), ServiceRegistry::new().run_id());
    }
}
