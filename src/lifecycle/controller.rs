use crate::hooks::ServiceHooks;
use crate::manager::StatusReporter;
use crate::signals::{DefaultSignalFactory, SignalFactory, SignalSet};
use crate::status::{AcceptedControls, ServiceIdentity, ServiceState, ServiceStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tuning for pending transitions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LifecycleOptions {
    /// Wait hint reported with every `*_PENDING` state
    pub pending_wait_hint: Duration,
    /// Bump the checkpoint at this cadence while waiting on the worker
    pub checkpoint_interval: Option<Duration>,
}

/// Owner of the service status record and of the lifecycle signals.
///
/// The record has a single writer: every mutation goes through this type and
/// is reported to the manager before the next transition may begin.
pub struct LifecycleController {
    pub(super) identity: ServiceIdentity,
    pub(super) options: LifecycleOptions,
    pub(super) hooks: Arc<dyn ServiceHooks>,
    pub(super) reporter: Arc<dyn StatusReporter>,
    pub(super) signal_factory: Arc<dyn SignalFactory>,
    pub(super) status: Mutex<ServiceStatus>,
    pub(super) signals: Mutex<Option<Arc<SignalSet>>>,
    /// Held for the whole of a transition so transitions never interleave
    pub(super) sequencer: Mutex<()>,
}

impl LifecycleController {
    pub fn new(
        identity: ServiceIdentity,
        hooks: Arc<dyn ServiceHooks>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            identity,
            options: LifecycleOptions::default(),
            hooks,
            reporter,
            signal_factory: Arc::new(DefaultSignalFactory),
            status: Mutex::new(ServiceStatus::new()),
            signals: Mutex::new(None),
            sequencer: Mutex::new(()),
        }
    }

    pub fn with_options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_signal_factory(mut self, signal_factory: Arc<dyn SignalFactory>) -> Self {
        self.signal_factory = signal_factory;
        self
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn status(&self) -> ServiceStatus {
        self.status.lock().clone()
    }

    pub fn current_state(&self) -> ServiceState {
        self.status.lock().current_state
    }

    /// The live signal set, present between a successful startup and shutdown
    pub fn signals(&self) -> Option<Arc<SignalSet>> {
        self.signals.lock().clone()
    }

    /// Re-report the current record without changing it
    pub fn interrogate(&self) {
        let status = self.status.lock();
        debug!("Interrogated in state {}", status.current_state);
        self.report(&status);
    }

    /// Prove liveness during a long pending transition
    pub fn bump_checkpoint(&self) {
        let mut status = self.status.lock();
        status.checkpoint = status.checkpoint.wrapping_add(1);
        debug!(
            "Checkpoint {} in state {}",
            status.checkpoint, status.current_state
        );
        self.report(&status);
    }

    pub(super) fn accepted_controls(&self, enabled: bool) -> AcceptedControls {
        if enabled {
            AcceptedControls::enabled_for(&self.identity)
        } else {
            AcceptedControls::empty()
        }
    }

    /// Move to `state`, optionally toggling accepted controls, and report once
    pub(super) fn set_state(&self, state: ServiceState, controls_enabled: Option<bool>) {
        let mut status = self.status.lock();
        if status.current_state.is_terminal() {
            debug!("Ignoring {} after STOPPED", state);
            return;
        }

        if let Some(enabled) = controls_enabled {
            status.controls_accepted = self.accepted_controls(enabled);
        }
        status.current_state = state;
        status.win32_exit_code = 0;
        status.service_specific_exit_code = 0;
        status.checkpoint = 0;
        status.wait_hint = self.wait_hint_for(state);

        info!("{} -> {}", self.identity.name(), state);
        self.report(&status);
    }

    pub(super) fn wait_hint_for(&self, state: ServiceState) -> Duration {
        if state.is_pending() {
            self.options.pending_wait_hint
        } else {
            Duration::ZERO
        }
    }

    /// Mirror `status` to the manager; a rejected report is only logged
    pub(super) fn report(&self, status: &ServiceStatus) {
        if let Err(e) = self.reporter.report_status(status) {
            warn!(
                "{}: status report for {} failed: {}",
                self.identity.name(),
                status.current_state,
                e
            );
        }
    }
}
