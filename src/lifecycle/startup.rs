use super::LifecycleController;
use crate::error::{Result, ServiceError};
use crate::status::{AcceptedControls, ServiceState, ServiceStatus};
use tracing::{error, info};

impl LifecycleController {
    /// Bring the service from START_PENDING to RUNNING.
    ///
    /// On signal allocation failure the service goes straight to STOPPED with
    /// the failure code, `on_error` fires and the error is returned.
    pub fn startup(&self) -> Result<()> {
        let _turn = self.sequencer.lock();

        {
            let mut status = self.status.lock();
            *status = ServiceStatus::new();
            status.wait_hint = self.wait_hint_for(ServiceState::StartPending);
            info!("{} -> {}", self.identity.name(), status.current_state);
            self.report(&status);
        }

        self.hooks.on_startup();

        match self.signal_factory.allocate() {
            Ok(signals) => *self.signals.lock() = Some(signals),
            Err(e) => {
                error!("{}: startup aborted: {}", self.identity.name(), e);
                self.abort(&e);
                return Err(e);
            }
        }

        self.set_state(ServiceState::Running, Some(true));
        Ok(())
    }

    /// Force STOPPED with `code` recorded, clearing accepted controls
    pub(super) fn report_error(&self, code: u32) {
        let mut status = self.status.lock();
        status.controls_accepted = AcceptedControls::empty();
        status.current_state = ServiceState::Stopped;
        status.win32_exit_code = code;
        status.service_specific_exit_code = 0;
        status.checkpoint = 0;
        status.wait_hint = self.wait_hint_for(ServiceState::Stopped);

        error!(
            "{} -> {} with error code {}",
            self.identity.name(),
            status.current_state,
            code
        );
        self.report(&status);
    }

    /// Fail the run before the worker could be started
    pub fn fail(&self, error: &ServiceError) {
        let _turn = self.sequencer.lock();
        self.abort(error);
    }

    fn abort(&self, error: &ServiceError) {
        self.report_error(error.code());
        self.hooks.on_error(error);
        self.signals.lock().take();
    }
}
