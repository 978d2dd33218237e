use super::LifecycleController;
use crate::error::ERROR_SERVICE_SPECIFIC_ERROR;
use crate::status::{AcceptedControls, ServiceState};
use tracing::{debug, info};

impl LifecycleController {
    /// Tear down after the worker thread has exited.
    ///
    /// Runs `on_exit`, releases the signal set and reports STOPPED. A non-zero
    /// worker exit code is reported as a service-specific error.
    pub fn shutdown(&self, exit_code: u32) {
        let _turn = self.sequencer.lock();

        self.hooks.on_exit();

        if self.signals.lock().take().is_some() {
            debug!("{}: lifecycle signals released", self.identity.name());
        }

        let mut status = self.status.lock();
        status.controls_accepted = AcceptedControls::empty();
        status.current_state = ServiceState::Stopped;
        status.checkpoint = 0;
        status.wait_hint = self.wait_hint_for(ServiceState::Stopped);
        if exit_code == 0 {
            status.win32_exit_code = 0;
            status.service_specific_exit_code = 0;
        } else {
            status.win32_exit_code = ERROR_SERVICE_SPECIFIC_ERROR;
            status.service_specific_exit_code = exit_code;
        }

        info!(
            "{} -> {} (exit code {})",
            self.identity.name(),
            status.current_state,
            exit_code
        );
        self.report(&status);
    }
}
