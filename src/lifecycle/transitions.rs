use super::LifecycleController;
use crate::signals::{Signal, SignalSet};
use crate::status::ServiceState;
use std::sync::Arc;
use tracing::{debug, warn};

// Each request re-checks its source state under the sequencer and returns
// whether it ran. A request from the wrong state changes nothing.
impl LifecycleController {
    /// RUNNING -> STOP_PENDING, then raise the stop request
    pub fn request_stop(&self) -> bool {
        let _turn = self.sequencer.lock();
        let Some(signals) = self.signals_in(ServiceState::Running) else {
            return false;
        };

        self.hooks.on_stop();
        self.set_state(ServiceState::StopPending, Some(false));
        signals.raise(Signal::StopRequested);
        true
    }

    /// RUNNING -> PAUSE_PENDING -> PAUSED.
    ///
    /// Blocks the caller until the worker acknowledges, so PAUSED is never
    /// reported before the worker has quiesced.
    pub fn request_pause(&self) -> bool {
        let _turn = self.sequencer.lock();
        let Some(signals) = self.signals_in(ServiceState::Running) else {
            return false;
        };

        self.set_state(ServiceState::PausePending, None);
        self.hooks.on_pause();
        signals.raise(Signal::PauseRequested);

        if self.await_worker(&signals, Signal::WorkerPaused) {
            self.set_state(ServiceState::Paused, None);
        }
        true
    }

    /// PAUSED -> CONTINUE_PENDING -> RUNNING, blocking until the worker resumes
    pub fn request_continue(&self) -> bool {
        let _turn = self.sequencer.lock();
        let Some(signals) = self.signals_in(ServiceState::Paused) else {
            return false;
        };

        self.set_state(ServiceState::ContinuePending, Some(false));
        signals.clear(Signal::PauseRequested);
        self.hooks.on_continue();
        signals.raise(Signal::ContinueRequested);

        if self.await_worker(&signals, Signal::WorkerContinued) {
            signals.clear(Signal::ContinueRequested);
            self.set_state(ServiceState::Running, Some(true));
        }
        true
    }

    /// PAUSED -> STOP_PENDING.
    ///
    /// The worker is parked in its pause wait, so the continue request is
    /// raised alongside the stop request to release it.
    pub fn request_stop_while_paused(&self) -> bool {
        let _turn = self.sequencer.lock();
        let Some(signals) = self.signals_in(ServiceState::Paused) else {
            return false;
        };

        self.set_state(ServiceState::StopPending, Some(false));
        self.hooks.on_continue();
        signals.raise(Signal::StopRequested);
        signals.raise(Signal::ContinueRequested);
        true
    }

    fn signals_in(&self, required: ServiceState) -> Option<Arc<SignalSet>> {
        let state = self.current_state();
        if state != required {
            debug!("Request needs {} but service is {}", required, state);
            return None;
        }

        let signals = self.signals();
        if signals.is_none() {
            warn!("{}: no live signals in state {}", self.identity.name(), state);
        }
        signals
    }

    /// Wait for `ack` from the worker; false if the worker exited instead
    fn await_worker(&self, signals: &SignalSet, ack: Signal) -> bool {
        let wanted = [ack, Signal::WorkerExited];
        let woke = match self.options.checkpoint_interval {
            Some(interval) => loop {
                if let Some(signal) = signals.wait_any_timeout(&wanted, interval) {
                    break signal;
                }
                self.bump_checkpoint();
            },
            None => signals.wait_any(&wanted),
        };

        if woke != ack {
            warn!(
                "{}: worker exited before raising {:?}",
                self.identity.name(),
                ack
            );
        }
        woke == ack
    }
}
