use crate::error::Result;
use bitflags::bitflags;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Binary, manually reset signals shared between the controller and the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Raised by the controller; the worker must return promptly
    StopRequested,
    /// Raised by the controller; the worker must quiesce and acknowledge
    PauseRequested,
    /// Raised by the controller; releases a worker sitting in its pause wait
    ContinueRequested,
    /// Raised by the worker once it has quiesced
    WorkerPaused,
    /// Raised by the worker once it has resumed
    WorkerContinued,
    /// Raised by the executor harness once the user worker has returned
    WorkerExited,
}

impl Signal {
    pub const ALL: [Signal; 6] = [
        Signal::StopRequested,
        Signal::PauseRequested,
        Signal::ContinueRequested,
        Signal::WorkerPaused,
        Signal::WorkerContinued,
        Signal::WorkerExited,
    ];

    fn flag(self) -> SignalFlags {
        match self {
            Signal::StopRequested => SignalFlags::STOP_REQUESTED,
            Signal::PauseRequested => SignalFlags::PAUSE_REQUESTED,
            Signal::ContinueRequested => SignalFlags::CONTINUE_REQUESTED,
            Signal::WorkerPaused => SignalFlags::WORKER_PAUSED,
            Signal::WorkerContinued => SignalFlags::WORKER_CONTINUED,
            Signal::WorkerExited => SignalFlags::WORKER_EXITED,
        }
    }
}

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    struct SignalFlags: u8 {
        const STOP_REQUESTED = 1 << 0;
        const PAUSE_REQUESTED = 1 << 1;
        const CONTINUE_REQUESTED = 1 << 2;
        const WORKER_PAUSED = 1 << 3;
        const WORKER_CONTINUED = 1 << 4;
        const WORKER_EXITED = 1 << 5;
    }
}

/// The set of signals living for exactly one service run.
///
/// All signals share one lock and one condition variable, so a waiter can
/// block on several of them at once (an acknowledgment or the worker exiting).
#[derive(Debug, Default)]
pub struct SignalSet {
    raised: Mutex<SignalFlags>,
    changed: Condvar,
}

impl SignalSet {
    /// Create a set with every signal in the not-set state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, signal: Signal) {
        let mut raised = self.raised.lock();
        raised.insert(signal.flag());
        self.changed.notify_all();
        trace!("Signal {:?} raised", signal);
    }

    pub fn clear(&self, signal: Signal) {
        let mut raised = self.raised.lock();
        raised.remove(signal.flag());
        trace!("Signal {:?} cleared", signal);
    }

    pub fn is_raised(&self, signal: Signal) -> bool {
        self.raised.lock().contains(signal.flag())
    }

    /// Signals currently raised, in declaration order
    pub fn raised(&self) -> Vec<Signal> {
        let raised = *self.raised.lock();
        Signal::ALL
            .into_iter()
            .filter(|signal| raised.contains(signal.flag()))
            .collect()
    }

    /// Block until `signal` is raised
    pub fn wait(&self, signal: Signal) {
        self.wait_any(&[signal]);
    }

    /// Block until one of `signals` is raised and return the first raised one
    pub fn wait_any(&self, signals: &[Signal]) -> Signal {
        let mut raised = self.raised.lock();
        loop {
            if let Some(signal) = first_raised(*raised, signals) {
                return signal;
            }
            self.changed.wait(&mut raised);
        }
    }

    /// Block until `signal` is raised or `timeout` elapses
    pub fn wait_timeout(&self, signal: Signal, timeout: Duration) -> bool {
        self.wait_any_timeout(&[signal], timeout).is_some()
    }

    /// Like [`SignalSet::wait_any`], giving up after `timeout`
    pub fn wait_any_timeout(&self, signals: &[Signal], timeout: Duration) -> Option<Signal> {
        // A timeout past the end of the clock means no timeout
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.wait_any(signals));
        };
        let mut raised = self.raised.lock();
        loop {
            if let Some(signal) = first_raised(*raised, signals) {
                return Some(signal);
            }
            if self.changed.wait_until(&mut raised, deadline).timed_out() {
                return first_raised(*raised, signals);
            }
        }
    }
}

fn first_raised(raised: SignalFlags, signals: &[Signal]) -> Option<Signal> {
    signals
        .iter()
        .copied()
        .find(|signal| raised.contains(signal.flag()))
}

/// Allocates the signal set at startup
pub trait SignalFactory: Send + Sync {
    fn allocate(&self) -> Result<Arc<SignalSet>>;
}

/// Factory used outside of tests; allocation cannot fail
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSignalFactory;

impl SignalFactory for DefaultSignalFactory {
    fn allocate(&self) -> Result<Arc<SignalSet>> {
        Ok(Arc::new(SignalSet::new()))
    }
}
