use crate::error::{Result, ServiceError};
use crate::hooks::ServiceHooks;
use crate::manager::StatusReporter;
use crate::signals::{Signal, SignalFactory, SignalSet};
use crate::status::{ServiceState, ServiceStatus};
use crate::worker::WorkerContext;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Records every report together with the signals raised at that moment
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(ServiceStatus, Vec<Signal>)>>,
    observed: Mutex<Option<Arc<SignalSet>>>,
    reject: AtomicBool,
}

impl RecordingReporter {
    pub fn observe(&self, signals: Arc<SignalSet>) {
        *self.observed.lock() = Some(signals);
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn statuses(&self) -> Vec<ServiceStatus> {
        self.reports.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn states(&self) -> Vec<ServiceState> {
        self.reports
            .lock()
            .iter()
            .map(|(s, _)| s.current_state)
            .collect()
    }

    pub fn last(&self) -> Option<ServiceStatus> {
        self.reports.lock().last().map(|(s, _)| s.clone())
    }

    /// Signals raised when the first report in `state` was made
    pub fn signals_at(&self, state: ServiceState) -> Option<Vec<Signal>> {
        self.reports
            .lock()
            .iter()
            .find(|(s, _)| s.current_state == state)
            .map(|(_, raised)| raised.clone())
    }
}

impl StatusReporter for RecordingReporter {
    fn report_status(&self, status: &ServiceStatus) -> Result<()> {
        let raised = self
            .observed
            .lock()
            .as_ref()
            .map(|signals| signals.raised())
            .unwrap_or_default();
        // Rejected reports are still recorded so tests can see they were attempted
        self.reports.lock().push((status.clone(), raised));

        if self.reject.load(Ordering::SeqCst) {
            return Err(ServiceError::status_report("rejected by test reporter"));
        }
        Ok(())
    }
}

/// Hook set that logs which hooks fired, in order
#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<&'static str>>,
    pub error_code: Mutex<Option<u32>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }

    fn record(&self, event: &'static str) {
        self.events.lock().push(event);
    }
}

impl ServiceHooks for RecordingHooks {
    fn on_startup(&self) {
        self.record("on_startup");
    }

    fn worker(&self, context: WorkerContext, _args: &[String]) -> u32 {
        self.record("worker_started");
        while context.idle(Duration::from_millis(5)) {}
        self.record("worker_exited");
        0
    }

    fn on_stop(&self) {
        self.record("on_stop");
    }

    fn on_pause(&self) {
        self.record("on_pause");
    }

    fn on_continue(&self) {
        self.record("on_continue");
    }

    fn on_exit(&self) {
        self.record("on_exit");
    }

    fn on_error(&self, error: &ServiceError) {
        *self.error_code.lock() = Some(error.code());
        self.record("on_error");
    }
}

/// Signal factory whose allocation always fails with `code`
pub struct FailingSignalFactory {
    pub code: u32,
}

impl SignalFactory for FailingSignalFactory {
    fn allocate(&self) -> Result<Arc<SignalSet>> {
        Err(ServiceError::ResourceAllocation { code: self.code })
    }
}

/// A fake worker that honors the pause protocol until stopped
pub fn spawn_cooperative_worker(signals: &Arc<SignalSet>) -> JoinHandle<()> {
    let signals = Arc::clone(signals);
    thread::spawn(move || {
        let context = WorkerContext::new(Arc::clone(&signals), "fake");
        while context.idle(Duration::from_millis(5)) {}
        signals.raise(Signal::WorkerExited);
    })
}
