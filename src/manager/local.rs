use super::{ControlHandler, ServiceManager, StatusReporter};
use crate::dispatcher::ControlCode;
use crate::error::{Result, ServiceError};
use crate::status::{ServiceState, ServiceStatus};
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Returned when a handler registers under a name that was never started
const ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;

enum Envelope {
    Control(ControlCode),
    Close,
}

/// One status report as received by the manager
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: ServiceStatus,
    pub reported_at: DateTime<Utc>,
}

/// Sends control codes to the service hosted by a [`LocalServiceManager`]
#[derive(Clone)]
pub struct ControlSender {
    tx: Sender<Envelope>,
}

impl ControlSender {
    /// Queue `code` for serial delivery; false once the manager is gone
    pub fn send(&self, code: ControlCode) -> bool {
        self.tx.send(Envelope::Control(code)).is_ok()
    }
}

#[derive(Default)]
struct Shared {
    service_name: Mutex<Option<String>>,
    handler: Mutex<Option<Arc<ControlHandler>>>,
    history: Mutex<Vec<StatusReport>>,
    reported: Condvar,
    reject_reports: AtomicBool,
}

struct LocalReporter {
    shared: Arc<Shared>,
}

impl StatusReporter for LocalReporter {
    fn report_status(&self, status: &ServiceStatus) -> Result<()> {
        if self.shared.reject_reports.load(Ordering::SeqCst) {
            return Err(ServiceError::status_report(format!(
                "manager rejected {} report",
                status.current_state
            )));
        }

        let mut history = self.shared.history.lock();
        history.push(StatusReport {
            status: status.clone(),
            reported_at: Utc::now(),
        });
        self.shared.reported.notify_all();
        Ok(())
    }
}

/// In-process service manager.
///
/// Runs the service main on the caller's thread, delivers control codes one
/// at a time on a dedicated dispatcher thread, and records every status report.
pub struct LocalServiceManager {
    args: Vec<String>,
    registration_error: Option<u32>,
    shared: Arc<Shared>,
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
}

impl LocalServiceManager {
    pub fn new(args: Vec<String>) -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            args,
            registration_error: None,
            shared: Arc::new(Shared::default()),
            tx,
            rx,
        }
    }

    /// Refuse `start_dispatcher` with the given code
    pub fn with_registration_error(mut self, code: u32) -> Self {
        self.registration_error = Some(code);
        self
    }

    /// Reject (and drop) every status report while set
    pub fn set_reject_reports(&self, reject: bool) {
        self.shared.reject_reports.store(reject, Ordering::SeqCst);
    }

    pub fn control_sender(&self) -> ControlSender {
        ControlSender {
            tx: self.tx.clone(),
        }
    }

    pub fn history(&self) -> Vec<StatusReport> {
        self.shared.history.lock().clone()
    }

    /// States of every accepted report, in arrival order
    pub fn states(&self) -> Vec<ServiceState> {
        self.shared
            .history
            .lock()
            .iter()
            .map(|report| report.status.current_state)
            .collect()
    }

    pub fn last_status(&self) -> Option<ServiceStatus> {
        self.shared
            .history
            .lock()
            .last()
            .map(|report| report.status.clone())
    }

    /// Block until `predicate` holds for the report history or `timeout` elapses
    pub fn wait_until<F>(&self, timeout: Duration, mut predicate: F) -> bool
    where
        F: FnMut(&[StatusReport]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut history = self.shared.history.lock();
        loop {
            if predicate(&history) {
                return true;
            }
            if self.shared.reported.wait_until(&mut history, deadline).timed_out() {
                return predicate(&history);
            }
        }
    }

    /// Block until the most recent report carries `state`
    pub fn wait_for_state(&self, state: ServiceState, timeout: Duration) -> bool {
        self.wait_until(timeout, |history| {
            history
                .last()
                .map(|report| report.status.current_state == state)
                .unwrap_or(false)
        })
    }

    /// Block until at least `count` reports have been accepted
    pub fn wait_for_reports(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |history| history.len() >= count)
    }

    fn dispatch_loop(rx: Receiver<Envelope>, shared: Arc<Shared>) {
        for envelope in rx.iter() {
            let code = match envelope {
                Envelope::Control(code) => code,
                Envelope::Close => break,
            };

            let handler = shared.handler.lock().clone();
            match handler {
                Some(handler) => handler(code),
                None => debug!("No control handler registered, dropping {:?}", code),
            }
        }
        debug!("Control dispatcher loop finished");
    }
}

impl ServiceManager for LocalServiceManager {
    fn start_dispatcher(
        &self,
        service_name: &str,
        service_main: &mut dyn FnMut(Vec<String>),
    ) -> Result<()> {
        if let Some(code) = self.registration_error {
            error!("Refusing to start service '{}' (code {})", service_name, code);
            return Err(ServiceError::Registration { code });
        }

        *self.shared.service_name.lock() = Some(service_name.to_string());

        let rx = self.rx.clone();
        let shared = Arc::clone(&self.shared);
        let dispatcher = thread::Builder::new()
            .name("control-dispatcher".to_string())
            .spawn(move || Self::dispatch_loop(rx, shared))?;

        info!("Starting service '{}'", service_name);
        service_main(self.args.clone());

        if self.tx.send(Envelope::Close).is_err() {
            warn!("Control channel closed before dispatcher shutdown");
        }
        if dispatcher.join().is_err() {
            error!("Control dispatcher thread panicked");
        }

        *self.shared.handler.lock() = None;
        *self.shared.service_name.lock() = None;
        info!("Service '{}' returned control to the manager", service_name);
        Ok(())
    }

    fn register_control_handler(
        &self,
        service_name: &str,
        handler: ControlHandler,
    ) -> Result<Arc<dyn StatusReporter>> {
        let started = self.shared.service_name.lock().clone();
        if started.as_deref() != Some(service_name) {
            error!("No started service named '{}'", service_name);
            return Err(ServiceError::Registration {
                code: ERROR_SERVICE_DOES_NOT_EXIST,
            });
        }

        *self.shared.handler.lock() = Some(Arc::new(handler));
        debug!("Control handler registered for '{}'", service_name);

        Ok(Arc::new(LocalReporter {
            shared: Arc::clone(&self.shared),
        }))
    }
}
