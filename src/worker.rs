use crate::error::{Result, ServiceError};
use crate::hooks::ServiceHooks;
use crate::signals::{Signal, SignalSet};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

const STOP_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The worker's view of the lifecycle signals.
///
/// The worker observes stop/pause/continue requests and raises its own
/// acknowledgments; it never touches the status record.
#[derive(Clone)]
pub struct WorkerContext {
    signals: Arc<SignalSet>,
    service_name: Arc<str>,
}

impl WorkerContext {
    pub fn new(signals: Arc<SignalSet>, service_name: &str) -> Self {
        Self {
            signals,
            service_name: Arc::from(service_name),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn stop_requested(&self) -> bool {
        self.signals.is_raised(Signal::StopRequested)
    }

    pub fn pause_requested(&self) -> bool {
        self.signals.is_raised(Signal::PauseRequested)
    }

    /// Cooperate with pending requests.
    ///
    /// Parks in the pause wait when a pause is pending. Returns `false` once
    /// the worker should return.
    pub fn keep_running(&self) -> bool {
        if self.stop_requested() {
            return false;
        }
        if self.pause_requested() {
            self.pause();
        }
        !self.stop_requested()
    }

    /// Sleep for up to `interval`, waking early on stop or pause, then cooperate
    pub fn idle(&self, interval: Duration) -> bool {
        self.signals
            .wait_any_timeout(&[Signal::StopRequested, Signal::PauseRequested], interval);
        self.keep_running()
    }

    /// Do nothing but honor requests until a stop arrives
    pub fn wait_for_stop(&self) {
        while self.idle(STOP_POLL_INTERVAL) {}
    }

    fn pause(&self) {
        self.signals.clear(Signal::WorkerContinued);
        self.signals.raise(Signal::WorkerPaused);
        debug!("{} worker paused", self.service_name);

        self.signals.wait(Signal::ContinueRequested);

        self.signals.clear(Signal::WorkerPaused);
        self.signals.raise(Signal::WorkerContinued);
        debug!("{} worker resumed", self.service_name);
    }
}

/// Raises `WorkerExited` however the user worker leaves the thread
struct ExitGuard(Arc<SignalSet>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.raise(Signal::WorkerExited);
    }
}

/// Owns the dedicated worker thread from spawn until it is joined
pub struct WorkerExecutor {
    handle: JoinHandle<u32>,
    thread_name: String,
}

impl WorkerExecutor {
    pub fn spawn(
        hooks: Arc<dyn ServiceHooks>,
        context: WorkerContext,
        args: Vec<String>,
    ) -> Result<Self> {
        let thread_name = format!("{}-worker", context.service_name());
        let guard = ExitGuard(Arc::clone(&context.signals));

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let _guard = guard;
                hooks.worker(context, &args)
            })
            .map_err(ServiceError::WorkerSpawn)?;

        info!("Worker thread '{}' started", thread_name);
        Ok(Self {
            handle,
            thread_name,
        })
    }

    /// Wait, without timeout, for the worker to finish and return its exit code
    pub fn join(self) -> u32 {
        match self.handle.join() {
            Ok(exit_code) => {
                info!(
                    "Worker thread '{}' exited with code {}",
                    self.thread_name, exit_code
                );
                exit_code
            }
            Err(_) => {
                error!("Worker thread '{}' panicked", self.thread_name);
                1
            }
        }
    }
}
