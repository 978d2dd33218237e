use crate::error::ServiceError;
use crate::worker::WorkerContext;

/// Callbacks supplied by the embedding application.
///
/// Every hook defaults to a no-op. The default `worker` idles until a stop is
/// requested, honoring pause requests along the way.
pub trait ServiceHooks: Send + Sync + 'static {
    /// Runs while the service reports START_PENDING
    fn on_startup(&self) {}

    /// The service's work, run on the dedicated worker thread
    fn worker(&self, context: WorkerContext, _args: &[String]) -> u32 {
        context.wait_for_stop();
        0
    }

    fn on_stop(&self) {}

    fn on_pause(&self) {}

    /// Also fires when a stop arrives while paused, to release the pause wait
    fn on_continue(&self) {}

    /// Runs after the worker thread has exited, before STOPPED is reported
    fn on_exit(&self) {}

    /// Runs when startup cannot complete
    fn on_error(&self, _error: &ServiceError) {}
}

/// Hooks that do nothing beyond the default idle worker
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ServiceHooks for NoopHooks {}

/// Adapts a closure into a hook set that only customizes the worker
pub struct WorkerFn<F>(pub F);

impl<F> ServiceHooks for WorkerFn<F>
where
    F: Fn(WorkerContext, &[String]) -> u32 + Send + Sync + 'static,
{
    fn worker(&self, context: WorkerContext, args: &[String]) -> u32 {
        (self.0)(context, args)
    }
}
