mod local;


pub use local::{ControlSender, LocalServiceManager, StatusReport};

use crate::dispatcher::ControlCode;
use crate::error::Result;
use crate::status::ServiceStatus;
use std::sync::Arc;

/// Invoked by the manager for every control code, on the manager's own context
pub type ControlHandler = Box<dyn Fn(ControlCode) + Send + Sync>;

/// Outbound half of the boundary
pub trait StatusReporter: Send + Sync {
    /// Mirror `status` to the manager. Best effort; callers only log failures.
    fn report_status(&self, status: &ServiceStatus) -> Result<()>;
}

/// Registration half of the boundary with the service manager.
///
/// [`LocalServiceManager`] is the in-process implementation.
pub trait ServiceManager: Send + Sync {
    /// Hand the calling thread to the manager until `service_main` has run.
    ///
    /// Fails with `ServiceError::Registration` when the manager refuses the
    /// process.
    fn start_dispatcher(
        &self,
        service_name: &str,
        service_main: &mut dyn FnMut(Vec<String>),
    ) -> Result<()>;

    /// Associate `handler` with `service_name` and obtain its status reporter
    fn register_control_handler(
        &self,
        service_name: &str,
        handler: ControlHandler,
    ) -> Result<Arc<dyn StatusReporter>>;
}
