pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hooks;
pub mod lifecycle;
pub mod manager;
pub mod registry;
pub mod service;
pub mod signals;
pub mod status;
pub mod worker;

#[cfg(test)]
mod testing;

pub use self::config::ServiceConfig;
pub use dispatcher::{ControlCode, ControlDispatcher, DispatchOutcome};
pub use error::{Result, ServiceError};
pub use hooks::{NoopHooks, ServiceHooks, WorkerFn};
pub use lifecycle::{LifecycleController, LifecycleOptions};
pub use manager::{
    ControlHandler, ControlSender, LocalServiceManager, ServiceManager, StatusReport,
    StatusReporter,
};
pub use registry::{RegistrationGuard, ServiceRegistry};
pub use service::Service;
pub use signals::{DefaultSignalFactory, Signal, SignalFactory, SignalSet};
pub use status::{AcceptedControls, ServiceIdentity, ServiceState, ServiceStatus};
pub use worker::{WorkerContext, WorkerExecutor};
