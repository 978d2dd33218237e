use crate::config::ServiceConfig;
use crate::dispatcher::{ControlCode, ControlDispatcher};
use crate::error::{Result, ServiceError};
use crate::hooks::ServiceHooks;
use crate::lifecycle::{LifecycleController, LifecycleOptions};
use crate::manager::ServiceManager;
use crate::registry::ServiceRegistry;
use crate::signals::{DefaultSignalFactory, SignalFactory};
use crate::status::ServiceIdentity;
use crate::worker::{WorkerContext, WorkerExecutor};
use std::sync::Arc;
use tracing::{error, info, info_span};

#[cfg(test)]
mod tests;

/// A service instance: identity, user hooks and lifecycle tuning.
///
/// One `run` hosts one service for one process invocation.
pub struct Service {
    identity: ServiceIdentity,
    hooks: Arc<dyn ServiceHooks>,
    options: LifecycleOptions,
    signal_factory: Arc<dyn SignalFactory>,
}

impl Service {
    pub fn new<H: ServiceHooks>(identity: ServiceIdentity, hooks: H) -> Self {
        Self::from_shared(identity, Arc::new(hooks))
    }

    /// Like [`Service::new`] for hooks the caller keeps a handle to
    pub fn from_shared(identity: ServiceIdentity, hooks: Arc<dyn ServiceHooks>) -> Self {
        Self {
            identity,
            hooks,
            options: LifecycleOptions::default(),
            signal_factory: Arc::new(DefaultSignalFactory),
        }
    }

    /// Build a service whose identity and tuning come from configuration
    pub fn from_config<H: ServiceHooks>(config: &ServiceConfig, hooks: H) -> Self {
        Self::new(config.identity(), hooks).with_options(config.lifecycle_options())
    }

    pub fn with_options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_signal_factory(mut self, signal_factory: Arc<dyn SignalFactory>) -> Self {
        self.signal_factory = signal_factory;
        self
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Register with `manager` and host the service until it stops.
    ///
    /// Returns the worker's exit code. Registration and startup failures are
    /// returned as errors; their numeric code is [`ServiceError::code`].
    pub fn run(&self, manager: &dyn ServiceManager) -> Result<u32> {
        let registry = Arc::new(ServiceRegistry::new());
        let span = info_span!(
            "service",
            name = %self.identity.name(),
            run_id = %registry.run_id()
        );
        let _enter = span.enter();

        let mut outcome = Err(ServiceError::system("service main never ran"));
        manager.start_dispatcher(self.identity.name(), &mut |args| {
            outcome = self.service_main(manager, &registry, args);
        })?;

        match &outcome {
            Ok(exit_code) => info!("Service run finished with exit code {}", exit_code),
            Err(e) => error!("Service run failed: {}", e),
        }
        outcome
    }

    fn service_main(
        &self,
        manager: &dyn ServiceManager,
        registry: &Arc<ServiceRegistry>,
        args: Vec<String>,
    ) -> Result<u32> {
        let handler_registry = Arc::clone(registry);
        let reporter = manager.register_control_handler(
            self.identity.name(),
            Box::new(move |code: ControlCode| {
                handler_registry.dispatch(code);
            }),
        )?;

        let controller = Arc::new(
            LifecycleController::new(self.identity.clone(), Arc::clone(&self.hooks), reporter)
                .with_options(self.options.clone())
                .with_signal_factory(Arc::clone(&self.signal_factory)),
        );
        let _registration =
            registry.install(Arc::new(ControlDispatcher::new(Arc::clone(&controller))));

        controller.startup()?;

        let signals = controller
            .signals()
            .ok_or_else(|| ServiceError::system("signals missing after startup"))?;
        let context = WorkerContext::new(signals, self.identity.name());

        let executor = match WorkerExecutor::spawn(Arc::clone(&self.hooks), context, args) {
            Ok(executor) => executor,
            Err(e) => {
                error!("Could not start worker: {}", e);
                controller.fail(&e);
                return Err(e);
            }
        };

        let exit_code = executor.join();
        controller.shutdown(exit_code);
        Ok(exit_code)
    }
}
