use crate::error::Result;
use crate::lifecycle::LifecycleOptions;
use crate::status::ServiceIdentity;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    pub service: IdentityConfig,
    pub lifecycle: LifecycleConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IdentityConfig {
    /// Name the service registers under
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Whether pause and continue controls are accepted
    #[serde(default = "default_supports_pause_continue")]
    pub supports_pause_continue: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LifecycleConfig {
    /// Wait hint reported with pending states, in milliseconds
    #[serde(default = "default_pending_wait_hint_ms")]
    pub pending_wait_hint_ms: u64,

    /// Checkpoint cadence while waiting on the worker (0 disables)
    #[serde(default = "default_checkpoint_interval_ms")]
    pub checkpoint_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkerConfig {
    /// Interval between heartbeat ticks of the bundled worker
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: json, pretty or compact
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional log file written in addition to stderr
    #[serde(default)]
    pub file: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("service.name", default_service_name())?
            .set_default(
                "service.supports_pause_continue",
                default_supports_pause_continue(),
            )?
            .set_default(
                "lifecycle.pending_wait_hint_ms",
                default_pending_wait_hint_ms() as i64,
            )?
            .set_default(
                "lifecycle.checkpoint_interval_ms",
                default_checkpoint_interval_ms() as i64,
            )?
            .set_default("worker.tick_interval_ms", default_tick_interval_ms() as i64)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment overrides, e.g. SVCRUNNER__SERVICE__NAME
            .add_source(
                Environment::with_prefix("SVCRUNNER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServiceConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::Message(
                "Service name must not be empty".to_string(),
            ));
        }

        if self.worker.tick_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Worker tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty" | "compact") {
            return Err(ConfigError::Message(format!(
                "Unknown log format '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }

    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity::new(
            self.service.name.clone(),
            self.service.supports_pause_continue,
        )
    }

    pub fn lifecycle_options(&self) -> LifecycleOptions {
        let checkpoint_interval = match self.lifecycle.checkpoint_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        LifecycleOptions {
            pending_wait_hint: Duration::from_millis(self.lifecycle.pending_wait_hint_ms),
            checkpoint_interval,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.worker.tick_interval_ms)
    }

    /// Render as TOML, e.g. for `--print-config`
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service: IdentityConfig {
                name: default_service_name(),
                supports_pause_continue: default_supports_pause_continue(),
            },
            lifecycle: LifecycleConfig {
                pending_wait_hint_ms: default_pending_wait_hint_ms(),
                checkpoint_interval_ms: default_checkpoint_interval_ms(),
            },
            worker: WorkerConfig {
                tick_interval_ms: default_tick_interval_ms(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
                file: None,
            },
        }
    }
}

// Default value functions
fn default_service_name() -> String {
    "svcrunner".to_string()
}
fn default_supports_pause_continue() -> bool {
    true
}

fn default_pending_wait_hint_ms() -> u64 {
    3000
}
fn default_checkpoint_interval_ms() -> u64 {
    1000
}

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
