use thiserror::Error;

/// Platform code reported when the service stops with its own exit code.
pub const ERROR_SERVICE_SPECIFIC_ERROR: u32 = 1066;

/// Generic failure code used when an error carries no platform code.
pub const ERROR_GEN_FAILURE: u32 = 31;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Registration with the service manager failed (code {code})")]
    Registration { code: u32 },

    #[error("Failed to allocate lifecycle signals (code {code})")]
    ResourceAllocation { code: u32 },

    #[error("Status report rejected: {message}")]
    StatusReport { message: String },

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("System error: {message}")]
    System { message: String },
}

impl ServiceError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn status_report<S: Into<String>>(message: S) -> Self {
        Self::StatusReport {
            message: message.into(),
        }
    }

    /// Numeric code surfaced to the manager or to the caller of `Service::run`
    pub fn code(&self) -> u32 {
        match self {
            ServiceError::Registration { code } | ServiceError::ResourceAllocation { code } => {
                *code
            }
            ServiceError::WorkerSpawn(e) | ServiceError::Io(e) => e
                .raw_os_error()
                .and_then(|raw| u32::try_from(raw).ok())
                .unwrap_or(ERROR_GEN_FAILURE),
            _ => ERROR_GEN_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
