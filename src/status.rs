use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Service states as seen by the service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceState {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
}

impl ServiceState {
    /// Numeric value used by the platform status record
    pub fn as_raw(self) -> u32 {
        match self {
            Self::Stopped => 1,
            Self::StartPending => 2,
            Self::StopPending => 3,
            Self::Running => 4,
            Self::ContinuePending => 5,
            Self::PausePending => 6,
            Self::Paused => 7,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Stopped),
            2 => Some(Self::StartPending),
            3 => Some(Self::StopPending),
            4 => Some(Self::Running),
            5 => Some(Self::ContinuePending),
            6 => Some(Self::PausePending),
            7 => Some(Self::Paused),
            _ => None,
        }
    }

    /// Transitional states during which the manager expects checkpoint progress
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            Self::StartPending | Self::StopPending | Self::ContinuePending | Self::PausePending
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "STOPPED"),
            Self::StartPending => write!(f, "START_PENDING"),
            Self::StopPending => write!(f, "STOP_PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::ContinuePending => write!(f, "CONTINUE_PENDING"),
            Self::PausePending => write!(f, "PAUSE_PENDING"),
            Self::Paused => write!(f, "PAUSED"),
        }
    }
}

bitflags! {
    /// Control requests the service is currently willing to accept
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AcceptedControls: u32 {
        const STOP = 0x0000_0001;
        const PAUSE_CONTINUE = 0x0000_0002;
        const SHUTDOWN = 0x0000_0004;
    }
}

impl AcceptedControls {
    /// Controls accepted while the service is steady (running or paused)
    pub fn enabled_for(identity: &ServiceIdentity) -> Self {
        let mut controls = Self::STOP | Self::SHUTDOWN;
        if identity.supports_pause_continue() {
            controls |= Self::PAUSE_CONTINUE;
        }
        controls
    }
}

/// Immutable description of the hosted service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    name: String,
    supports_pause_continue: bool,
}

impl ServiceIdentity {
    pub fn new<S: Into<String>>(name: S, supports_pause_continue: bool) -> Self {
        Self {
            name: name.into(),
            supports_pause_continue,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supports_pause_continue(&self) -> bool {
        self.supports_pause_continue
    }
}

/// The status record mirrored to the service manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub current_state: ServiceState,
    pub controls_accepted: AcceptedControls,
    pub win32_exit_code: u32,
    pub service_specific_exit_code: u32,
    pub checkpoint: u32,
    pub wait_hint: Duration,
}

impl ServiceStatus {
    /// A zeroed record in the initial state
    pub fn new() -> Self {
        Self {
            current_state: ServiceState::StartPending,
            controls_accepted: AcceptedControls::empty(),
            win32_exit_code: 0,
            service_specific_exit_code: 0,
            checkpoint: 0,
            wait_hint: Duration::ZERO,
        }
    }
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self::new()
    }
}
