use crate::lifecycle::LifecycleController;
use crate::status::ServiceState;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Control requests delivered by the service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCode {
    Stop,
    Pause,
    Continue,
    Interrogate,
    Shutdown,
    /// Any code this service does not handle
    Other(u32),
}

impl ControlCode {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Stop,
            2 => Self::Pause,
            3 => Self::Continue,
            4 => Self::Interrogate,
            5 => Self::Shutdown,
            other => Self::Other(other),
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::Stop => 1,
            Self::Pause => 2,
            Self::Continue => 3,
            Self::Interrogate => 4,
            Self::Shutdown => 5,
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Pause => write!(f, "pause"),
            Self::Continue => write!(f, "continue"),
            Self::Interrogate => write!(f, "interrogate"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::Other(raw) => write!(f, "{}", raw),
        }
    }
}

impl FromStr for ControlCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            "pause" => Ok(Self::Pause),
            "continue" => Ok(Self::Continue),
            "interrogate" => Ok(Self::Interrogate),
            "shutdown" => Ok(Self::Shutdown),
            other => other
                .parse::<u32>()
                .map(Self::from_raw)
                .map_err(|_| format!("Unknown control code: {}", other)),
        }
    }
}

/// Whether a control code caused any action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Ignored,
}

impl From<bool> for DispatchOutcome {
    fn from(handled: bool) -> Self {
        if handled {
            Self::Handled
        } else {
            Self::Ignored
        }
    }
}

/// Routes control codes to lifecycle transitions.
///
/// Codes arrive one at a time. A code whose source state does not match is
/// dropped without error; duplicate stops are normal.
pub struct ControlDispatcher {
    controller: Arc<LifecycleController>,
}

impl ControlDispatcher {
    pub fn new(controller: Arc<LifecycleController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<LifecycleController> {
        &self.controller
    }

    pub fn dispatch(&self, code: ControlCode) -> DispatchOutcome {
        let state = self.controller.current_state();
        let pausable = self.controller.identity().supports_pause_continue();

        let outcome: DispatchOutcome = match (code, state) {
            (ControlCode::Stop, ServiceState::Running)
            | (ControlCode::Shutdown, ServiceState::Running) => {
                self.controller.request_stop().into()
            }
            (ControlCode::Stop, ServiceState::Paused) => {
                self.controller.request_stop_while_paused().into()
            }
            (ControlCode::Pause, ServiceState::Running) if pausable => {
                self.controller.request_pause().into()
            }
            (ControlCode::Continue, ServiceState::Paused) if pausable => {
                self.controller.request_continue().into()
            }
            (ControlCode::Interrogate, _) => {
                self.controller.interrogate();
                DispatchOutcome::Handled
            }
            _ => DispatchOutcome::Ignored,
        };

        if outcome == DispatchOutcome::Ignored {
            debug!("Ignoring control '{}' in state {}", code, state);
        }
        outcome
    }
}
