//! Lifecycle states of a crawl session
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a crawl session
///
/// ```text
/// Idle -> Running -> Completed | Stopped | Fatal
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Session created, loop not started yet
    Idle,

    /// Crawl loop is running
    Running,

    // ===== Terminal States =====
    /// Frontier emptied or page budget used up
    Completed,

    /// Stop was requested and honored before the next frontier pop
    Stopped,

    /// An unexpected error escaped the crawl loop
    Fatal,
}

impl SessionState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Fatal)
    }

    /// Returns true if the transition from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Fatal)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Stopped)
                | (Self::Running, Self::Fatal)
        )
    }

    /// Converts the state to its manifest string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Fatal => "fatal",
        }
    }

    /// Parses a state from its manifest string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "stopped" => Some(Self::Stopped),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
