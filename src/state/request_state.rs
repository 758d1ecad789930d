/// Request state definitions for tracking crawl progress
///
/// This module defines all possible states a crawl request can be in during a run.
use std::fmt;

/// Represents the current state of a crawl request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    // ===== Active States =====
    /// Request is queued and waiting to be dispatched
    Pending,

    /// Request is being fetched or handled
    InProgress,

    // ===== Terminal States =====
    /// Page was fetched and its handler completed
    Handled,

    /// Request failed after exhausting its retries, or failed permanently
    Failed,

    /// Request was still queued when the request ceiling was reached
    Skipped,
}

impl RequestState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::InProgress)
    }

    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Handled => "handled",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parses a state from its database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "handled" => Some(Self::Handled),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Returns all possible request states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::InProgress,
            Self::Handled,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
