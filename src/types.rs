// src/types.rs

use serde::Serialize;

/// Identifier handed out by the status ledger, starting at 1.
pub type StatusId = u64;

/// Exit code recorded when a process did not exit on its own.
pub const KILLED_EXIT_CODE: i32 = -1;

/// How a started subprocess came to an end.
///
/// Failures to start never produce a `Termination`; they surface as
/// [`crate::errors::CommandServerError::FailedToStart`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Termination {
    /// The process exited by itself.
    Exited { exit_code: i32, success: bool },
    /// The configured timeout elapsed and the process was killed.
    TimedOut,
    /// The caller went away (or the server is shutting down) and the process
    /// was killed.
    Cancelled,
}

impl Termination {
    pub fn success(&self) -> bool {
        matches!(self, Termination::Exited { success: true, .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Termination::Exited { exit_code, .. } => *exit_code,
            Termination::TimedOut | Termination::Cancelled => KILLED_EXIT_CODE,
        }
    }
}
