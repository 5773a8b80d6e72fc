// src/status/mod.rs

//! Execution status tracking.
//!
//! - [`ledger`] owns every recorded [`ExecutionStatus`] and hands out status
//!   identifiers.
//! - [`reaper`] periodically drops records older than the retention window.

pub mod ledger;
pub mod reaper;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use ledger::{RETENTION, StatusLedger};
pub use reaper::{DEFAULT_REAPER_INTERVAL, spawn_reaper};

/// Recorded result of one finished execution, as served by `/status/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub name: String,
    /// Arguments supplied by the caller, not the resolved argv.
    pub args: Vec<String>,
    pub success: bool,
    pub exit_code: i32,
    pub start_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
