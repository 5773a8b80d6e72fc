// src/status/reaper.rs

//! Background expiry of old status records.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::status::StatusLedger;

pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Spawn the reaper loop.
///
/// The first sweep happens immediately, then one sweep per `interval` until
/// `cancel` fires.
pub fn spawn_reaper(
    ledger: Arc<StatusLedger>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "status reaper started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = ledger.sweep(Utc::now());
                    debug!(removed, "reaper sweep finished");
                }
            }
        }

        info!("status reaper stopped");
    })
}
