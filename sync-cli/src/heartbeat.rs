//! Periodic liveness log.
//!
//! Runs beside the sync loop and shares nothing with it except the
//! cancellation token.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

/// Spawn the heartbeat task.
///
/// Logs an incrementing counter every `period` until `cancel` fires. A zero
/// period disables the heartbeat. The handle resolves to the number of
/// ticks logged.
pub fn spawn_heartbeat(period: Duration, cancel: CancellationToken) -> JoinHandle<u64> {
    tokio::spawn(async move {
        if period.is_zero() {
            tracing::info!("Heartbeat disabled");
            return 0;
        }

        tracing::debug!("Heartbeat started (interval: {:?})", period);

        // First tick after one full period, not immediately
        let mut timer = interval_at(Instant::now() + period, period);
        let mut count = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {
                    count += 1;
                    tracing::info!(count, "Heartbeat");
                }
            }
        }

        tracing::debug!("Heartbeat stopped after {} ticks", count);
        count
    })
}
