//!
//! src/scheduler.rs  Andrew Belles  Oct 9th, 2026
//!
//! Hourly trigger for the cached chart, fired at the top of every hour
//!

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::ChartEngine;

/// Time left until the next top of the hour. Exactly on the hour means a
/// full hour away.
pub fn next_hour_boundary(now: DateTime<Utc>) -> Duration {
    let into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    let nanos = u64::from(now.nanosecond() % 1_000_000_000);
    Duration::from_secs(3600 - into_hour) - Duration::from_nanos(nanos)
}

pub async fn run_hourly(engine: Arc<ChartEngine>, shutdown: CancellationToken) {
    info!("scheduler.start");
    loop {
        let wait = next_hour_boundary(Utc::now());
        debug!(wait_secs = wait.as_secs(), "scheduler.sleep");
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(wait) => engine.scheduled_refresh().await
        }
    }
    info!("scheduler.stop");
}
