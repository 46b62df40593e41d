//!
//! src/cache.rs  Andrew Belles  Oct 7th, 2026
//!
//! Refresh-on-read cache for a single chart source. Reads never take
//! the refresh lock when the snapshot is fresh; refreshes serialize so
//! concurrent stale reads collapse into one upstream fetch.
//!

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::ChartError;
use crate::types::ChartEntry;

/// Anything that can produce a full, normalized chart in one go.
#[async_trait]
pub trait ChartSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_chart(&self) -> Result<Vec<ChartEntry>, ChartError>;
}

/// Immutable snapshot; replaced wholesale on every successful refresh.
#[derive(Debug, Default)]
pub struct CachedChart {
    entries: Vec<ChartEntry>,
    fetched_at: Option<Instant>
}

impl CachedChart {
    fn fetched(entries: Vec<ChartEntry>) -> Self {
        Self { entries, fetched_at: Some(Instant::now()) }
    }

    pub fn entries(&self) -> &[ChartEntry] { &self.entries }
    pub fn fetched_at(&self) -> Option<Instant> { self.fetched_at }

    /// At least one refresh has succeeded. An empty chart still counts.
    pub fn is_populated(&self) -> bool { self.fetched_at.is_some() }

    pub fn is_fresh(&self, interval: Duration, now: Instant) -> bool {
        self.fetched_at
            .is_some_and(|at| now.saturating_duration_since(at) < interval)
    }
}

pub struct CacheCoordinator {
    source: Arc<dyn ChartSource>,
    interval: Duration,
    snapshot: watch::Sender<Arc<CachedChart>>,
    /// Held for the whole upstream fetch; guards the last failure.
    refresh_lock: Mutex<Option<ChartError>>,
    /// Bumped under the lock each time an upstream attempt finishes.
    attempts: AtomicU64
}

impl CacheCoordinator {
    pub fn new(source: Arc<dyn ChartSource>, interval: Duration) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(CachedChart::default()));
        Self {
            source,
            interval,
            snapshot,
            refresh_lock: Mutex::new(None),
            attempts: AtomicU64::new(0)
        }
    }

    /// Current snapshot without any freshness check.
    pub fn snapshot(&self) -> Arc<CachedChart> {
        self.snapshot.borrow().clone()
    }

    /// Fresh snapshot if there is one, otherwise refreshes. A failed
    /// refresh falls back to the stale snapshot; it is only an error when
    /// nothing has ever been fetched. Readers that queued behind a failed
    /// attempt share its outcome instead of fetching again.
    pub async fn get_or_refresh(&self) -> Result<Arc<CachedChart>, ChartError> {
        let current = self.snapshot();
        if current.is_fresh(self.interval, Instant::now()) {
            return Ok(current);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut last_failure = self.refresh_lock.lock().await;

        // another caller may have refreshed while we waited
        let current = self.snapshot();
        if current.is_fresh(self.interval, Instant::now()) {
            return Ok(current);
        }

        // an attempt finished while we queued and it failed
        let shared = if self.attempts.load(Ordering::Acquire) != seen {
            (*last_failure).clone()
        } else {
            None
        };
        let outcome = match shared {
            Some(e) => {
                debug!(source = self.source.name(), error = %e, "chart.refresh.joined");
                Err(e)
            }
            None => self.refresh_locked(&mut last_failure).await
        };

        match outcome {
            Ok(fresh) => Ok(fresh),
            Err(e) if current.is_populated() => {
                warn!(
                    source = self.source.name(), error = %e,
                    entries = current.entries().len(),
                    age_secs = current.fetched_at().map(|at| at.elapsed().as_secs()),
                    "chart.refresh.stale"
                );
                Ok(current)
            }
            Err(e) => Err(e)
        }
    }

    /// Unconditional refresh for the hourly trigger. Shares the lock with
    /// read-triggered refreshes; on error the old snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<CachedChart>, ChartError> {
        let mut last_failure = self.refresh_lock.lock().await;
        self.refresh_locked(&mut last_failure).await
    }

    async fn refresh_locked(&self, last_failure: &mut MutexGuard<'_, Option<ChartError>>) ->
        Result<Arc<CachedChart>, ChartError> {

        info!(source = self.source.name(), "chart.refresh.start");
        let fetched = self.source.fetch_chart().await;
        self.attempts.fetch_add(1, Ordering::AcqRel);

        match fetched {
            Ok(entries) => {
                let fresh = Arc::new(CachedChart::fetched(entries));
                self.snapshot.send_replace(fresh.clone());
                **last_failure = None;
                info!(
                    source = self.source.name(),
                    entries = fresh.entries().len(), "chart.refresh.done"
                );
                Ok(fresh)
            }
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "chart.refresh.failed");
                **last_failure = Some(e.clone());
                Err(e)
            }
        }
    }
}
