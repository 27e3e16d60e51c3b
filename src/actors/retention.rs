//! Periodic result-log retention
//!
//! When a retention period is configured, a background task deletes log
//! entries older than that period once at startup and then on every
//! cleanup interval. Failures are logged and retried on the next run.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, trace};

use crate::storage::{StorageBackend, StorageResult};

/// Default period between cleanups
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Log entries older than this many days are deleted
    pub retention_days: u32,

    pub cleanup_interval: Duration,
}

impl RetentionPolicy {
    pub fn days(retention_days: u32) -> Self {
        Self {
            retention_days,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// Delete log entries older than `retention_days`
#[instrument(skip(store))]
pub async fn run_cleanup(store: &dyn StorageBackend, retention_days: u32) -> StorageResult<usize> {
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
    debug!("running retention cleanup (deleting entries before {})", cutoff);

    let deleted = store.cleanup_old_logs(cutoff).await?;
    if deleted > 0 {
        info!("retention cleanup complete: deleted {} old log entries", deleted);
    } else {
        trace!("retention cleanup: no old log entries to delete");
    }

    Ok(deleted)
}

/// Spawn the cleanup loop; abort the handle to stop it
pub fn spawn_retention(store: Arc<dyn StorageBackend>, policy: RetentionPolicy) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(
            "retention cleanup enabled: {} days, every {}s",
            policy.retention_days,
            policy.cleanup_interval.as_secs()
        );

        // The first tick fires immediately, giving the startup cleanup
        let mut ticker = interval(policy.cleanup_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = run_cleanup(store.as_ref(), policy.retention_days).await {
                error!("failed to cleanup old log entries: {}", e);
            }
        }
    })
}
