//! Retention purge of stale leads, businesses and rotation history

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::StoreResult;
use crate::infrastructure::LeadStore;
use crate::models::PurgeReport;

/// Removes rows older than the retention window
pub struct RetentionPolicy {
    window: Duration,
}

impl RetentionPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    pub async fn purge(&self, store: &dyn LeadStore, now: DateTime<Utc>) -> StoreResult<PurgeReport> {
        let cutoff = self.cutoff(now);
        info!(
            "🧹 Purging records older than {} days (before {})",
            self.window.num_days(),
            cutoff.format("%Y-%m-%d")
        );
        let report = store.purge_older_than(cutoff).await?;
        info!(
            "🧹 Purged {} leads, {} businesses, {} rotation entries",
            report.leads, report.businesses, report.rotations
        );
        Ok(report)
    }
}
