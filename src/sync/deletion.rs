use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{self, format_timestamp, Database};
use crate::error::SyncError;
use crate::forum::ForumClient;

/// Outcome of one deletion scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub candidates: usize,
    pub tombstoned: usize,
    pub alive: usize,
    /// Probes that failed for a reason other than the topic being gone.
    pub probe_errors: usize,
}

/// The `[now - 2d, now - d)` window of last-updated times to probe.
///
/// # Errors
///
/// Returns [`SyncError::InvalidWindow`] if `d` is zero or too large to
/// subtract from `now`.
pub fn scan_window(
    now: DateTime<Utc>,
    d: Duration,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SyncError> {
    if d.is_zero() {
        return Err(SyncError::InvalidWindow("duration must be positive".to_string()));
    }
    let delta = TimeDelta::from_std(d)
        .map_err(|_| SyncError::InvalidWindow(format!("duration {d:?} is out of range")))?;
    let out_of_range = || SyncError::InvalidWindow(format!("duration {d:?} is out of range"));

    let latest = now.checked_sub_signed(delta).ok_or_else(out_of_range)?;
    let earliest = latest.checked_sub_signed(delta).ok_or_else(out_of_range)?;
    Ok((earliest, latest))
}

/// Probes recently-stale topics and tombstones those gone from the forum.
#[derive(Debug, Clone)]
pub struct DeletionScanner {
    client: ForumClient,
    db: Database,
}

impl DeletionScanner {
    #[must_use]
    pub fn new(client: ForumClient, db: Database) -> Self {
        Self { client, db }
    }

    /// Scan topics last updated between `2d` and `d` ago.
    ///
    /// # Errors
    ///
    /// Fails on an invalid window or a store failure; probe failures are
    /// logged and counted instead.
    pub async fn scan(&self, d: Duration) -> Result<ScanReport, SyncError> {
        self.scan_at(Utc::now(), d).await
    }

    /// [`scan`](Self::scan) with an explicit notion of "now".
    ///
    /// # Errors
    ///
    /// Same as [`scan`](Self::scan).
    pub async fn scan_at(&self, now: DateTime<Utc>, d: Duration) -> Result<ScanReport, SyncError> {
        let (earliest, latest) = scan_window(now, d)?;
        let pool = self.db.pool();

        let candidates = db::topic_ids_updated_between(
            pool,
            &format_timestamp(earliest),
            &format_timestamp(latest),
        )
        .await
        .map_err(SyncError::Persistence)?;

        info!(
            candidates = candidates.len(),
            earliest = %earliest,
            latest = %latest,
            "Probing topics for deletion"
        );

        let mut report = ScanReport {
            candidates: candidates.len(),
            ..ScanReport::default()
        };

        for topic_id in candidates {
            match self.client.probe_topic(topic_id).await {
                Ok(stream) => {
                    debug!(topic_id, posts = stream.len(), "Topic still exists");
                    report.alive += 1;
                }
                Err(e) if e.is_gone() => {
                    info!(topic_id, "Topic has been deleted");
                    let marked = db::mark_topic_deleted(pool, topic_id, &format_timestamp(Utc::now()))
                        .await
                        .map_err(SyncError::Persistence)?;
                    if marked {
                        report.tombstoned += 1;
                    }
                }
                Err(e) => {
                    warn!(topic_id, "Failed to probe topic: {e}");
                    report.probe_errors += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scan_window_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let (earliest, latest) = scan_window(now, Duration::from_secs(86_400)).unwrap();
        assert_eq!(earliest, Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap());
        assert_eq!(latest, Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_scan_window_rejects_zero_and_huge() {
        let now = Utc::now();
        assert!(matches!(
            scan_window(now, Duration::ZERO),
            Err(SyncError::InvalidWindow(_))
        ));
        assert!(matches!(
            scan_window(now, Duration::from_secs(u64::MAX)),
            Err(SyncError::InvalidWindow(_))
        ));
    }
}
