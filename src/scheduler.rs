//! Built-in periodic triggers for the ingestion cycle and the deletion scan.
//!
//! Both loops only invoke the same entry points the web triggers use. A
//! failed or rejected run is logged and the next attempt waits for the next
//! tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::sync::{DeletionScanner, SyncEngine};

/// Run the ingestion cycle every `interval`, forever.
pub async fn run_sync_loop(engine: Arc<SyncEngine>, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "Sync loop started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match engine.run_cycle().await {
            Ok(report) if report.posts_saved > 0 => {
                info!(
                    new_topics = report.new_topics,
                    posts_saved = report.posts_saved,
                    watermark = report.watermark,
                    "Sync cycle complete"
                );
            }
            Ok(report) => {
                debug!(watermark = report.watermark, "No new posts");
            }
            Err(SyncError::AlreadyRunning) => {
                warn!("Sync cycle skipped, previous cycle still running");
            }
            Err(e) => {
                error!("Sync cycle failed: {e}");
            }
        }
    }
}

/// Run the deletion scan with window `d`, once every `d`, forever.
///
/// Spacing runs by `d` makes consecutive windows tile, so each topic is
/// probed in exactly one scan.
pub async fn run_deletion_loop(scanner: Arc<DeletionScanner>, d: Duration) {
    info!(window_secs = d.as_secs(), "Deletion scan loop started");
    let mut ticker = tokio::time::interval(d);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match scanner.scan(d).await {
            Ok(report) => {
                info!(
                    candidates = report.candidates,
                    tombstoned = report.tombstoned,
                    probe_errors = report.probe_errors,
                    "Deletion scan complete"
                );
            }
            Err(e) => {
                error!("Deletion scan failed: {e}");
            }
        }
    }
}
