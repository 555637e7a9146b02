//! Error taxonomy for the forum source and the sync engine.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the source forum.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The forum says the resource no longer exists or is not visible to us.
    #[error("resource gone at source (HTTP {status})")]
    Gone { status: StatusCode },

    /// Any other non-success status.
    #[error("source returned HTTP {status}")]
    Status { status: StatusCode },

    /// Connection, timeout or body decoding failure.
    #[error("source request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SourceError {
    /// Classify a non-success status.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        if is_gone_status(status) {
            Self::Gone { status }
        } else {
            Self::Status { status }
        }
    }

    #[must_use]
    pub const fn is_gone(&self) -> bool {
        matches!(self, Self::Gone { .. })
    }
}

/// Statuses Discourse uses for deleted, private or purged topics.
#[must_use]
pub fn is_gone_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE
    )
}

/// Failure of an ingestion cycle or deletion scan.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Another ingestion cycle holds the engine.
    #[error("already running")]
    AlreadyRunning,

    /// Reading from or writing to the store failed; the cycle was aborted.
    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),

    /// The deletion-scan duration cannot produce a window.
    #[error("invalid scan window: {0}")]
    InvalidWindow(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gone_statuses() {
        assert!(SourceError::from_status(StatusCode::NOT_FOUND).is_gone());
        assert!(SourceError::from_status(StatusCode::FORBIDDEN).is_gone());
        assert!(SourceError::from_status(StatusCode::GONE).is_gone());
    }

    #[test]
    fn test_other_statuses_are_not_gone() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::UNAUTHORIZED,
        ] {
            let err = SourceError::from_status(status);
            assert!(!err.is_gone(), "{status} must not be a gone-signal");
            assert!(matches!(err, SourceError::Status { .. }));
        }
    }

    #[test]
    fn test_sync_error_display() {
        assert_eq!(SyncError::AlreadyRunning.to_string(), "already running");
        let err = SyncError::Persistence(anyhow::anyhow!("disk full").context("Failed to upsert topic"));
        assert_eq!(err.to_string(), "persistence failure: Failed to upsert topic: disk full");
    }
}
