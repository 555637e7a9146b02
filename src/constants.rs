//! Shared constants used across the application.

/// User agent sent with every request to the source forum.
pub const MIRROR_USER_AGENT: &str = concat!("forum-mirror/", env!("CARGO_PKG_VERSION"));

/// Number of topics shown in each list on the index page.
pub const TOPIC_LIST_LIMIT: i64 = 50;

/// `sync_state` key under which the ingestion watermark is persisted.
pub const WATERMARK_KEY: &str = "last_post_id";

/// Upper bound on pages requested during a single topic backfill.
///
/// Discourse serves 20 posts per page, so this covers topics far larger
/// than any the forum allows.
pub const MAX_TOPIC_PAGES: u32 = 1000;
