use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Render a timestamp the way the store keeps it.
///
/// Fixed-width UTC RFC 3339 with milliseconds, so text comparison in SQL
/// orders the same as time.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A mirrored forum topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub updated_at: String,
    /// Tombstone. `None` while the topic still exists at the source.
    pub deleted_at: Option<String>,
    /// Set once on first write and never refreshed.
    pub category_name: String,
    pub category_color: String,
}

impl Topic {
    /// A topic seen for the first time, before its category is resolved.
    #[must_use]
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            updated_at: String::new(),
            deleted_at: None,
            category_name: String::new(),
            category_color: String::new(),
        }
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    #[must_use]
    pub fn has_category(&self) -> bool {
        !self.category_name.is_empty()
    }

    #[must_use]
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated_at)
    }

    #[must_use]
    pub fn deleted_at_utc(&self) -> Option<DateTime<Utc>> {
        self.deleted_at.as_deref().and_then(parse_timestamp)
    }
}

/// A mirrored post, stored under its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub name: String,
    pub username: String,
    pub created_at: String,
    pub cooked: String,
    pub raw: String,
    pub post_number: i64,
    pub hidden: bool,
    pub action_code: Option<String>,
    pub category_id: i64,
    /// Reserved for per-post deletion tracking; ingestion never sets it.
    pub deleted_at: Option<String>,
}

impl Post {
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

/// Data for writing a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub id: i64,
    pub topic_id: i64,
    pub name: String,
    pub username: String,
    pub created_at: String,
    pub cooked: String,
    pub raw: String,
    pub post_number: i64,
    pub hidden: bool,
    pub action_code: Option<String>,
    pub category_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(format_timestamp(a), "2024-01-01T09:00:00.000Z");
        assert!(format_timestamp(a) < format_timestamp(b));
    }

    #[test]
    fn test_timestamp_roundtrip_normalises_offset() {
        let parsed = parse_timestamp("2024-03-05T12:30:00+02:00").unwrap();
        assert_eq!(format_timestamp(parsed), "2024-03-05T10:30:00.000Z");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_new_topic_has_no_category_or_tombstone() {
        let topic = Topic::new(50, "Hello");
        assert!(!topic.has_category());
        assert!(!topic.is_deleted());
        assert!(topic.updated_at_utc().is_none());
    }
}
