//! Integration tests for the deletion scanner.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use forum_mirror::db::{format_timestamp, get_topic, upsert_topic, Database, Topic};
use forum_mirror::error::SyncError;
use forum_mirror::forum::ForumClient;
use forum_mirror::sync::DeletionScanner;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOUR: Duration = Duration::from_secs(3600);

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn scanner(server: &MockServer, db: &Database) -> DeletionScanner {
    let client = ForumClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    DeletionScanner::new(client, db.clone())
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()
}

/// Store a topic last updated `minutes_ago` before [`now`].
async fn seed_topic(db: &Database, id: i64, minutes_ago: i64) -> Topic {
    let topic = Topic {
        updated_at: format_timestamp(now() - TimeDelta::minutes(minutes_ago)),
        category_name: "Support".to_string(),
        category_color: "0088CC".to_string(),
        ..Topic::new(id, format!("Topic {id}"))
    };
    upsert_topic(db.pool(), &topic).await.unwrap();
    topic
}

async fn mount_probe(server: &MockServer, topic_id: i64, status: u16, expected_calls: u64) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "post_stream": {"posts": [], "stream": [1, 2, 3]}
        }))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path(format!("/t/{topic_id}.json")))
        .respond_with(template)
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_only_topics_inside_window_are_probed() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    // d = 1h, window = [now - 2h, now - 1h)
    seed_topic(&db, 1, 90).await; // now - 1.5d
    seed_topic(&db, 2, 30).await; // now - 0.5d
    seed_topic(&db, 3, 150).await; // now - 2.5d
    seed_topic(&db, 4, 120).await; // leading edge, inclusive
    seed_topic(&db, 5, 60).await; // trailing edge, exclusive

    mount_probe(&server, 1, 200, 1).await;
    mount_probe(&server, 2, 200, 0).await;
    mount_probe(&server, 3, 200, 0).await;
    mount_probe(&server, 4, 200, 1).await;
    mount_probe(&server, 5, 200, 0).await;

    let report = scanner(&server, &db).scan_at(now(), HOUR).await.expect("scan failed");

    assert_eq!(report.candidates, 2);
    assert_eq!(report.alive, 2);
    assert_eq!(report.tombstoned, 0);
    for id in 1..=5 {
        let topic = get_topic(db.pool(), id).await.unwrap().unwrap();
        assert!(topic.deleted_at.is_none(), "topic {id} must stay alive");
    }
}

#[tokio::test]
async fn test_gone_signals_tombstone_and_nothing_else() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    let not_found = seed_topic(&db, 1, 90).await;
    let forbidden = seed_topic(&db, 2, 91).await;
    let gone = seed_topic(&db, 3, 92).await;
    seed_topic(&db, 4, 93).await;
    seed_topic(&db, 5, 94).await;

    mount_probe(&server, 1, 404, 1).await;
    mount_probe(&server, 2, 403, 1).await;
    mount_probe(&server, 3, 410, 1).await;
    mount_probe(&server, 4, 500, 1).await;
    mount_probe(&server, 5, 200, 1).await;

    let before = Utc::now();
    let report = scanner(&server, &db).scan_at(now(), HOUR).await.expect("scan failed");

    assert_eq!(report.candidates, 5);
    assert_eq!(report.tombstoned, 3);
    assert_eq!(report.alive, 1);
    assert_eq!(report.probe_errors, 1);

    for original in [not_found, forbidden, gone] {
        let stored = get_topic(db.pool(), original.id).await.unwrap().unwrap();
        let deleted_at = stored.deleted_at_utc().expect("tombstone missing");
        assert!(deleted_at >= before - TimeDelta::seconds(1));

        // Everything but the tombstone is untouched
        assert_eq!(
            Topic {
                deleted_at: None,
                ..stored
            },
            original
        );
    }

    assert!(get_topic(db.pool(), 4).await.unwrap().unwrap().deleted_at.is_none());
    assert!(get_topic(db.pool(), 5).await.unwrap().unwrap().deleted_at.is_none());
}

#[tokio::test]
async fn test_tombstoned_topics_are_not_probed_again() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;
    seed_topic(&db, 1, 90).await;
    mount_probe(&server, 1, 404, 1).await;

    let scanner = scanner(&server, &db);
    scanner.scan_at(now(), HOUR).await.expect("first scan failed");
    let first = get_topic(db.pool(), 1).await.unwrap().unwrap().deleted_at;
    assert!(first.is_some());

    // The probe mock expects exactly one call in total
    let report = scanner.scan_at(now(), HOUR).await.expect("second scan failed");
    assert_eq!(report.candidates, 0);
    assert_eq!(get_topic(db.pool(), 1).await.unwrap().unwrap().deleted_at, first);
}

#[tokio::test]
async fn test_unreachable_source_leaves_topics_untouched() {
    let (db, _temp_dir) = setup_db().await;
    seed_topic(&db, 1, 90).await;

    // Nothing listens on the discard port
    let client = ForumClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let scanner = DeletionScanner::new(client, db.clone());

    let report = scanner.scan_at(now(), HOUR).await.expect("scan failed");
    assert_eq!(report.probe_errors, 1);
    assert!(get_topic(db.pool(), 1).await.unwrap().unwrap().deleted_at.is_none());
}

#[tokio::test]
async fn test_zero_duration_is_rejected() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    let err = scanner(&server, &db).scan(Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidWindow(_)));
}

#[tokio::test]
async fn test_store_failure_is_surfaced() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;
    let scanner = scanner(&server, &db);
    db.pool().close().await;

    let err = scanner.scan_at(now(), HOUR).await.unwrap_err();
    assert!(matches!(err, SyncError::Persistence(_)));
}
