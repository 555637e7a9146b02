use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{NewPost, Post, Topic};

// ========== Topics ==========

/// Get a topic by its forum id.
pub async fn get_topic(pool: &SqlitePool, id: i64) -> Result<Option<Topic>> {
    sqlx::query_as("SELECT * FROM topics WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to fetch topic {id}"))
}

/// Insert or overwrite a topic.
///
/// An existing tombstone is never cleared by an upsert.
pub async fn upsert_topic(pool: &SqlitePool, topic: &Topic) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO topics (id, title, updated_at, deleted_at, category_name, category_color)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            updated_at = excluded.updated_at,
            deleted_at = COALESCE(topics.deleted_at, excluded.deleted_at),
            category_name = excluded.category_name,
            category_color = excluded.category_color
        ",
    )
    .bind(topic.id)
    .bind(&topic.title)
    .bind(&topic.updated_at)
    .bind(&topic.deleted_at)
    .bind(&topic.category_name)
    .bind(&topic.category_color)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to upsert topic {}", topic.id))?;

    Ok(())
}

/// Ids of live topics with `earliest <= updated_at < latest`, oldest first.
pub async fn topic_ids_updated_between(
    pool: &SqlitePool,
    earliest: &str,
    latest: &str,
) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r"
        SELECT id FROM topics
        WHERE updated_at >= ? AND updated_at < ? AND deleted_at IS NULL
        ORDER BY updated_at ASC
        ",
    )
    .bind(earliest)
    .bind(latest)
    .fetch_all(pool)
    .await
    .context("Failed to query topics in update window")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Tombstone a topic, touching nothing but `deleted_at`.
///
/// Returns `false` if the topic is unknown or already tombstoned.
pub async fn mark_topic_deleted(pool: &SqlitePool, id: i64, deleted_at: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE topics SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(deleted_at)
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to mark topic {id} deleted"))?;

    Ok(result.rows_affected() > 0)
}

/// Most recently updated live topics.
pub async fn get_latest_topics(pool: &SqlitePool, limit: i64) -> Result<Vec<Topic>> {
    sqlx::query_as(
        r"
        SELECT * FROM topics
        WHERE deleted_at IS NULL
        ORDER BY updated_at DESC
        LIMIT ?
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch latest topics")
}

/// Most recently tombstoned topics.
pub async fn get_deleted_topics(pool: &SqlitePool, limit: i64) -> Result<Vec<Topic>> {
    sqlx::query_as(
        r"
        SELECT * FROM topics
        WHERE deleted_at IS NOT NULL
        ORDER BY deleted_at DESC
        LIMIT ?
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch deleted topics")
}

// ========== Posts ==========

/// Insert or overwrite a post under its topic.
pub async fn upsert_post(pool: &SqlitePool, post: &NewPost) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO posts (
            id, topic_id, name, username, created_at, cooked, raw,
            post_number, hidden, action_code, category_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(topic_id, id) DO UPDATE SET
            name = excluded.name,
            username = excluded.username,
            created_at = excluded.created_at,
            cooked = excluded.cooked,
            raw = excluded.raw,
            post_number = excluded.post_number,
            hidden = excluded.hidden,
            action_code = excluded.action_code,
            category_id = excluded.category_id
        ",
    )
    .bind(post.id)
    .bind(post.topic_id)
    .bind(&post.name)
    .bind(&post.username)
    .bind(&post.created_at)
    .bind(&post.cooked)
    .bind(&post.raw)
    .bind(post.post_number)
    .bind(post.hidden)
    .bind(&post.action_code)
    .bind(post.category_id)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to upsert post {} in topic {}", post.id, post.topic_id))?;

    Ok(())
}

/// Get a single post.
pub async fn get_post(pool: &SqlitePool, topic_id: i64, id: i64) -> Result<Option<Post>> {
    sqlx::query_as("SELECT * FROM posts WHERE topic_id = ? AND id = ?")
        .bind(topic_id)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to fetch post {id} in topic {topic_id}"))
}

/// All posts of a topic in reading order.
pub async fn get_posts_for_topic(pool: &SqlitePool, topic_id: i64) -> Result<Vec<Post>> {
    sqlx::query_as("SELECT * FROM posts WHERE topic_id = ? ORDER BY post_number ASC, id ASC")
        .bind(topic_id)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to fetch posts for topic {topic_id}"))
}

/// Number of posts stored under a topic.
pub async fn count_posts(pool: &SqlitePool, topic_id: i64) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE topic_id = ?")
        .bind(topic_id)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to count posts for topic {topic_id}"))?;

    Ok(row.0)
}

// ========== Sync state ==========

/// Read a persisted counter.
pub async fn get_sync_value(pool: &SqlitePool, key: &str) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM sync_state WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to read sync state '{key}'"))?;

    Ok(row.map(|(v,)| v))
}

/// Raise a persisted counter. A smaller value than the stored one is ignored.
pub async fn raise_sync_value(pool: &SqlitePool, key: &str, value: i64) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO sync_state (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = MAX(sync_state.value, excluded.value)
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to write sync state '{key}'"))?;

    Ok(())
}
