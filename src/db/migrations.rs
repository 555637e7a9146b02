use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        debug!("Running migration v2");
        run_migration_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: creating topics and posts");

    // Topics are keyed by the forum's own topic id
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS topics (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            category_name TEXT NOT NULL DEFAULT '',
            category_color TEXT NOT NULL DEFAULT ''
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create topics table")?;

    // Posts live under their topic
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER NOT NULL,
            topic_id INTEGER NOT NULL REFERENCES topics(id),
            name TEXT NOT NULL DEFAULT '',
            username TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            cooked TEXT NOT NULL DEFAULT '',
            raw TEXT NOT NULL DEFAULT '',
            post_number INTEGER NOT NULL DEFAULT 0,
            hidden INTEGER NOT NULL DEFAULT 0,
            action_code TEXT,
            category_id INTEGER NOT NULL DEFAULT 0,
            deleted_at TEXT,
            PRIMARY KEY (topic_id, id)
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create posts table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_topics_updated_at ON topics(updated_at)")
        .execute(pool)
        .await
        .context("Failed to create topics updated_at index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_topics_deleted_at ON topics(deleted_at)")
        .execute(pool)
        .await
        .context("Failed to create topics deleted_at index")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_posts_topic_number ON posts(topic_id, post_number)",
    )
    .execute(pool)
    .await
    .context("Failed to create posts ordering index")?;

    Ok(())
}

async fn run_migration_v2(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v2: adding sync_state table");

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create sync_state table")?;

    Ok(())
}
