use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::category_cache::CategoryCache;
use crate::constants::WATERMARK_KEY;
use crate::db::{self, format_timestamp, Database, Topic};
use crate::error::SyncError;
use crate::forum::{ForumClient, SourcePost};

/// Mutable engine state. Only reachable through the engine's lock, so
/// holding the guard is what makes a cycle the single writer.
#[derive(Debug, Default)]
struct EngineState {
    /// Highest post id fully ingested. `None` until loaded from the store.
    watermark: Option<i64>,
    categories: CategoryCache,
}

/// Outcome of one ingestion cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Posts in the latest-posts snapshot.
    pub fetched: usize,
    /// Posts at or below the watermark.
    pub skipped: usize,
    pub new_topics: usize,
    pub posts_saved: usize,
    /// Watermark after the cycle.
    pub watermark: i64,
}

/// Incremental ingestion of the forum's latest posts.
#[derive(Debug)]
pub struct SyncEngine {
    client: ForumClient,
    db: Database,
    state: Mutex<EngineState>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(client: ForumClient, db: Database) -> Self {
        Self {
            client,
            db,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Current in-memory watermark, if a cycle has loaded it.
    ///
    /// Returns `None` while a cycle is running.
    pub fn watermark(&self) -> Option<i64> {
        self.state.try_lock().ok().and_then(|s| s.watermark)
    }

    /// Run one ingestion cycle.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadyRunning`] if another cycle holds the engine;
    /// [`SyncError::Persistence`] if the store fails, in which case the
    /// watermark is left where it was.
    pub async fn run_cycle(&self) -> Result<SyncReport, SyncError> {
        let Ok(mut state) = self.state.try_lock() else {
            debug!("Ingestion cycle rejected, another is in flight");
            return Err(SyncError::AlreadyRunning);
        };

        let watermark = match state.watermark {
            Some(w) => w,
            None => {
                let stored = db::get_sync_value(self.db.pool(), WATERMARK_KEY)
                    .await
                    .map_err(SyncError::Persistence)?
                    .unwrap_or(0);
                info!(watermark = stored, "Loaded watermark");
                state.watermark = Some(stored);
                stored
            }
        };

        let posts = match self.client.fetch_latest_posts().await {
            Ok(posts) => posts,
            Err(e) => {
                warn!("Failed to fetch latest posts: {e}");
                Vec::new()
            }
        };

        let mut report = SyncReport {
            fetched: posts.len(),
            watermark,
            ..SyncReport::default()
        };
        let mut max_post = watermark;

        for post in &posts {
            if post.id <= watermark {
                report.skipped += 1;
                continue;
            }
            max_post = max_post.max(post.id);

            self.ingest_post(&mut state.categories, post, &mut report)
                .await?;
        }

        if max_post > watermark {
            db::raise_sync_value(self.db.pool(), WATERMARK_KEY, max_post)
                .await
                .map_err(SyncError::Persistence)?;
            state.watermark = Some(max_post);
            report.watermark = max_post;
            info!(watermark = max_post, "New max post id");
        }

        Ok(report)
    }

    async fn ingest_post(
        &self,
        categories: &mut CategoryCache,
        post: &SourcePost,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let pool = self.db.pool();

        let existing = db::get_topic(pool, post.topic_id)
            .await
            .map_err(SyncError::Persistence)?;
        let is_new = existing.is_none();
        let mut topic = existing.unwrap_or_else(|| {
            Topic::new(post.topic_id, post.topic_title.clone().unwrap_or_default())
        });

        topic.updated_at = format_timestamp(post.created_at);
        if !topic.has_category() {
            let category = categories
                .resolve(&self.client, post.category_id.unwrap_or_default())
                .await;
            topic.category_name = category.name;
            topic.category_color = category.color;
        }

        db::upsert_topic(pool, &topic)
            .await
            .map_err(SyncError::Persistence)?;

        if is_new {
            info!(topic_id = topic.id, title = %topic.title, "New topic, backfilling");
            report.new_topics += 1;

            let backfill = self.client.fetch_topic_posts(topic.id).await;
            for p in &backfill {
                self.save_post(topic.id, p).await?;
                report.posts_saved += 1;
                debug!(topic_id = topic.id, post_id = p.id, "Saved post in new topic");
            }

            // A short backfill must not lose the post that revealed the topic
            if !backfill.iter().any(|p| p.id == post.id) {
                self.save_post(topic.id, post).await?;
                report.posts_saved += 1;
                debug!(topic_id = topic.id, post_id = post.id, "Saved triggering post missing from backfill");
            }
        } else {
            self.save_post(topic.id, post).await?;
            report.posts_saved += 1;
            debug!(topic_id = topic.id, post_id = post.id, "Saved post in existing topic");
        }

        Ok(())
    }

    async fn save_post(&self, topic_id: i64, post: &SourcePost) -> Result<(), SyncError> {
        db::upsert_post(self.db.pool(), &post.to_new_post(topic_id))
            .await
            .map_err(SyncError::Persistence)
    }
}
