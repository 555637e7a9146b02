use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{
    CategoriesResponse, Category, LatestPostsResponse, SourcePost, TopicResponse,
};
use crate::constants::{MAX_TOPIC_PAGES, MIRROR_USER_AGENT};
use crate::error::SourceError;

/// HTTP client for the source forum's JSON API.
#[derive(Debug, Clone)]
pub struct ForumClient {
    http: reqwest::Client,
    base_url: String,
}

impl ForumClient {
    /// Build a client for the forum at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(MIRROR_USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status));
        }

        Ok(response.json().await?)
    }

    /// Fetch every category the forum lists.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, status or decode failure.
    pub async fn fetch_categories(&self) -> Result<Vec<Category>, SourceError> {
        let url = format!("{}/categories.json", self.base_url);
        let res: CategoriesResponse = self.get_json(&url).await?;
        Ok(res.category_list.categories)
    }

    /// Fetch the latest-posts snapshot, oldest first.
    ///
    /// The forum's own ordering is not relied on.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, status or decode failure.
    pub async fn fetch_latest_posts(&self) -> Result<Vec<SourcePost>, SourceError> {
        let url = format!("{}/posts.json", self.base_url);
        let res: LatestPostsResponse = self.get_json(&url).await?;

        let mut posts = res.latest_posts;
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(posts)
    }

    /// Fetch one page of a topic.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, status or decode failure.
    pub async fn fetch_topic_page(&self, topic_id: i64, page: u32) -> Result<TopicResponse, SourceError> {
        let url = format!("{}/t/{topic_id}.json?page={page}", self.base_url);
        self.get_json(&url).await
    }

    /// Fetch a topic's whole post stream, page by page.
    ///
    /// Stops once the posts collected cover the topic's id stream. A failed
    /// page ends the walk and whatever was collected so far is returned.
    pub async fn fetch_topic_posts(&self, topic_id: i64) -> Vec<SourcePost> {
        let mut posts = Vec::new();

        for page in 1..=MAX_TOPIC_PAGES {
            let res = match self.fetch_topic_page(topic_id, page).await {
                Ok(res) => res,
                Err(e) => {
                    warn!(topic_id, page, collected = posts.len(), "Topic backfill stopped: {e}");
                    break;
                }
            };

            let stream_len = res.post_stream.stream.len();
            let page_len = res.post_stream.posts.len();
            posts.extend(res.post_stream.posts);
            debug!(topic_id, page, page_len, collected = posts.len(), stream_len, "Fetched topic page");

            if posts.len() >= stream_len {
                break;
            }
            if page_len == 0 {
                warn!(topic_id, page, collected = posts.len(), stream_len, "Topic page was empty before stream was covered");
                break;
            }
        }

        posts
    }

    /// Cheap existence check: fetch a topic's post-id stream.
    ///
    /// # Errors
    ///
    /// [`SourceError::Gone`] if the topic was deleted or hidden, any other
    /// variant for transient failures.
    pub async fn probe_topic(&self, topic_id: i64) -> Result<Vec<i64>, SourceError> {
        let url = format!("{}/t/{topic_id}.json", self.base_url);
        let res: TopicResponse = self.get_json(&url).await?;
        Ok(res.post_stream.stream)
    }
}
