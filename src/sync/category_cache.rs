use std::collections::HashMap;

use tracing::{debug, warn};

use crate::forum::{Category, ForumClient};

/// Category metadata keyed by category id, filled on demand.
///
/// A miss reloads the whole category list. Entries are never evicted or
/// refreshed.
#[derive(Debug, Default)]
pub struct CategoryCache {
    categories: HashMap<i64, Category>,
}

impl CategoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a category, reloading from the forum on a miss.
    ///
    /// Returns [`Category::default`] when the forum does not know the id or
    /// cannot be reached.
    pub async fn resolve(&mut self, client: &ForumClient, id: i64) -> Category {
        if let Some(category) = self.categories.get(&id) {
            return category.clone();
        }

        debug!(category_id = id, "Category cache miss, reloading categories");
        match client.fetch_categories().await {
            Ok(categories) => self.extend(categories),
            Err(e) => warn!(category_id = id, "Failed to load categories: {e}"),
        }

        self.categories.get(&id).cloned().unwrap_or_default()
    }

    fn extend(&mut self, categories: Vec<Category>) {
        for category in categories {
            self.categories.insert(category.id, category);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn categories_body() -> serde_json::Value {
        json!({"category_list": {"categories": [
            {"id": 1, "name": "Support", "color": "0088CC", "text_color": "FFFFFF"},
            {"id": 2, "name": "Bug", "color": "E45735", "text_color": "FFFFFF"}
        ]}})
    }

    fn client(server: &MockServer) -> ForumClient {
        ForumClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_miss_reloads_all_categories_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let mut cache = CategoryCache::new();

        let support = cache.resolve(&client, 1).await;
        assert_eq!(support.name, "Support");
        assert_eq!(cache.len(), 2);

        // Served from memory: the mock expects exactly one request
        let bug = cache.resolve(&client, 2).await;
        assert_eq!(bug.color, "E45735");
    }

    #[tokio::test]
    async fn test_unknown_category_is_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
            .mount(&server)
            .await;

        let client = client(&server);
        let mut cache = CategoryCache::new();

        let missing = cache.resolve(&client, 99).await;
        assert_eq!(missing, Category::default());
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_source_failure_keeps_existing_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client(&server);
        let mut cache = CategoryCache::new();
        assert_eq!(cache.resolve(&client, 1).await.name, "Support");

        // Second reload fails; the miss resolves to default and nothing is lost
        assert_eq!(cache.resolve(&client, 3).await, Category::default());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.resolve(&client, 2).await.name, "Bug");
    }
}
