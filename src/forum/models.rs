//! Discourse JSON shapes consumed by the mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, NewPost};

/// A forum category as listed by `/categories.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Background colour, hex without the leading `#`.
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub text_color: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoriesResponse {
    pub category_list: CategoryList,
}

#[derive(Debug, Deserialize)]
pub struct CategoryList {
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// A post as returned by `/posts.json` and `/t/{id}.json`.
///
/// Topic pages omit `topic_title`, `category_id` and usually `raw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePost {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cooked: String,
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub post_number: i64,
    pub topic_id: i64,
    #[serde(default)]
    pub topic_title: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub action_code: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

impl SourcePost {
    /// Storage form of this post, keyed under `topic_id`.
    #[must_use]
    pub fn to_new_post(&self, topic_id: i64) -> NewPost {
        NewPost {
            id: self.id,
            topic_id,
            name: self.name.clone().unwrap_or_default(),
            username: self.username.clone(),
            created_at: format_timestamp(self.created_at),
            cooked: self.cooked.clone(),
            raw: self.raw.clone().unwrap_or_default(),
            post_number: self.post_number,
            hidden: self.hidden,
            action_code: self.action_code.clone().filter(|c| !c.is_empty()),
            category_id: self.category_id.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LatestPostsResponse {
    #[serde(default)]
    pub latest_posts: Vec<SourcePost>,
}

/// One page of `/t/{id}.json`.
#[derive(Debug, Deserialize)]
pub struct TopicResponse {
    pub post_stream: PostStream,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostStream {
    #[serde(default)]
    pub posts: Vec<SourcePost>,
    /// Every post id in the topic, regardless of page.
    #[serde(default)]
    pub stream: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_post_decodes_with_nulls() {
        let json = r#"{
            "latest_posts": [{
                "id": 105,
                "name": null,
                "username": "alice",
                "created_at": "2024-01-01T12:00:00.000Z",
                "cooked": "<p>hi</p>",
                "raw": "hi",
                "post_number": 3,
                "topic_id": 50,
                "topic_title": "Welcome",
                "hidden": false,
                "action_code": null,
                "category_id": 7
            }]
        }"#;

        let res: LatestPostsResponse = serde_json::from_str(json).unwrap();
        let post = &res.latest_posts[0];
        assert_eq!(post.id, 105);
        assert_eq!(post.topic_title.as_deref(), Some("Welcome"));

        let stored = post.to_new_post(50);
        assert_eq!(stored.name, "");
        assert_eq!(stored.created_at, "2024-01-01T12:00:00.000Z");
        assert_eq!(stored.category_id, 7);
        assert_eq!(stored.action_code, None);
    }

    #[test]
    fn test_topic_page_decodes_without_optional_fields() {
        let json = r#"{
            "post_stream": {
                "posts": [{
                    "id": 11,
                    "username": "bob",
                    "created_at": "2024-01-02T00:00:00Z",
                    "cooked": "",
                    "post_number": 2,
                    "topic_id": 9,
                    "action_code": "closed.enabled"
                }],
                "stream": [10, 11, 12]
            }
        }"#;

        let res: TopicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(res.post_stream.stream, vec![10, 11, 12]);

        let stored = res.post_stream.posts[0].to_new_post(9);
        assert_eq!(stored.raw, "");
        assert!(!stored.hidden);
        assert_eq!(stored.action_code.as_deref(), Some("closed.enabled"));
        assert_eq!(stored.category_id, 0);
    }

    #[test]
    fn test_categories_decode() {
        let json = r#"{"category_list": {"categories": [
            {"id": 1, "name": "Support", "color": "0088CC", "text_color": "FFFFFF", "slug": "support"}
        ]}}"#;
        let res: CategoriesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(res.category_list.categories[0].name, "Support");
        assert_eq!(res.category_list.categories[0].color, "0088CC");
    }
}
