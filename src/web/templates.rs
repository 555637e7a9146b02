//! HTML pages for browsing the mirror.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::db::{Post, Topic};

/// Index page: recently tombstoned and recently updated topics.
#[derive(Debug, Clone)]
pub struct TopicListView {
    pub deleted: Vec<Topic>,
    pub latest: Vec<Topic>,
}

/// A single topic with its posts in reading order.
#[derive(Debug, Clone)]
pub struct TopicView {
    pub topic: Topic,
    pub posts: Vec<Post>,
}

const PAGE_STYLE: &str = r"
img.emoji { width: 1.25em; height: 1.25em; }
blockquote, html, body, p { font-size: 16px; }
.category-badge { color: #fff; padding: 0.1em 0.5em; border-radius: 3px; font-size: 0.8em; }
.deleted-label { background-color: #dc3545; color: #fff; padding: 0.1em 0.4em; border-radius: 3px; }
.action-label { background-color: #ffc107; padding: 0.1em 0.4em; border-radius: 3px; }
";

/// Keep only hex digits so a colour from the forum cannot break out of the
/// style attribute.
fn css_color(color: &str) -> String {
    color.chars().filter(char::is_ascii_hexdigit).take(6).collect()
}

fn layout(title: &str, content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Forum Mirror" }
                link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css";
                style { (PreEscaped(PAGE_STYLE)) }
            }
            body {
                main class="container" {
                    (content)
                }
            }
        }
    }
}

fn category_badge(name: &str, color: &str) -> Markup {
    html! {
        @if !name.is_empty() {
            span class="category-badge" style=(format!("background-color: #{};", css_color(color))) {
                (name)
            }
        }
    }
}

fn topic_list(topics: &[Topic]) -> Markup {
    html! {
        @if topics.is_empty() {
            p { em { "None yet." } }
        } @else {
            ul {
                @for topic in topics {
                    li {
                        a href=(format!("/{}", topic.id)) { (topic.title) }
                        " "
                        (category_badge(&topic.category_name, &topic.category_color))
                        @if let Some(deleted_at) = &topic.deleted_at {
                            " "
                            span class="deleted-label" { "Deleted at " (deleted_at) }
                        }
                    }
                }
            }
        }
    }
}

#[must_use]
pub fn render_topic_list(view: &TopicListView) -> Markup {
    let content = html! {
        h1 { "Forum Mirror" }
        h2 { "Latest Deleted Topics" }
        (topic_list(&view.deleted))
        h2 { "Latest Topics" }
        (topic_list(&view.latest))
    };
    layout("Topics", &content)
}

#[must_use]
pub fn render_topic(view: &TopicView) -> Markup {
    let topic = &view.topic;
    let content = html! {
        h3 { a href="/" { "Topics" } }
        hr;
        h1 { (topic.title) " " small { "(" (topic.id) ")" } }
        (category_badge(&topic.category_name, &topic.category_color))
        @for post in &view.posts {
            hr;
            article id=(format!("post-{}", post.id)) {
                h3 {
                    small { "#" (post.post_number) } " @" (post.username) " " small { (post.name) }
                }
                p {
                    small { (post.created_at) " (" (post.id) ")" }
                    @if post.hidden {
                        " " span class="action-label" { "Hidden" }
                    }
                    @if let Some(deleted_at) = &post.deleted_at {
                        " " span class="deleted-label" { "Deleted at " (deleted_at) }
                    }
                }
                // Cooked HTML is rendered by the forum itself
                (PreEscaped(&post.cooked))
                @if let Some(action) = &post.action_code {
                    p { span class="action-label" { (action) } }
                }
            }
        }
        hr;
        @if let Some(deleted_at) = &topic.deleted_at {
            p class="deleted-label" { "Topic deleted at " (deleted_at) "." }
        }
    };
    layout(&topic.title, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: i64, title: &str) -> Topic {
        Topic {
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
            category_name: "Support".to_string(),
            category_color: "0088CC".to_string(),
            ..Topic::new(id, title)
        }
    }

    #[test]
    fn test_css_color_strips_non_hex() {
        assert_eq!(css_color("0088CC"), "0088CC");
        assert_eq!(css_color("red; background: url(x)"), "edbacd");
    }

    #[test]
    fn test_topic_list_shows_tombstone() {
        let mut gone = topic(2, "Gone <b>topic</b>");
        gone.deleted_at = Some("2024-02-01T00:00:00.000Z".to_string());
        let view = TopicListView {
            deleted: vec![gone],
            latest: vec![topic(1, "Alive")],
        };

        let html = render_topic_list(&view).into_string();
        assert!(html.contains(r#"href="/1""#));
        assert!(html.contains("Deleted at 2024-02-01T00:00:00.000Z"));
        // Titles are escaped
        assert!(html.contains("Gone &lt;b&gt;topic&lt;/b&gt;"));
        assert!(html.contains("background-color: #0088CC;"));
    }

    #[test]
    fn test_topic_page_renders_posts_in_given_order() {
        let post = |id: i64, number: i64| Post {
            id,
            topic_id: 1,
            name: "Alice".to_string(),
            username: "alice".to_string(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            cooked: format!("<p>body {id}</p>"),
            raw: String::new(),
            post_number: number,
            hidden: false,
            action_code: (number == 2).then(|| "closed.enabled".to_string()),
            category_id: 1,
            deleted_at: None,
        };
        let view = TopicView {
            topic: topic(1, "Hello"),
            posts: vec![post(10, 1), post(11, 2)],
        };

        let html = render_topic(&view).into_string();
        let first = html.find("<p>body 10</p>").unwrap();
        let second = html.find("<p>body 11</p>").unwrap();
        assert!(first < second);
        assert!(html.contains("closed.enabled"));
        assert!(!html.contains("Topic deleted at"));
    }
}
