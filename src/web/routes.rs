use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use super::templates::{self, TopicListView, TopicView};
use super::AppState;
use crate::constants::TOPIC_LIST_LIMIT;
use crate::db::{get_deleted_topics, get_latest_topics, get_posts_for_topic, get_topic};
use crate::duration::parse_duration;
use crate::error::SyncError;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(topic_list))
        .route("/healthz", get(health))
        .route("/feed", get(feed).post(feed))
        .route("/delete/:duration", get(delete_scan).post(delete_scan))
        .route("/:topic_id", get(topic_detail))
}

// ========== Triggers ==========

async fn feed(State(state): State<AppState>) -> Response {
    match state.engine.run_cycle().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => sync_error_response(&e),
    }
}

async fn delete_scan(State(state): State<AppState>, Path(duration): Path<String>) -> Response {
    let d = match parse_duration(&duration) {
        Ok(d) if !d.is_zero() => d,
        Ok(_) => {
            return (StatusCode::BAD_REQUEST, "duration must be positive").into_response();
        }
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.scanner.scan(d).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => sync_error_response(&e),
    }
}

fn sync_error_response(e: &SyncError) -> Response {
    match e {
        SyncError::AlreadyRunning => (StatusCode::CONFLICT, "already running").into_response(),
        SyncError::InvalidWindow(_) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        SyncError::Persistence(_) => {
            tracing::error!("{e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// ========== HTML Routes ==========

async fn topic_list(State(state): State<AppState>) -> Response {
    let deleted = match get_deleted_topics(state.db.pool(), TOPIC_LIST_LIMIT).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to fetch deleted topics: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let latest = match get_latest_topics(state.db.pool(), TOPIC_LIST_LIMIT).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to fetch latest topics: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let view = TopicListView { deleted, latest };
    Html(templates::render_topic_list(&view).into_string()).into_response()
}

async fn topic_detail(State(state): State<AppState>, Path(topic_id): Path<String>) -> Response {
    let Ok(id) = topic_id.parse::<i64>() else {
        return (StatusCode::BAD_REQUEST, "Invalid topic id").into_response();
    };

    let topic = match get_topic(state.db.pool(), id).await {
        Ok(Some(t)) => t,
        Ok(None) => return (StatusCode::NOT_FOUND, "Topic not found").into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch topic: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let posts = match get_posts_for_topic(state.db.pool(), id).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to fetch posts: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let view = TopicView { topic, posts };
    Html(templates::render_topic(&view).into_string()).into_response()
}

async fn health() -> &'static str {
    "ok"
}
