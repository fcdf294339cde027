//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - stateless core endpoints under `/api/v1/...`
/// - generation endpoints (503 without an LLM)
/// - session editing and history under `/api/v1/session` and `/api/v1/history`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // Core
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/draft/normalize", post(http::http_post_normalize))
        .route("/api/v1/render", post(http::http_post_render))
        .route("/api/v1/sanitize", post(http::http_post_sanitize))
        .route("/api/v1/article-count", post(http::http_post_article_count))
        // Generation
        .route("/api/v1/draft/generate", post(http::http_post_generate_draft))
        .route("/api/v1/worksheet/generate", post(http::http_post_generate_worksheet))
        // Session
        .route("/api/v1/session", get(http::http_get_session))
        .route("/api/v1/session/settings", put(http::http_put_settings))
        .route("/api/v1/session/article-count", put(http::http_put_article_count))
        .route("/api/v1/session/draft", put(http::http_put_draft))
        .route("/api/v1/session/draft/articles/:index", patch(http::http_patch_article))
        .route("/api/v1/session/draft/articles/:index/paragraphs", put(http::http_put_paragraphs))
        .route("/api/v1/session/draft/articles/:index/toolkit", put(http::http_put_toolkit))
        .route("/api/v1/session/draft/articles/:index/exercises", put(http::http_put_exercises))
        .route("/api/v1/session/layout", put(http::http_put_layout))
        .route("/api/v1/session/render", post(http::http_post_session_render))
        // History
        .route("/api/v1/history", get(http::http_get_history).delete(http::http_delete_history))
        .route("/api/v1/history/delete", post(http::http_post_history_delete))
        .route("/api/v1/history/:id", delete(http::http_delete_history_item))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
