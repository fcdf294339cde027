//! HTTP endpoint handlers. These are thin wrappers that forward to the worksheet
//! core or to `Session` transitions. Each handler is instrumented with sizes
//! and indexes, never payloads.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use eslsheet::domain::{HistoryItem, LayoutOverrides, Question, ToolkitGroup, WorksheetDraft, WorksheetSettings};
use eslsheet::normalize::{normalize_draft, parse_draft_text, NormalizeOptions};
use eslsheet::render::{render_worksheet_html, RenderOptions};
use eslsheet::sanitize::{detect_article_count, sanitize_generated_html, SanitizeOptions};

use crate::protocol::*;
use crate::state::{now_millis, AppState, Session};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> Json<HealthOut> {
  Json(HealthOut { ok: true, llm: state.llm.is_some() })
}

//
// Core
//

#[instrument(level = "info", skip(body), fields(has_draft = body.draft.is_some(), text_len = body.text.as_ref().map(|t| t.len())))]
pub async fn http_post_normalize(Json(body): Json<NormalizeIn>) -> ApiResult<WorksheetDraft> {
  let opts = NormalizeOptions::from_settings(&body.settings);
  let raw = match (body.draft, body.text) {
    (Some(v), _) if v.is_object() => v,
    (Some(_), _) => return Err(ApiError::BadRequest("`draft` must be a JSON object".into())),
    (None, Some(text)) => parse_draft_text(&text).map_err(|e| ApiError::BadRequest(e.to_string()))?,
    (None, None) => return Err(ApiError::BadRequest("either `draft` or `text` is required".into())),
  };
  Ok(Json(normalize_draft(&raw, &opts)))
}

#[instrument(level = "info", skip(body), fields(articles = body.draft.articles.len()))]
pub async fn http_post_render(Json(body): Json<RenderIn>) -> Json<HtmlOut> {
  let html = render_worksheet_html(&body.draft, &RenderOptions::from_settings(&body.settings));
  Json(HtmlOut { html })
}

#[instrument(level = "info", skip(body), fields(html_len = body.html.len()))]
pub async fn http_post_sanitize(Json(body): Json<SanitizeIn>) -> Json<HtmlOut> {
  let html = sanitize_generated_html(&body.html, &SanitizeOptions::from_settings(&body.settings));
  Json(HtmlOut { html })
}

#[instrument(level = "info", skip(body), fields(html_len = body.html.len()))]
pub async fn http_post_article_count(Json(body): Json<HtmlIn>) -> Json<ArticleCountOut> {
  Json(ArticleCountOut { count: detect_article_count(&body.html) })
}

//
// Generation
//

async fn generation_settings(state: &AppState, body: &GenerateIn) -> Result<WorksheetSettings, ApiError> {
  if body.text.trim().is_empty() {
    return Err(ApiError::BadRequest("`text` must not be empty".into()));
  }
  if state.llm.is_none() {
    return Err(ApiError::Unavailable);
  }
  Ok(match &body.settings {
    Some(s) => s.clone(),
    None => state.session.read().await.settings.clone(),
  })
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_generate_draft(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> ApiResult<WorksheetDraft> {
  let settings = generation_settings(&state, &body).await?;
  let llm = state.llm.as_ref().ok_or(ApiError::Unavailable)?;
  let draft = llm
    .generate_draft(&state.prompts, &body.text, &settings)
    .await
    .map_err(ApiError::Upstream)?;

  let stored = draft.clone();
  state
    .update(move |s| {
      s.set_settings(settings);
      s.set_draft(Some(body.text), Some(stored));
    })
    .await;
  info!(target: "eslsheet", articles = draft.articles.len(), "HTTP draft generated");
  Ok(Json(draft))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_generate_worksheet(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> ApiResult<WorksheetOut> {
  let settings = generation_settings(&state, &body).await?;
  let llm = state.llm.as_ref().ok_or(ApiError::Unavailable)?;
  let html = llm
    .generate_html(&state.prompts, &body.text, &settings)
    .await
    .map_err(ApiError::Upstream)?;

  let item = HistoryItem::new(html.clone(), body.text.clone(), &settings, None, now_millis());
  let history_id = item.id.clone();
  state
    .update(move |s| {
      s.set_settings(settings);
      s.original_text = body.text;
      s.rendered_html = Some(item.html_content.clone());
      s.add_history(item);
    })
    .await;
  info!(target: "eslsheet", %history_id, html_len = html.len(), "HTTP worksheet generated");
  Ok(Json(WorksheetOut { html, history_id }))
}

//
// Session
//

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(State(state): State<Arc<AppState>>) -> Json<Session> {
  Json(state.snapshot().await)
}

#[instrument(level = "info", skip(state, settings), fields(article_count = settings.article_count))]
pub async fn http_put_settings(
  State(state): State<Arc<AppState>>,
  Json(settings): Json<WorksheetSettings>,
) -> Json<WorksheetSettings> {
  let out = state
    .update(move |s| {
      s.set_settings(settings);
      s.settings.clone()
    })
    .await;
  Json(out)
}

#[instrument(level = "info", skip(state, body), fields(count = body.count))]
pub async fn http_put_article_count(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ArticleCountIn>,
) -> Json<WorksheetSettings> {
  let out = state
    .update(move |s| {
      s.set_article_count(body.count);
      s.settings.clone()
    })
    .await;
  Json(out)
}

#[instrument(level = "info", skip(state, body), fields(has_draft = body.draft.is_some()))]
pub async fn http_put_draft(
  State(state): State<Arc<AppState>>,
  Json(body): Json<DraftIn>,
) -> Json<UpdatedOut> {
  state.update(move |s| s.set_draft(body.original_text, body.draft)).await;
  Json(UpdatedOut { updated: true })
}

fn log_noop(updated: bool, index: usize) {
  if !updated {
    warn!(target: "eslsheet", index, "Article index out of range; nothing changed");
  }
}

#[instrument(level = "info", skip(state, patch), fields(keys = patch.len()))]
pub async fn http_patch_article(
  State(state): State<Arc<AppState>>,
  Path(index): Path<usize>,
  Json(patch): Json<Map<String, Value>>,
) -> ApiResult<UpdatedOut> {
  let updated = state
    .update(|s| s.update_article(index, &patch))
    .await
    .map_err(|e| ApiError::BadRequest(format!("invalid article patch: {e}")))?;
  log_noop(updated, index);
  Ok(Json(UpdatedOut { updated }))
}

#[instrument(level = "info", skip(state, paragraphs), fields(count = paragraphs.len()))]
pub async fn http_put_paragraphs(
  State(state): State<Arc<AppState>>,
  Path(index): Path<usize>,
  Json(paragraphs): Json<Vec<String>>,
) -> Json<UpdatedOut> {
  let updated = state.update(move |s| s.set_paragraphs(index, paragraphs)).await;
  log_noop(updated, index);
  Json(UpdatedOut { updated })
}

#[instrument(level = "info", skip(state, toolkit), fields(groups = toolkit.len()))]
pub async fn http_put_toolkit(
  State(state): State<Arc<AppState>>,
  Path(index): Path<usize>,
  Json(toolkit): Json<Vec<ToolkitGroup>>,
) -> Json<UpdatedOut> {
  let updated = state.update(move |s| s.set_toolkit(index, toolkit)).await;
  log_noop(updated, index);
  Json(UpdatedOut { updated })
}

#[instrument(level = "info", skip(state, exercises), fields(count = exercises.len()))]
pub async fn http_put_exercises(
  State(state): State<Arc<AppState>>,
  Path(index): Path<usize>,
  Json(exercises): Json<Vec<Question>>,
) -> Json<UpdatedOut> {
  let updated = state.update(move |s| s.set_exercises(index, exercises)).await;
  log_noop(updated, index);
  Json(UpdatedOut { updated })
}

#[instrument(level = "info", skip(state, layout))]
pub async fn http_put_layout(
  State(state): State<Arc<AppState>>,
  Json(layout): Json<LayoutOverrides>,
) -> Json<LayoutOut> {
  let articles = state.update(|s| s.apply_layout_to_all(&layout)).await;
  Json(LayoutOut { articles })
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_session_render(State(state): State<Arc<AppState>>) -> ApiResult<HistoryItem> {
  let item = state
    .update(|s| s.render_current(now_millis()))
    .await
    .ok_or_else(|| ApiError::BadRequest("no draft to render".into()))?;
  info!(target: "eslsheet", id = %item.id, html_len = item.html_content.len(), "HTTP session rendered");
  Ok(Json(item))
}

//
// History
//

#[instrument(level = "info", skip(state))]
pub async fn http_get_history(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryItem>> {
  Json(state.session.read().await.history.clone())
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_history(State(state): State<Arc<AppState>>) -> StatusCode {
  state.update(|s| s.clear_history()).await;
  StatusCode::NO_CONTENT
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_history_item(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  if state.update(|s| s.remove_history(&id)).await {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("history item {id} not found")))
  }
}

#[instrument(level = "info", skip(state, body), fields(ids = body.ids.len()))]
pub async fn http_post_history_delete(
  State(state): State<Arc<AppState>>,
  Json(body): Json<IdsIn>,
) -> Json<RemovedOut> {
  let removed = state.update(|s| s.remove_history_many(&body.ids)).await;
  Json(RemovedOut { removed })
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{
    body::{to_bytes, Body},
    http::Request,
    Router,
  };
  use serde_json::json;
  use tower::ServiceExt;

  use crate::config::Prompts;
  use crate::routes::build_router;

  fn app() -> Router {
    build_router(Arc::new(AppState::with_parts(Session::default(), None, None, Prompts::default())))
  }

  async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        req = req.header("content-type", "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
  }

  fn sample_draft() -> Value {
    json!({"articles": [
      {"title": "Snow Days", "cefrLevel": "A2", "paragraphs": ["It snowed all night."]},
      {"title": "Rivers", "cefrLevel": "B1", "paragraphs": ["Rivers run to the sea."]}
    ]})
  }

  #[tokio::test]
  async fn health_reports_llm_absent() {
    let (status, v) = call(&app(), "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!({"ok": true, "llm": false}));
  }

  #[tokio::test]
  async fn normalize_accepts_model_text() {
    let text = "Here you go:\n```json\n{\"articles\":[{\"title\":\"Snow\",\"paragraphs\":[\" a \",\"\"]}]}\n```";
    let (status, v) = call(
      &app(),
      "POST",
      "/api/v1/draft/normalize",
      Some(json!({"text": text, "settings": {"articleCount": 2, "showExercises": false}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let articles = v["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0]["paragraphs"], json!(["a"]));
    assert_eq!(articles[1]["title"], "Untitled");
    assert!(articles[0].get("exercises").is_none());
  }

  #[tokio::test]
  async fn normalize_rejects_missing_or_invalid_input() {
    let app = app();
    let (status, v) = call(&app, "POST", "/api/v1/draft/normalize", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("required"));

    let (status, v) = call(&app, "POST", "/api/v1/draft/normalize", Some(json!({"text": "no json here"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Invalid JSON draft output");

    let (status, v) = call(&app, "POST", "/api/v1/draft/normalize", Some(json!({"draft": [1]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("JSON object"));
  }

  #[tokio::test]
  async fn render_then_count_articles() {
    let app = app();
    let (status, v) = call(&app, "POST", "/api/v1/render", Some(json!({"draft": sample_draft()}))).await;
    assert_eq!(status, StatusCode::OK);
    let html = v["html"].as_str().unwrap().to_string();
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains("Snow Days"));

    let (_, v) = call(&app, "POST", "/api/v1/article-count", Some(json!({"html": html}))).await;
    assert_eq!(v["count"], 2);
  }

  #[tokio::test]
  async fn sanitize_drops_extra_articles() {
    let html = concat!(
      "<html><body>",
      "<section class=\"article\" data-article-index=\"0\"><div class=\"page\" data-article-index=\"0\"><p>one</p></div></section>",
      "<section class=\"article\" data-article-index=\"1\"><div class=\"page\" data-article-index=\"1\"><p>two</p></div></section>",
      "</body></html>"
    );
    let (status, v) = call(
      &app(),
      "POST",
      "/api/v1/sanitize",
      Some(json!({"html": html, "settings": {"articleCount": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let out = v["html"].as_str().unwrap();
    assert!(out.contains("one"));
    assert!(!out.contains("two"));
  }

  #[tokio::test]
  async fn generation_needs_text_and_llm() {
    let app = app();
    let (status, _) = call(&app, "POST", "/api/v1/draft/generate", Some(json!({"text": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, v) = call(&app, "POST", "/api/v1/draft/generate", Some(json!({"text": "A story."}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(v["error"].as_str().unwrap().contains("LLM"));

    let (status, _) = call(&app, "POST", "/api/v1/worksheet/generate", Some(json!({"text": "A story."}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  }

  #[tokio::test]
  async fn session_edit_render_and_history() {
    let app = app();

    let (status, _) = call(&app, "POST", "/api/v1/session/render", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
      &app,
      "PUT",
      "/api/v1/session/draft",
      Some(json!({"originalText": "source", "draft": sample_draft()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, v) = call(&app, "PATCH", "/api/v1/session/draft/articles/1", Some(json!({"title": "Big Rivers"}))).await;
    assert_eq!(v["updated"], true);
    let (_, v) = call(&app, "PATCH", "/api/v1/session/draft/articles/7", Some(json!({"title": "x"}))).await;
    assert_eq!(v["updated"], false);
    let (status, _) = call(&app, "PATCH", "/api/v1/session/draft/articles/0", Some(json!({"paragraphs": 3}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, v) = call(&app, "PUT", "/api/v1/session/draft/articles/0/paragraphs", Some(json!(["Fresh snow."]))).await;
    assert_eq!(v["updated"], true);
    let (_, v) = call(&app, "PUT", "/api/v1/session/layout", Some(json!({"fontSize": 16.0}))).await;
    assert_eq!(v["articles"], 2);

    let (status, item) = call(&app, "POST", "/api/v1/session/render", None).await;
    assert_eq!(status, StatusCode::OK);
    let html = item["htmlContent"].as_str().unwrap();
    assert!(html.contains("Big Rivers") && html.contains("Fresh snow."));
    assert_eq!(item["originalText"], "source");
    let id = item["id"].as_str().unwrap().to_string();

    let (_, session) = call(&app, "GET", "/api/v1/session", None).await;
    assert_eq!(session["currentHistory"], id.as_str());
    assert_eq!(session["draft"]["articles"][0]["fontSize"], 16.0);

    let (status, _) = call(&app, "DELETE", &format!("/api/v1/history/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, v) = call(&app, "DELETE", &format!("/api/v1/history/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(v["error"].as_str().unwrap().contains("not found"));
  }

  #[tokio::test]
  async fn bulk_delete_and_clear_history() {
    let app = app();
    call(&app, "PUT", "/api/v1/session/draft", Some(json!({"draft": sample_draft()}))).await;
    let mut ids = Vec::new();
    for _ in 0..3 {
      let (_, item) = call(&app, "POST", "/api/v1/session/render", None).await;
      ids.push(item["id"].as_str().unwrap().to_string());
    }
    let (_, v) = call(&app, "POST", "/api/v1/history/delete", Some(json!({"ids": [ids[0], ids[1], "nope"]}))).await;
    assert_eq!(v["removed"], 2);
    let (_, v) = call(&app, "GET", "/api/v1/history", None).await;
    assert_eq!(v.as_array().unwrap().len(), 1);

    let (status, _) = call(&app, "DELETE", "/api/v1/history", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, v) = call(&app, "GET", "/api/v1/history", None).await;
    assert_eq!(v, json!([]));
  }

  #[tokio::test]
  async fn settings_and_article_count() {
    let app = app();
    let (_, v) = call(&app, "PUT", "/api/v1/session/article-count", Some(json!({"count": 3}))).await;
    assert_eq!(v["articleCount"], 3);
    assert_eq!(v["articles"].as_array().unwrap().len(), 3);

    let (_, v) = call(
      &app,
      "PUT",
      "/api/v1/session/settings",
      Some(json!({"articleCount": 1, "paperSize": "a3", "orientation": "landscape"})),
    )
    .await;
    assert_eq!(v["paperSize"], "a3");
    assert_eq!(v["showExercises"], true);
  }
}
