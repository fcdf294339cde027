//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use eslsheet::domain::{WorksheetDraft, WorksheetSettings};

//
// Errors
//

/// Handler failure, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// The LLM call failed or returned unusable output.
    Upstream(String),
    /// No LLM is configured.
    Unavailable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(m) | ApiError::NotFound(m) | ApiError::Upstream(m) => m.clone(),
            ApiError::Unavailable => "LLM is not configured (set LLM_API_KEY or OPENAI_API_KEY)".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorOut { error: self.message() })).into_response()
    }
}

//
// Stateless core endpoints
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub llm: bool,
}

/// Either a draft value or raw model text containing one.
#[derive(Debug, Deserialize)]
pub struct NormalizeIn {
    #[serde(default)]
    pub draft: Option<Value>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub settings: WorksheetSettings,
}

#[derive(Debug, Deserialize)]
pub struct RenderIn {
    pub draft: WorksheetDraft,
    #[serde(default)]
    pub settings: WorksheetSettings,
}

#[derive(Debug, Deserialize)]
pub struct SanitizeIn {
    pub html: String,
    #[serde(default)]
    pub settings: WorksheetSettings,
}

#[derive(Debug, Deserialize)]
pub struct HtmlIn {
    pub html: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HtmlOut {
    pub html: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleCountOut {
    pub count: usize,
}

//
// Generation
//

/// Source text plus optional settings. Without settings the session's are used.
#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub text: String,
    #[serde(default)]
    pub settings: Option<WorksheetSettings>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetOut {
    pub html: String,
    pub history_id: String,
}

//
// Session editing
//

#[derive(Debug, Deserialize)]
pub struct ArticleCountIn {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftIn {
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub draft: Option<WorksheetDraft>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedOut {
    pub updated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LayoutOut {
    pub articles: usize,
}

#[derive(Debug, Deserialize)]
pub struct IdsIn {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemovedOut {
    pub removed: usize,
}
