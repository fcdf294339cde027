//! Minimal OpenAI-compatible client for worksheet generation.
//!
//! We only call chat.completions and request plain text. Calls are
//! instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use eslsheet::domain::{WorksheetDraft, WorksheetSettings};
use eslsheet::normalize::{draft_from_model_output, NormalizeOptions};
use eslsheet::sanitize::{sanitize_generated_html, SanitizeOptions};
use eslsheet::util::strip_code_fences;

use crate::config::Prompts;
use crate::prompts::{draft_user_prompt, html_system_prompt, html_user_prompt};

const DRAFT_TEMPERATURE: f32 = 0.3;
const DRAFT_MAX_TOKENS: u32 = 8000;
const HTML_TEMPERATURE: f32 = 0.7;
const HTML_MAX_TOKENS: u32 = 4000;

#[derive(Clone)]
pub struct LlmClient {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl LlmClient {
  /// Construct the client if we find LLM_API_KEY (or OPENAI_API_KEY); otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("LLM_API_KEY")
      .or_else(|_| std::env::var("OPENAI_API_KEY"))
      .ok()
      .filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("LLM_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(180))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  /// Plain-text chat completion. Empty content is an error.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  async fn chat_plain(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
    max_tokens: u32,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      max_tokens: Some(max_tokens),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "eslsheet-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_provider_error(&body).unwrap_or(body);
      return Err(format!("LLM HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(target: "eslsheet", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "LLM usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    if text.is_empty() {
      return Err("No content generated".into());
    }
    Ok(text)
  }

  /// Structured path: ask for a JSON draft, then parse and normalize it.
  #[instrument(level = "info", skip_all, fields(text_len = text.len(), articles = settings.effective_article_count()))]
  pub async fn generate_draft(
    &self,
    prompts: &Prompts,
    text: &str,
    settings: &WorksheetSettings,
  ) -> Result<WorksheetDraft, String> {
    let user = draft_user_prompt(text, settings);
    let start = Instant::now();
    let raw = self.chat_plain(&prompts.draft_system, &user, DRAFT_TEMPERATURE, DRAFT_MAX_TOKENS).await;
    let elapsed = start.elapsed();

    let raw = match raw {
      Ok(r) => {
        info!(target: "eslsheet", ?elapsed, response_len = r.len(), "Draft response received");
        r
      }
      Err(e) => {
        error!(target: "eslsheet", ?elapsed, error = %e, "Model call failed during draft generation");
        return Err(e);
      }
    };

    let draft = draft_from_model_output(&raw, &NormalizeOptions::from_settings(settings)).map_err(|e| {
      error!(target: "eslsheet", error = %e, "Draft output could not be parsed");
      e.to_string()
    })?;
    info!(target: "eslsheet", articles = draft.articles.len(), "Draft generated");
    Ok(draft)
  }

  /// Legacy path: ask for a whole HTML document, then sanitize it.
  #[instrument(level = "info", skip_all, fields(text_len = text.len(), articles = settings.effective_article_count()))]
  pub async fn generate_html(
    &self,
    prompts: &Prompts,
    text: &str,
    settings: &WorksheetSettings,
  ) -> Result<String, String> {
    let system = html_system_prompt(prompts);
    let user = html_user_prompt(text, settings);
    let start = Instant::now();
    let raw = self.chat_plain(&system, &user, HTML_TEMPERATURE, HTML_MAX_TOKENS).await;
    let elapsed = start.elapsed();

    let raw = match raw {
      Ok(r) => r,
      Err(e) => {
        error!(target: "eslsheet", ?elapsed, error = %e, "Model call failed during HTML generation");
        return Err(e);
      }
    };
    let html = sanitize_generated_html(strip_code_fences(&raw), &SanitizeOptions::from_settings(settings));
    info!(target: "eslsheet", ?elapsed, raw_len = raw.len(), html_len = html.len(), "Worksheet HTML generated");
    Ok(html)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Pull `error.message` out of an OpenAI-style error body.
fn extract_provider_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
