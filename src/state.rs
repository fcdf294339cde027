//! Application state: the editing session, prompts, and the optional LLM client.
//!
//! This module owns:
//!   - the `Session` (settings, source text, draft, last rendered HTML, history)
//!   - the prompts struct (from TOML or defaults)
//!   - optional LLM client
//!
//! `Session` methods are pure state transitions. Index-scoped editor actions
//! are no-ops when the index is out of range. `AppState::update` runs one
//! transition under the write lock and persists the result to `SESSION_PATH`.

use std::{
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use eslsheet::domain::{
    ArticleConfig, HistoryItem, LayoutOverrides, Question, ToolkitGroup, WorksheetDraft,
    WorksheetSettings,
};
use eslsheet::render::{render_worksheet_html, RenderOptions};

use crate::config::{load_app_config_from_env, Prompts};
use crate::llm::LlmClient;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub settings: WorksheetSettings,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub draft: Option<WorksheetDraft>,
    #[serde(default)]
    pub rendered_html: Option<String>,
    /// Newest first.
    #[serde(default)]
    pub history: Vec<HistoryItem>,
    /// Id of the history item currently on screen.
    #[serde(default)]
    pub current_history: Option<String>,
}

impl Session {
    fn article_mut(&mut self, index: usize) -> Option<&mut eslsheet::DraftArticle> {
        self.draft.as_mut()?.articles.get_mut(index)
    }

    /// Merge `patch` (camelCase article fields) into article `index`.
    ///
    /// Returns Ok(false) when there is no such article. A patch that would
    /// leave the article ill-typed is rejected and nothing changes.
    pub fn update_article(&mut self, index: usize, patch: &Map<String, Value>) -> Result<bool, serde_json::Error> {
        let Some(article) = self.article_mut(index) else { return Ok(false) };
        let mut merged = match serde_json::to_value(&*article)? {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        for (k, v) in patch {
            merged.insert(k.clone(), v.clone());
        }
        *article = serde_json::from_value(Value::Object(merged))?;
        Ok(true)
    }

    pub fn set_paragraphs(&mut self, index: usize, paragraphs: Vec<String>) -> bool {
        match self.article_mut(index) {
            Some(a) => {
                a.paragraphs = paragraphs;
                true
            }
            None => false,
        }
    }

    pub fn set_toolkit(&mut self, index: usize, toolkit: Vec<ToolkitGroup>) -> bool {
        match self.article_mut(index) {
            Some(a) => {
                a.toolkit = Some(toolkit);
                true
            }
            None => false,
        }
    }

    pub fn set_exercises(&mut self, index: usize, exercises: Vec<Question>) -> bool {
        match self.article_mut(index) {
            Some(a) => {
                a.exercises = Some(exercises);
                true
            }
            None => false,
        }
    }

    /// Copy every set override onto every article. Returns the number touched.
    pub fn apply_layout_to_all(&mut self, layout: &LayoutOverrides) -> usize {
        let Some(draft) = self.draft.as_mut() else { return 0 };
        for a in &mut draft.articles {
            let l = &mut a.layout;
            l.line_height = layout.line_height.or(l.line_height);
            l.font_size = layout.font_size.or(l.font_size);
            l.image_position_y = layout.image_position_y.or(l.image_position_y);
            l.page_padding = layout.page_padding.or(l.page_padding);
            l.paragraph_spacing = layout.paragraph_spacing.or(l.paragraph_spacing);
        }
        draft.articles.len()
    }

    pub fn set_settings(&mut self, settings: WorksheetSettings) {
        self.settings = settings;
    }

    /// Resize the article slots. New slots get default settings.
    pub fn set_article_count(&mut self, count: usize) {
        let count = count.max(1);
        self.settings.article_count = count;
        if self.settings.articles.len() > count {
            self.settings.articles.truncate(count);
        }
        while self.settings.articles.len() < count {
            self.settings.articles.push(ArticleConfig::default());
        }
    }

    pub fn set_draft(&mut self, original_text: Option<String>, draft: Option<WorksheetDraft>) {
        if let Some(t) = original_text {
            self.original_text = t;
        }
        self.draft = draft;
    }

    /// Newest first; the new item becomes current.
    pub fn add_history(&mut self, item: HistoryItem) {
        self.current_history = Some(item.id.clone());
        self.history.insert(0, item);
    }

    pub fn remove_history(&mut self, id: &str) -> bool {
        let before = self.history.len();
        self.history.retain(|h| h.id != id);
        if self.current_history.as_deref() == Some(id) {
            self.current_history = None;
        }
        self.history.len() != before
    }

    /// Returns how many items were removed.
    pub fn remove_history_many(&mut self, ids: &[String]) -> usize {
        let before = self.history.len();
        self.history.retain(|h| !ids.contains(&h.id));
        if let Some(cur) = &self.current_history {
            if ids.contains(cur) {
                self.current_history = None;
            }
        }
        before - self.history.len()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.current_history = None;
    }

    /// Render the current draft, keep the HTML, and record it in history.
    /// None when there is no draft yet.
    pub fn render_current(&mut self, timestamp: u64) -> Option<HistoryItem> {
        let draft = self.draft.as_ref()?;
        let html = render_worksheet_html(draft, &RenderOptions::from_settings(&self.settings));
        let item = HistoryItem::new(html.clone(), self.original_text.clone(), &self.settings, Some(draft), timestamp);
        self.rendered_html = Some(html);
        self.add_history(item.clone());
        Some(item)
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    pub session_path: Option<PathBuf>,
    pub llm: Option<LlmClient>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, restore the session, init the LLM client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();

        let session_path = std::env::var("SESSION_PATH")
            .ok()
            .or(cfg.session_path)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let session = session_path.as_ref().map(load_session).unwrap_or_default();
        info!(target: "eslsheet", history = session.history.len(), has_draft = session.draft.is_some(), persisted = session_path.is_some(), "Session ready");

        let llm = LlmClient::from_env();
        if let Some(c) = &llm {
            info!(target: "eslsheet", base_url = %c.base_url, model = %c.model, "LLM enabled.");
        } else {
            info!(target: "eslsheet", "LLM disabled (no LLM_API_KEY / OPENAI_API_KEY). Generation endpoints return 503.");
        }

        Self::with_parts(session, session_path, llm, cfg.prompts)
    }

    pub fn with_parts(session: Session, session_path: Option<PathBuf>, llm: Option<LlmClient>, prompts: Prompts) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            session_path,
            llm,
            prompts,
        }
    }

    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Run one transition under the write lock, then persist.
    pub async fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut guard = self.session.write().await;
        let out = f(&mut guard);
        self.persist(&guard).await;
        out
    }

    #[instrument(level = "debug", skip_all)]
    async fn persist(&self, session: &Session) {
        let Some(path) = &self.session_path else { return };
        let bytes = match serde_json::to_vec_pretty(session) {
            Ok(b) => b,
            Err(e) => {
                error!(target: "eslsheet", error = %e, "Failed to serialize session");
                return;
            }
        };
        match tokio::fs::write(path, &bytes).await {
            Ok(()) => debug!(target: "eslsheet", path = %path.display(), bytes = bytes.len(), "Session saved"),
            Err(e) => error!(target: "eslsheet", path = %path.display(), error = %e, "Failed to save session"),
        }
    }
}

fn load_session(path: &PathBuf) -> Session {
    match std::fs::read_to_string(path) {
        Ok(s) => match serde_json::from_str::<Session>(&s) {
            Ok(session) => {
                info!(target: "eslsheet", path = %path.display(), "Restored session");
                session
            }
            Err(e) => {
                error!(target: "eslsheet", path = %path.display(), error = %e, "Session file is invalid; starting fresh");
                Session::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Session::default(),
        Err(e) => {
            warn!(target: "eslsheet", path = %path.display(), error = %e, "Failed to read session file; starting fresh");
            Session::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eslsheet::DraftArticle;

    fn session_with(n: usize) -> Session {
        let articles = (0..n)
            .map(|i| DraftArticle {
                title: format!("Article {i}"),
                cefr_level: "A1".into(),
                paragraphs: vec!["One two three.".into()],
                ..Default::default()
            })
            .collect();
        Session {
            draft: Some(WorksheetDraft { articles }),
            ..Default::default()
        }
    }

    #[test]
    fn out_of_range_edits_are_noops() {
        let mut s = session_with(1);
        let before = s.clone();
        assert!(!s.set_paragraphs(3, vec!["x".into()]));
        assert!(!s.set_toolkit(1, vec![]));
        assert!(!s.set_exercises(9, vec![]));
        assert!(!s.update_article(2, &Map::new()).unwrap());
        assert_eq!(s, before);

        let mut empty = Session::default();
        assert!(!empty.set_paragraphs(0, vec![]));
        assert_eq!(empty.apply_layout_to_all(&LayoutOverrides::default()), 0);
    }

    #[test]
    fn patch_merges_into_one_article() {
        let mut s = session_with(2);
        let patch = serde_json::json!({"title": "New", "showToolkitGolden": false, "fontSize": 15.0});
        assert!(s.update_article(1, patch.as_object().unwrap()).unwrap());
        let d = s.draft.as_ref().unwrap();
        assert_eq!(d.articles[1].title, "New");
        assert_eq!(d.articles[1].show_toolkit_golden, Some(false));
        assert_eq!(d.articles[1].layout.font_size, Some(15.0));
        assert_eq!(d.articles[1].paragraphs, vec!["One two three.".to_string()]);
        assert_eq!(d.articles[0].title, "Article 0");
    }

    #[test]
    fn ill_typed_patch_changes_nothing() {
        let mut s = session_with(1);
        let before = s.clone();
        let patch = serde_json::json!({"paragraphs": 5});
        assert!(s.update_article(0, patch.as_object().unwrap()).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn layout_applies_to_every_article() {
        let mut s = session_with(3);
        let layout = LayoutOverrides { line_height: Some(1.8), ..Default::default() };
        assert_eq!(s.apply_layout_to_all(&layout), 3);
        assert!(s.draft.unwrap().articles.iter().all(|a| a.layout.line_height == Some(1.8)));
    }

    #[test]
    fn resize_adds_default_slots_and_truncates() {
        let mut s = Session::default();
        s.set_article_count(3);
        assert_eq!(s.settings.article_count, 3);
        assert_eq!(s.settings.articles.len(), 3);
        assert_eq!(s.settings.articles[2].cefr_level, "A1");
        s.set_article_count(0);
        assert_eq!(s.settings.article_count, 1);
        assert_eq!(s.settings.articles.len(), 1);
    }

    #[test]
    fn history_is_newest_first_and_tracks_current() {
        let mut s = session_with(1);
        let a = s.render_current(1).unwrap();
        let b = s.render_current(2).unwrap();
        assert_eq!(s.history[0].id, b.id);
        assert_eq!(s.history[1].id, a.id);
        assert_eq!(s.current_history.as_deref(), Some(b.id.as_str()));
        assert!(s.rendered_html.as_deref().unwrap().contains("Article 0"));

        assert!(s.remove_history(&b.id));
        assert!(s.current_history.is_none());
        assert!(!s.remove_history("missing"));

        let c = s.render_current(3).unwrap();
        assert_eq!(s.remove_history_many(&[a.id.clone(), "x".into()]), 1);
        assert_eq!(s.current_history.as_deref(), Some(c.id.as_str()));
        s.clear_history();
        assert!(s.history.is_empty() && s.current_history.is_none());
    }

    #[test]
    fn render_without_draft_is_none() {
        let mut s = Session::default();
        assert!(s.render_current(0).is_none());
        assert!(s.history.is_empty());
    }

    #[test]
    fn history_metadata_counts_words() {
        let mut s = session_with(2);
        let item = s.render_current(5).unwrap();
        let meta = item.metadata.unwrap();
        assert_eq!(meta.title.as_deref(), Some("Article 0"));
        assert_eq!(meta.article_summaries.len(), 2);
        assert_eq!(meta.article_summaries[0].word_count, 3);
        assert_eq!(item.timestamp, 5);
    }

    #[tokio::test]
    async fn update_persists_and_reloads() {
        let path = std::env::temp_dir().join(format!("eslsheet-session-{}.json", uuid::Uuid::new_v4()));
        let state = AppState::with_parts(Session::default(), Some(path.clone()), None, Prompts::default());
        state.update(|s| s.set_article_count(2)).await;
        let restored = load_session(&path);
        assert_eq!(restored.settings.article_count, 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_session_file_starts_fresh() {
        let path = std::env::temp_dir().join("eslsheet-does-not-exist.json");
        let session = load_session(&path);
        assert!(session.history.is_empty());
        assert!(session.draft.is_none());
        assert!(session.current_history.is_none());
        assert_eq!(session.settings.article_count, 1);
        assert_eq!(session.settings.articles.len(), 1);
    }
}
