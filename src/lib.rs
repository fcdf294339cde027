//! Leveled ESL worksheet core.
//!
//! Turns a structured draft (articles, vocabulary, grammar points, golden
//! sentences, exercises) into a self-contained printable HTML document with
//! an embedded pagination script, and post-processes model-written HTML so it
//! respects the same article-count, level and visibility constraints.
//!
//! Everything here is synchronous and pure: inputs in, values out. Session
//! state and network calls live in the `eslsheet-backend` binary.

pub mod domain;
pub mod error;
pub mod normalize;
pub mod pagination;
pub mod render;
pub mod sanitize;
pub mod seeds;
pub mod util;

pub use domain::{DraftArticle, WorksheetDraft, WorksheetSettings};
pub use error::DraftError;
pub use normalize::{normalize_draft, parse_draft_text, NormalizeOptions};
pub use render::{render_worksheet_html, RenderOptions};
pub use sanitize::{detect_article_count, sanitize_generated_html, SanitizeOptions};
