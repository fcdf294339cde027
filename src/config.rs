//! Loading service configuration (prompt overrides + session file) from TOML.
//!
//! Example:
//!
//! ```toml
//! session_path = "./data/session.json"
//!
//! [prompts]
//! draft_system = "You generate structured worksheet content as JSON only..."
//! ```
//!
//! Every key is optional; missing prompts keep the built-in text.

use serde::Deserialize;
use tracing::{error, info};

use crate::prompts::{DEFAULT_DRAFT_SYSTEM, DEFAULT_HTML_SYSTEM};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  /// Where the editing session is persisted. `SESSION_PATH` wins over this.
  #[serde(default)]
  pub session_path: Option<String>,
}

/// System prompts for the two generation paths.
///
/// `html_system` may contain `{pagination_script}`; it is replaced with the
/// script every rendered worksheet carries.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub draft_system: String,
  pub html_system: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      draft_system: DEFAULT_DRAFT_SYSTEM.into(),
      html_system: DEFAULT_HTML_SYSTEM.into(),
    }
  }
}

pub fn parse_app_config(text: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(text)
}

/// Attempt to load `AppConfig` from WORKSHEET_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("WORKSHEET_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "eslsheet", %path, has_session_path = cfg.session_path.is_some(), "Loaded worksheet config");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "eslsheet", %path, error = %e, "Failed to parse TOML config; using defaults");
        None
      }
    },
    Err(e) => {
      error!(target: "eslsheet", %path, error = %e, "Failed to read config file; using defaults");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_prompts_keep_defaults() {
    let cfg = parse_app_config("[prompts]\ndraft_system = \"custom\"\n").unwrap();
    assert_eq!(cfg.prompts.draft_system, "custom");
    assert_eq!(cfg.prompts.html_system, DEFAULT_HTML_SYSTEM);
    assert!(cfg.session_path.is_none());
  }

  #[test]
  fn empty_file_is_all_defaults() {
    let cfg = parse_app_config("").unwrap();
    assert_eq!(cfg.prompts.draft_system, DEFAULT_DRAFT_SYSTEM);
  }

  #[test]
  fn session_path_is_read() {
    let cfg = parse_app_config("session_path = \"/tmp/s.json\"").unwrap();
    assert_eq!(cfg.session_path.as_deref(), Some("/tmp/s.json"));
  }

  #[test]
  fn bad_toml_is_an_error() {
    assert!(parse_app_config("prompts = 3").is_err());
  }
}
