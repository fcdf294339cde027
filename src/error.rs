use thiserror::Error;

/// Failure to turn model output into a draft object.
#[derive(Debug, Error)]
pub enum DraftError {
  #[error("Invalid JSON draft output")]
  NoJsonObject,
  #[error("Invalid JSON draft output: {0}")]
  Syntax(#[from] serde_json::Error),
  #[error("Invalid JSON draft output: top-level value is not an object")]
  NotAnObject,
}

/// Internal sanitizer failure. Never leaves the crate: the sanitizer returns
/// its input unchanged instead.
#[derive(Debug, Error)]
pub(crate) enum SanitizeError {
  #[error("invalid selector: {0}")]
  Selector(&'static str),
  #[error("serialize: {0}")]
  Serialize(#[from] std::io::Error),
  #[error("serialized document is not UTF-8: {0}")]
  Utf8(#[from] std::string::FromUtf8Error),
  #[error("document has no <html> element")]
  NoRoot,
}
