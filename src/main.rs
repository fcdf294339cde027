//! eslsheet · Leveled ESL Worksheet Backend
//!
//! - Axum HTTP API over the `eslsheet` worksheet core
//! - Editing session + history, persisted to a JSON file when configured
//! - Optional OpenAI-compatible LLM integration (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   LLM_API_KEY           : enables generation (OPENAI_API_KEY is accepted too)
//!   LLM_BASE_URL          : default "https://api.openai.com/v1"
//!   LLM_MODEL             : default "gpt-4o"
//!   WORKSHEET_CONFIG_PATH : path to TOML config (prompt overrides, session path)
//!   SESSION_PATH          : JSON file the session is restored from and saved to
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod config;
mod llm;
mod prompts;
mod protocol;
mod routes;
mod state;
mod telemetry;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: session (restored from disk if configured), prompts, LLM client.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "eslsheet", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "eslsheet", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => info!(target: "eslsheet", "Ctrl-C received; shutting down"),
    Err(e) => {
      warn!(target: "eslsheet", error = %e, "Failed to listen for Ctrl-C; running until killed");
      std::future::pending::<()>().await
    }
  }
}
