//! Polyglot Quiz · question generation backend
//!
//! - Axum HTTP API (`/generate-questions`, `/health`, `/catalog`, `/report`)
//! - Gemini / Groq / OpenAI / Perplexity providers, selected from env credentials
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   GEMINI_API_KEY      : enables Gemini (likewise GROQ_, OPENAI_, PERPLEXITY_)
//!   <PROVIDER>_MODEL    : model override per provider
//!   <PROVIDER>_BASE_URL : endpoint override per provider
//!   QUIZ_PROVIDER_ORDER : priority list, default "gemini,groq,openai,perplexity"
//!   QUIZ_PROVIDER_MODE  : "single" (default) or "fallback"
//!   QUIZ_CONFIG_PATH    : path to TOML config (prompts + provider settings)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use polyglot_quiz::config::AppConfig;
use polyglot_quiz::{build_router, telemetry, AppState};

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Resolve configuration once; the service gets it injected.
  let config = AppConfig::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
  let state = Arc::new(AppState::new(config));

  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "polyglot_quiz", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    info!(target: "polyglot_quiz", "Shutdown signal received");
  }
}
