//! Quaderno · Quiz Authoring Backend
//!
//! - Axum HTTP + WebSocket API
//! - Optional OpenRouter integration (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   OPENROUTER_API_KEY   : enables quiz generation/validation if present
//!   OPENROUTER_BASE_URL  : default "https://openrouter.ai/api/v1"
//!   OPENROUTER_MODEL     : default "mistralai/mistral-7b-instruct"
//!   QUADERNO_CONFIG_PATH : path to TOML config (validation prompt templates)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod annotations;
mod quiz_text;
mod document;
mod ledger;
mod session;
mod activity;
mod config;
mod openrouter;
mod seeds;
mod state;
mod logic;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (session store, OpenRouter client, prompts).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quaderno_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
