//! Judge Tracker · study-group backend
//!
//! - Axum HTTP API: roster solve check (BOJ status scraping), solved.ac
//!   profile proxy, weakness analysis + problem recommendation (OpenAI)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables (a `.env` file is honored):
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables recommendations if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-4o-mini"
//!   OPENAI_TIMEOUT_SECS : default 60
//!   JUDGE_BASE_URL      : default "https://www.acmicpc.net"
//!   SOLVEDAC_BASE_URL   : default "https://solved.ac/api/v3"
//!   TRACKER_CONFIG_PATH : TOML with roster, difficulty bands, prompts
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod judge;
mod roster;
mod solvedac;
mod openai;
mod recommend;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing();

  let state = Arc::new(AppState::from_env()?);
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "judge_tracker", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "judge_tracker", error = %e, "Failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!(target: "judge_tracker", "Shutdown requested");
}
