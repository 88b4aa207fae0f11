//! Liveness responder for hosting health checks.
//!
//! Shares no state with the bot; it only proves the process is up.

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tracing::info;

use gbot_core::Result;

pub const LIVENESS_BODY: &str = "Bot is running!";

pub fn build_router() -> Router {
    Router::new().route("/", get(liveness))
}

async fn liveness() -> &'static str {
    LIVENESS_BODY
}

pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "liveness responder listening");
    axum::serve(listener, build_router()).await?;
    Ok(())
}
