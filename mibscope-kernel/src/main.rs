//! Mibscope kernel: loads the configuration and the MIB definition, brings up
//! the mock agent registry and serves the dashboard API.

mod agents;
mod config;
mod health;
mod history;
mod http;
mod models;
mod services;
mod sessions;
mod state;
mod traps;

use crate::agents::{AgentRegistry, SharedAgentRegistry};
use crate::config::load_config;
use crate::state::AppState;
use crate::traps::TrapLog;

use anyhow::Context;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = load_config().await;
    let definition = cfg
        .mib_tree()
        .await
        .context("failed to load the MIB definition")?;
    info!(nodes = definition.len(), "MIB definition loaded");

    let registry: SharedAgentRegistry = Arc::new(AgentRegistry::from_config(&cfg));
    info!(agents = registry.len().await, "agent registry ready");

    let listen = cfg.listen.clone();
    if cfg.api_key.is_none() {
        info!("no API key configured, all routes are open");
    }
    let app_state = AppState::new(
        cfg,
        registry,
        definition,
        TrapLog::seeded(OffsetDateTime::now_utc()),
    );
    let app = http::build_router(app_state);

    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!("listening on http://{listen}");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
