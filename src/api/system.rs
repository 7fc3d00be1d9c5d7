use super::state::ApiState;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    mode: &'static str,
    bot: String,
    wallet: String,
    /// Records currently retained in the ledger.
    deployments: usize,
    total_deployments: u64,
    features: Vec<&'static str>,
}

#[derive(Serialize)]
pub(super) struct StatusResponse {
    status: &'static str,
    version: &'static str,
    pid: u32,
    uptime_seconds: u64,
    seen_events: u64,
}

pub(super) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let settings = state.pipeline.settings();
    let ledger = state.pipeline.ledger();

    let mut features = vec!["image-upload", "ipfs", "commands", "q&a"];
    if state.mode.webhook_enabled() {
        features.push("webhook");
    }
    if state.mode.polling_enabled() {
        features.push("polling");
    }

    Json(HealthResponse {
        status: "ok",
        mode: state.mode.as_str(),
        bot: format!("@{}", settings.handle),
        wallet: settings.wallet.clone(),
        deployments: ledger.count().await,
        total_deployments: ledger.total_recorded().await,
        features,
    })
}

pub(super) async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let uptime = state.started_at.elapsed();
    Json(StatusResponse {
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        pid: std::process::id(),
        uptime_seconds: uptime.as_secs(),
        seen_events: state.pipeline.seen().len(),
    })
}
