use super::state::ApiState;
use crate::command::DeployCommand;
use crate::ledger::{DeploymentRecord, LEDGER_CAPACITY};
use crate::orchestrator::Stage;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize)]
pub(super) struct HistoryResponse {
    success: bool,
    deployments: Vec<DeploymentRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DeployRequest {
    token_name: Option<String>,
    token_symbol: Option<String>,
    /// Cast to reply to; also used as the dedup key.
    cast_hash: Option<String>,
}

pub(super) async fn history(State(state): State<Arc<ApiState>>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        success: true,
        deployments: state.pipeline.ledger().list(LEDGER_CAPACITY).await,
    })
}

fn error_response(status: StatusCode, error: impl ToString) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(serde_json::json!({ "success": false, "error": error.to_string() })),
    )
}

/// Manual deployment through the same orchestrator the feed uses.
pub(super) async fn deploy(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<DeployRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (Some(name), Some(symbol)) = (request.token_name, request.token_symbol) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "tokenName and tokenSymbol are required",
        );
    };
    let Some(command) = DeployCommand::new(name.trim(), symbol.trim()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "tokenName and tokenSymbol must be alphanumeric",
        );
    };

    let task = match state.pipeline.deploy_direct(command, request.cast_hash) {
        Ok(task) => task,
        Err(error) => return error_response(StatusCode::CONFLICT, error),
    };

    let finished = match task.await {
        Ok(finished) => finished,
        Err(error) => {
            tracing::error!(%error, "manual deployment task failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, error);
        }
    };

    match (finished.stage, finished.result) {
        (Stage::Succeeded, Some(result)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "tokenAddress": result.token_address,
                "txHash": result.tx_hash,
                "explorerLink": result.explorer_link,
                "txLink": result.tx_link,
                "image": finished.image_uri,
            })),
        ),
        _ => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            finished.error.unwrap_or_else(|| "Unknown error".to_string()),
        ),
    }
}
