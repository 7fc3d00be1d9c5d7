use super::state::ApiState;
use crate::intake::webhook::WebhookAck;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;

/// Feed webhook delivery. Every delivery the pipeline can still accept is
/// acknowledged with 200, including ones it chooses to drop.
pub(super) async fn receive(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(ingress) = &state.webhook else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "error": "webhook intake disabled" })),
        );
    };

    match ingress.accept(&body).await {
        Ok(WebhookAck::Forwarded) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))),
        Ok(WebhookAck::AlreadyProcessed) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "message": "Already processed" })),
        ),
        Ok(WebhookAck::Ignored(reason)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "message": reason })),
        ),
        Err(error) => {
            tracing::error!(%error, "failed to hand off webhook event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": error.to_string() })),
            )
        }
    }
}
