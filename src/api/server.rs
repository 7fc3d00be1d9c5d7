//! HTTP server setup: router and graceful shutdown.

use super::state::ApiState;
use super::{deployments, system, webhook};

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use std::net::SocketAddr;
use std::sync::Arc;

/// Build the application router. `/webhook` answers 404 unless webhook intake
/// is enabled.
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(system::health))
        .route("/status", get(system::status))
        .route("/history", get(deployments::history))
        .route("/deploy", post(deployments::deploy));

    Router::new()
        .route("/health", get(system::health))
        .route("/webhook", post(webhook::receive))
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the given address.
pub async fn start_http_server(
    bind: SocketAddr,
    state: Arc<ApiState>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "HTTP server listening");

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        if let Err(error) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
        {
            tracing::error!(%error, "HTTP server exited with error");
        }
    });

    Ok(handle)
}
