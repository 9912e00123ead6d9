//! HTTP server
//!
//! `POST /api` runs the publish pipeline; `GET /health` is a liveness check.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pagesmith_core::TaskPublisher;
use pagesmith_foundation::{Error, TaskRequest, TaskResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    publisher: Arc<TaskPublisher>,
}

/// Build the application router
pub fn router(publisher: Arc<TaskPublisher>) -> Router {
    Router::new()
        .route("/api", post(publish_task))
        .route("/health", get(health))
        .with_state(AppState { publisher })
}

/// Serve until Ctrl-C
pub async fn serve(bind: &str, publisher: Arc<TaskPublisher>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(publisher))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn publish_task(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let result = state.publisher.publish(&request).await?;
    Ok(Json(TaskResponse::done(result.pages_url)))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// Errors
// ============================================================================

/// Pipeline error rendered as `{"detail": ...}`
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Unauthorized => StatusCode::FORBIDDEN,
        Error::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let detail = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            format!("{} failed: {}", self.0.stage(), self.0)
        };

        if status.is_server_error() {
            error!("{}", detail);
        } else {
            warn!("Rejected request: {}", detail);
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
