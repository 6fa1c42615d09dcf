/// HTTP API Layer
///
/// REST endpoints for workflow management and run triggering:
/// - Workflow CRUD operations with hot reload
/// - Manual and webhook-triggered runs, executed synchronously
/// - Cancellation of in-flight runs

use crate::runtime::{engine::ExecutionEngine, runs::RunTracker};
use crate::workflow::registry::WorkflowRegistry;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use serde_json::json;
use std::sync::Arc;

// Workflow management endpoints (POST/GET/PUT/DELETE)
pub mod workflows;

// Run trigger, webhook and cancellation endpoints
pub mod runs;

// Re-export router builders
pub use runs::create_run_routes;
pub use workflows::create_workflow_routes;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Hot-reload registry backed by workflow storage
    pub registry: Arc<WorkflowRegistry>,
    /// Execution engine shared by every run
    pub engine: Arc<ExecutionEngine>,
    /// Active runs, for cancellation
    pub runs: RunTracker,
}

/// All API routes
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .merge(create_workflow_routes())
        .merge(create_run_routes())
}

/// Error response rendered as `{ "error": message }`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Log the underlying error and hide it from the client
    pub fn internal(error: anyhow::Error) -> Self {
        tracing::error!("❌ Internal error: {:#}", error);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
