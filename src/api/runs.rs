/// Run execution endpoints
///
/// Runs execute synchronously inside the request: the response carries the
/// complete ExecutionResult (200 on success, 422 on run failure). Each run
/// registers with the run tracker so it can be cancelled by id while it is
/// in flight.

use crate::api::{ApiError, AppState};
use crate::runtime::engine::{ExecutionResult, RunOptions};
use crate::workflow::registry::CompiledWorkflow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{any, delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Body of a manual run request; both fields optional
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub payload: Value,
    pub run_id: Option<String>,
}

pub fn create_run_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows/{id}/runs", post(start_run))
        .route("/api/runs", get(list_active_runs))
        .route("/api/runs/{run_id}", delete(cancel_run))
        // Format: /webhook/{workflow_id}/{webhook_path}
        .route("/webhook/{workflow_id}/{*path}", any(execute_webhook))
}

/// Run a workflow manually
///
/// POST /api/workflows/{id}/runs
/// Body: { "payload": {...}, "run_id": "..." }
async fn start_run(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    body: String,
) -> Result<(StatusCode, Json<ExecutionResult>), ApiError> {
    let request: RunRequest = if body.trim().is_empty() {
        RunRequest::default()
    } else {
        serde_json::from_str(&body).map_err(|e| ApiError::bad_request(format!("invalid run request: {}", e)))?
    };

    let compiled = state
        .registry
        .get_workflow(&workflow_id)
        .ok_or_else(|| ApiError::not_found(format!("workflow '{}' not found", workflow_id)))?;

    tracing::info!("▶️ Manual run requested for workflow: {}", workflow_id);
    run_workflow(&state, compiled, request.payload, request.run_id).await
}

/// Execute a workflow via webhook trigger
///
/// ANY /webhook/{workflow_id}/{webhook_path}
/// Body: JSON payload handed to the workflow's trigger nodes
async fn execute_webhook(
    State(state): State<AppState>,
    Path((workflow_id, webhook_path)): Path<(String, String)>,
    body: String,
) -> Result<(StatusCode, Json<ExecutionResult>), ApiError> {
    tracing::info!("📥 Webhook request received: {}/{}", workflow_id, webhook_path);
    tracing::debug!("📄 Request body: {}", body);

    let payload = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("❌ Invalid JSON payload for webhook: {}/{} - Error: {}", workflow_id, webhook_path, e);
            ApiError::bad_request(format!("invalid JSON payload: {}", e))
        })?
    };

    let compiled = state.registry.find_webhook(&workflow_id, &webhook_path).ok_or_else(|| {
        tracing::warn!("❌ No webhook trigger for path '{}' in workflow '{}'", webhook_path, workflow_id);
        ApiError::not_found(format!("no webhook '{}' in workflow '{}'", webhook_path, workflow_id))
    })?;

    run_workflow(&state, compiled, payload, None).await
}

/// List ids of runs currently executing
///
/// GET /api/runs
async fn list_active_runs(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "runs": state.runs.active_runs() }))
}

/// Cancel an in-flight run
///
/// DELETE /api/runs/{run_id}
/// The run stops before its next node and reports a cancelled failure.
async fn cancel_run(State(state): State<AppState>, Path(run_id): Path<String>) -> Result<Json<Value>, ApiError> {
    if state.runs.cancel(&run_id) {
        Ok(Json(json!({ "run_id": run_id, "cancelled": true })))
    } else {
        Err(ApiError::not_found(format!("run '{}' is not active", run_id)))
    }
}

async fn run_workflow(
    state: &AppState,
    compiled: Arc<CompiledWorkflow>,
    payload: Value,
    run_id: Option<String>,
) -> Result<(StatusCode, Json<ExecutionResult>), ApiError> {
    let run_id = run_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let guard = state
        .runs
        .register(&run_id)
        .ok_or_else(|| ApiError::new(StatusCode::CONFLICT, format!("run '{}' is already active", run_id)))?;

    let options = RunOptions::new()
        .with_run_id(run_id)
        .with_payload(payload)
        .with_cancellation(guard.token());
    let result = state.engine.execute(&compiled.workflow, options).await;
    drop(guard);

    let status = if result.success { StatusCode::OK } else { StatusCode::UNPROCESSABLE_ENTITY };
    Ok((status, Json(result)))
}
