/// Workflow management REST API endpoints
///
/// Provides CRUD operations for workflow definitions with hot-reload support.
/// Every write goes through the registry, which rejects structurally invalid
/// graphs before they are persisted.

use crate::api::{ApiError, AppState};
use crate::runtime::error::GraphError;
use crate::workflow::types::Workflow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Response for workflow creation/update operations
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub message: String,
    /// Node ids in the order a run will visit them
    pub order: Vec<String>,
}

/// Request body for workflow creation and update
#[derive(Debug, Deserialize)]
pub struct WorkflowRequest {
    pub workflow: Workflow,
}

/// Create workflow management routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/api/workflows/{id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
}

/// Create a new workflow
///
/// POST /api/workflows
/// Body: { "workflow": { "id": "...", "name": "...", "nodes": [...], "edges": [...] } }
async fn create_workflow(State(state): State<AppState>, body: String) -> Result<(StatusCode, Json<WorkflowResponse>), ApiError> {
    let workflow = parse_request(&body)?.workflow;

    if workflow.id.is_empty() || workflow.name.is_empty() {
        return Err(ApiError::bad_request("workflow id and name are required"));
    }

    if state.registry.storage().get_workflow(&workflow.id).await.map_err(ApiError::internal)?.is_some() {
        return Err(ApiError::new(StatusCode::CONFLICT, format!("workflow '{}' already exists", workflow.id)));
    }

    let response = save(&state, workflow, "created").await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// List all workflows
///
/// GET /api/workflows
/// Returns: { "workflows": [{ "id": "...", "name": "...", "created_at": "...", "updated_at": "..." }] }
async fn list_workflows(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let workflows = state.registry.storage().list_workflows().await.map_err(ApiError::internal)?;
    Ok(Json(json!({ "workflows": workflows })))
}

/// Get a specific workflow by ID
///
/// GET /api/workflows/{id}
async fn get_workflow(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Workflow>, ApiError> {
    match state.registry.storage().get_workflow(&id).await.map_err(ApiError::internal)? {
        Some(workflow) => Ok(Json(workflow)),
        None => Err(ApiError::not_found(format!("workflow '{}' not found", id))),
    }
}

/// Replace an existing workflow
///
/// PUT /api/workflows/{id}
/// The id in the path wins over any id in the body.
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let mut workflow = parse_request(&body)?.workflow;
    workflow.id = id.clone();

    if workflow.name.is_empty() {
        return Err(ApiError::bad_request("workflow name is required"));
    }

    if state.registry.storage().get_workflow(&id).await.map_err(ApiError::internal)?.is_none() {
        return Err(ApiError::not_found(format!("workflow '{}' not found", id)));
    }

    Ok(Json(save(&state, workflow, "updated").await?))
}

/// Delete a workflow
///
/// DELETE /api/workflows/{id}
async fn delete_workflow(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    if state.registry.remove_workflow(&id).await.map_err(ApiError::internal)? {
        Ok(Json(json!({ "message": format!("Workflow '{}' deleted", id) })))
    } else {
        Err(ApiError::not_found(format!("workflow '{}' not found", id)))
    }
}

/// Parse the body by hand so malformed node configs surface as 400
fn parse_request(body: &str) -> Result<WorkflowRequest, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!("❌ Invalid workflow definition: {}", e);
        ApiError::bad_request(format!("invalid workflow definition: {}", e))
    })
}

async fn save(state: &AppState, workflow: Workflow, verb: &str) -> Result<WorkflowResponse, ApiError> {
    let compiled = state.registry.upsert(workflow).await.map_err(|e| match e.downcast_ref::<GraphError>() {
        Some(graph_error) => ApiError::bad_request(format!("invalid workflow graph: {}", graph_error)),
        None => ApiError::internal(e),
    })?;

    Ok(WorkflowResponse {
        id: compiled.workflow.id.clone(),
        message: format!("Workflow '{}' {} successfully", compiled.workflow.name, verb),
        order: compiled.order.clone(),
    })
}
