mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::SlowHandler;
use nodeway::config::Config;
use nodeway::runtime::HandlerRegistry;
use nodeway::server::create_app_with_handlers;
use nodeway::workflow::NodeType;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

async fn app() -> Router {
    let mut handlers = HandlerRegistry::with_builtins();
    handlers.register(NodeType::Custom("slow".into()), SlowHandler(Duration::from_millis(300)));
    create_app_with_handlers(Config::in_memory(), handlers).await.unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()));
    (status, value)
}

fn signup_workflow() -> Value {
    json!({
        "workflow": {
            "id": "signup",
            "name": "Signup",
            "nodes": [
                { "id": "hook", "type": "trigger", "config": { "kind": { "webhook": { "path": "/signup" } } } },
                { "id": "adult", "type": "condition", "config": {
                    "conditions": [{ "left": "{{hook.age}}", "operator": "greater_or_equal", "right": 18 }]
                } },
                { "id": "welcome", "type": "transform", "config": { "output": { "message": "Welcome {{hook.name}}" } } },
                { "id": "reject", "type": "transform", "config": { "output": { "message": "Too young" } } }
            ],
            "edges": [
                { "id": "e1", "source": "hook", "target": "adult" },
                { "id": "e2", "source": "adult", "target": "welcome", "source_handle": "true" },
                { "id": "e3", "source": "adult", "target": "reject", "source_handle": "false" }
            ]
        }
    })
}

#[tokio::test]
async fn health_check() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn workflow_crud_lifecycle() {
    let app = app().await;

    let (status, body) = send(&app, "POST", "/api/workflows", Some(signup_workflow())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"], json!(["hook", "adult", "welcome", "reject"]));

    let (status, _) = send(&app, "POST", "/api/workflows", Some(signup_workflow())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "GET", "/api/workflows/signup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"][1]["type"], "condition");

    let mut renamed = signup_workflow();
    renamed["workflow"]["name"] = json!("Signup v2");
    let (status, _) = send(&app, "PUT", "/api/workflows/signup", Some(renamed)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/workflows", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflows"][0]["name"], "Signup v2");

    let (status, _) = send(&app, "DELETE", "/api/workflows/signup", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/api/workflows/signup", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", "/api/workflows/signup/runs", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_definitions_are_rejected() {
    let app = app().await;

    let mut cyclic = signup_workflow();
    cyclic["workflow"]["edges"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "id": "back", "source": "welcome", "target": "hook" }));
    let (status, body) = send(&app, "POST", "/api/workflows", Some(cyclic)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cycle"), "{}", body);

    let mut malformed = signup_workflow();
    malformed["workflow"]["nodes"][1]["config"] = json!({ "conditions": "nope" });
    let (status, _) = send(&app, "POST", "/api/workflows", Some(malformed)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/workflows", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflows"], json!([]));
}

#[tokio::test]
async fn manual_run_returns_execution_result() {
    let app = app().await;
    send(&app, "POST", "/api/workflows", Some(signup_workflow())).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/workflows/signup/runs",
        Some(json!({ "run_id": "manual-1", "payload": { "name": "Ada", "age": 36 } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["run_id"], "manual-1");
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["skipped"], json!(["reject"]));
    assert_eq!(body["context"]["outputs"]["welcome"]["value"], json!({ "message": "Welcome Ada" }));
}

#[tokio::test]
async fn failed_run_is_unprocessable() {
    let app = app().await;
    let workflow = json!({
        "workflow": {
            "id": "broken",
            "name": "Broken",
            "nodes": [
                { "id": "start", "type": "trigger", "config": {} },
                { "id": "greet", "type": "transform", "config": { "output": "{{start.missing}}" } }
            ],
            "edges": [{ "id": "e1", "source": "start", "target": "greet" }]
        }
    });
    send(&app, "POST", "/api/workflows", Some(workflow)).await;

    let (status, body) = send(&app, "POST", "/api/workflows/broken/runs", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["failure"]["reason"], "node");
    assert_eq!(body["failure"]["node_id"], "greet");
    assert_eq!(body["failure"]["error"]["kind"], "config");
    assert_eq!(body["node_results"][1]["status"], "error");
}

#[tokio::test]
async fn webhook_runs_matching_trigger() {
    let app = app().await;
    send(&app, "POST", "/api/workflows", Some(signup_workflow())).await;

    let (status, body) = send(&app, "POST", "/webhook/signup/signup", Some(json!({ "name": "Tim", "age": 12 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["skipped"], json!(["welcome"]));
    assert_eq!(body["context"]["outputs"]["reject"]["value"]["message"], "Too young");

    let (status, _) = send(&app, "POST", "/webhook/signup/unknown", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn active_run_can_be_cancelled() {
    let app = app().await;
    let workflow = json!({
        "workflow": {
            "id": "slow",
            "name": "Slow",
            "nodes": [
                { "id": "start", "type": "trigger", "config": {} },
                { "id": "wait", "type": "slow", "config": {} },
                { "id": "after", "type": "transform", "config": { "output": "done" } }
            ],
            "edges": [
                { "id": "e1", "source": "start", "target": "wait" },
                { "id": "e2", "source": "wait", "target": "after" }
            ]
        }
    });
    let (status, _) = send(&app, "POST", "/api/workflows", Some(workflow)).await;
    assert_eq!(status, StatusCode::CREATED);

    let runner = app.clone();
    let run = tokio::spawn(async move {
        send(&runner, "POST", "/api/workflows/slow/runs", Some(json!({ "run_id": "slow-1" }))).await
    });

    let mut active = false;
    for _ in 0..100 {
        let (_, body) = send(&app, "GET", "/api/runs", None).await;
        if body["runs"] == json!(["slow-1"]) {
            active = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(active, "run never became active");

    let (status, _) = send(&app, "DELETE", "/api/runs/slow-1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = run.await.unwrap();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["failure"], json!({ "reason": "cancelled" }));
    assert_eq!(body["node_results"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "DELETE", "/api/runs/slow-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
