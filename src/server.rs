/// Server setup and initialization
///
/// Wires together all components: storage, registry, execution engine, and HTTP routes.
/// Provides the main application factory function for creating the Axum app.

use crate::{
    api::{create_api_routes, AppState},
    config::Config,
    runtime::{engine::ExecutionEngine, handler::HandlerRegistry, runs::RunTracker},
    workflow::{registry::WorkflowRegistry, storage::WorkflowStorage},
};
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with the built-in node handlers
pub async fn create_app(config: Config) -> Result<Router> {
    create_app_with_handlers(config, HandlerRegistry::with_builtins()).await
}

/// Create the application with a caller-supplied handler registry
///
/// Capability providers (email, spreadsheet, text generation, ...) are
/// registered on `handlers` before the app is built.
pub async fn create_app_with_handlers(config: Config, handlers: HandlerRegistry) -> Result<Router> {
    tracing::info!("📋 Opening workflow storage: {}", config.database.path);
    let workflow_storage = WorkflowStorage::connect(&config.database.path)
        .await
        .context("Failed to initialize workflow storage")?;

    tracing::info!("📊 Initializing workflow registry");
    let workflow_registry = Arc::new(WorkflowRegistry::new(workflow_storage));
    workflow_registry
        .init_from_storage()
        .await
        .context("Failed to load workflows from storage")?;

    tracing::info!(
        "🚀 Initializing execution engine (node timeout {}ms, handlers: {:?})",
        config.engine.node_timeout_ms,
        handlers.node_types().iter().map(|t| t.as_str().to_string()).collect::<Vec<_>>()
    );
    let execution_engine = Arc::new(ExecutionEngine::new(Arc::new(handlers), config.engine.clone()));

    let state = AppState {
        registry: workflow_registry,
        engine: execution_engine,
        runs: RunTracker::new(),
    };

    let app = Router::new()
        .route("/healthz", get(health_check))
        .merge(create_api_routes())
        .with_state(state);

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Install the global tracing subscriber
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing::info!("Starting Nodeway server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}
