/// Nodeway: deterministic node-graph workflow execution engine
///
/// Main entry point for the Nodeway server. Loads configuration from the
/// environment and serves:
/// - Workflow management API at /api/workflows/*
/// - Manual runs at /api/workflows/{id}/runs, cancellation at /api/runs/{run_id}
/// - Webhook-triggered runs at /webhook/{workflow_id}/*
/// - Health check at /healthz

use nodeway::{
    config::Config,
    server::{init_tracing, start_server},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::default();
    start_server(config).await
}
