/// Workflow execution engine
///
/// Orders the graph once, then walks the order strictly sequentially: for
/// each node it decides whether branch pruning skipped it, dispatches it to
/// its handler under a timeout, records the output and prunes the outgoing
/// edges a branching node did not select. The first node failure aborts the
/// run; nothing is rolled back.

use crate::runtime::branch::live_successor_handles;
use crate::runtime::context::{HandlerContext, NodeOutput, RunContext};
use crate::runtime::error::{NodeError, RunFailure};
use crate::runtime::graph::WorkflowGraph;
use crate::runtime::handler::HandlerRegistry;
use crate::runtime::observer::{ExecutionObserver, NoopObserver};
use crate::workflow::types::{Edge, Node, Workflow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Engine-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Handler timeout applied when a node sets none of its own
    pub node_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { node_timeout_ms: 30_000 }
    }
}

/// Per-run inputs besides the graph itself
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Correlation id from the job transport; generated when absent
    pub run_id: Option<String>,
    /// Only used for log correlation
    pub workflow_id: Option<String>,
    /// Data the run was triggered with, emitted by trigger nodes
    pub payload: Value,
    pub observer: Option<Arc<dyn ExecutionObserver>>,
    pub cancellation: Option<CancellationToken>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: String,
    #[serde(flatten)]
    pub output: NodeOutput,
}

/// Complete outcome of one run, returned for successes and failures alike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub run_id: String,
    pub success: bool,
    pub status: RunStatus,
    /// Why the run failed; `None` on success
    pub failure: Option<RunFailure>,
    /// Executed nodes in execution order, including the failing one
    pub node_results: Vec<NodeResult>,
    /// Nodes removed by branch pruning, in execution order
    pub skipped: Vec<String>,
    /// Final snapshot of outputs and variables
    pub context: RunContext,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn node_output(&self, node_id: &str) -> Option<&NodeOutput> {
        self.node_results
            .iter()
            .find(|result| result.node_id == node_id)
            .map(|result| &result.output)
    }

    pub fn executed_node_ids(&self) -> Vec<&str> {
        self.node_results.iter().map(|result| result.node_id.as_str()).collect()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.failure, Some(RunFailure::Cancelled))
    }
}

/// Sequential DAG execution engine
///
/// Holds no per-run state, so one engine serves any number of concurrent
/// runs, each with its own [`RunContext`].
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    registry: Arc<HandlerRegistry>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<HandlerRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Execute a stored workflow definition
    pub async fn execute(&self, workflow: &Workflow, mut options: RunOptions) -> ExecutionResult {
        if options.workflow_id.is_none() {
            options.workflow_id = Some(workflow.id.clone());
        }
        self.execute_workflow(&workflow.nodes, &workflow.edges, options).await
    }

    /// Execute one run of a node/edge graph to completion
    ///
    /// Never fails: structural errors, node errors and cancellation are all
    /// reported inside the returned [`ExecutionResult`].
    pub async fn execute_workflow(&self, nodes: &[Node], edges: &[Edge], options: RunOptions) -> ExecutionResult {
        let run_id = options.run_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = tracing::info_span!(
            "workflow_run",
            run_id = %run_id,
            workflow_id = options.workflow_id.as_deref().unwrap_or("-"),
        );

        self.run(nodes, edges, run_id, options).instrument(span).await
    }

    async fn run(&self, nodes: &[Node], edges: &[Edge], run_id: String, options: RunOptions) -> ExecutionResult {
        let mut run = RunState::new(run_id);
        tracing::info!("🚀 Starting workflow run with {} nodes and {} edges", nodes.len(), edges.len());

        let ordered = WorkflowGraph::build(nodes, edges)
            .and_then(|graph| graph.topological_order().map(|order| (graph, order)));
        let (graph, order) = match ordered {
            Ok(ordered) => ordered,
            Err(error) => {
                tracing::error!("❌ Workflow graph rejected: {}", error);
                return run.finish(Some(RunFailure::from(error)));
            }
        };

        tracing::debug!(
            "📋 Execution order: {:?}",
            order.iter().map(|&idx| graph.node(idx).id.as_str()).collect::<Vec<_>>()
        );

        let observer = options.observer.clone().unwrap_or_else(|| Arc::new(NoopObserver));
        let cancellation = options.cancellation.clone().unwrap_or_default();
        let mut pruned = vec![false; graph.edge_count()];

        for (step, &index) in order.iter().enumerate() {
            let node = graph.node(index);

            if cancellation.is_cancelled() {
                tracing::warn!("🛑 Run cancelled before node '{}' (step {}/{})", node.id, step + 1, order.len());
                return run.finish(Some(RunFailure::Cancelled));
            }

            let incoming = graph.incoming(index);
            let (live, dead): (Vec<_>, Vec<_>) = incoming.iter().partition(|(edge_idx, _)| !pruned[edge_idx.index()]);

            if !incoming.is_empty() && live.is_empty() {
                tracing::info!("⏭️ Step {}/{}: Skipping node '{}', every incoming branch was pruned", step + 1, order.len(), node.id);
                for (edge_idx, _) in graph.outgoing(index) {
                    pruned[edge_idx.index()] = true;
                }
                run.skipped.push(node.id.clone());
                observer.on_node_skipped(&node.id);
                continue;
            }

            let mut inputs: Vec<String> = Vec::with_capacity(live.len());
            for (_, edge) in &live {
                if !inputs.contains(&edge.source) {
                    inputs.push(edge.source.clone());
                }
            }
            let hidden: HashSet<String> = dead
                .iter()
                .map(|(_, edge)| edge.source.clone())
                .filter(|source| !inputs.contains(source))
                .collect();

            tracing::info!("📍 Step {}/{}: Executing node '{}' (type: {})", step + 1, order.len(), node.id, node.node_type());
            observer.on_node_start(&node.id);

            let node_start = Instant::now();
            let result = {
                let mut ctx = HandlerContext::new(&mut run.context, &run.run_id, &options.payload, inputs, hidden);
                self.dispatch(node, &mut ctx).await
            };
            let result = result.and_then(|value| live_successor_handles(node, &value).map(|handles| (value, handles)));
            let duration_ms = elapsed_ms(node_start);

            match result {
                Ok((value, handles)) => {
                    for (edge_idx, edge) in graph.outgoing(index) {
                        if !handles.is_live(edge) {
                            tracing::debug!("✂️ Pruned edge '{}' ('{}' → '{}')", edge.id, edge.source, edge.target);
                            pruned[edge_idx.index()] = true;
                        }
                    }

                    let output = NodeOutput::success(value, duration_ms);
                    tracing::info!("✅ Node '{}' completed in {}ms", node.id, duration_ms);
                    run.context.record_output(&node.id, output.clone());
                    run.node_results.push(NodeResult { node_id: node.id.clone(), output: output.clone() });
                    observer.on_node_complete(&node.id, &output);
                }
                Err(error) => {
                    tracing::error!("❌ Node '{}' failed after {}ms: {}", node.id, duration_ms, error);
                    run.node_results.push(NodeResult {
                        node_id: node.id.clone(),
                        output: NodeOutput::error(&error, duration_ms),
                    });
                    observer.on_node_error(&node.id, &error);
                    return run.finish(Some(RunFailure::Node { node_id: node.id.clone(), error }));
                }
            }
        }

        run.finish(None)
    }

    /// Resolve the node's handler and run it under the node timeout
    async fn dispatch(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        let node_type = node.node_type();
        let handler = self
            .registry
            .resolve(&node_type)
            .ok_or_else(|| NodeError::config(format!("No handler registered for node type '{}'", node_type)))?;

        let timeout_ms = node.timeout_ms.unwrap_or(self.config.node_timeout_ms);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), handler.execute(node, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(NodeError::Timeout { timeout_ms }),
        }
    }
}

/// Mutable bookkeeping for a single run
struct RunState {
    run_id: String,
    context: RunContext,
    node_results: Vec<NodeResult>,
    skipped: Vec<String>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl RunState {
    fn new(run_id: String) -> Self {
        Self {
            run_id,
            context: RunContext::new(),
            node_results: Vec::new(),
            skipped: Vec::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    fn finish(self, failure: Option<RunFailure>) -> ExecutionResult {
        let duration_ms = elapsed_ms(self.started);
        match &failure {
            None => tracing::info!(
                "🎉 Workflow run completed in {}ms ({} executed, {} skipped)",
                duration_ms,
                self.node_results.len(),
                self.skipped.len()
            ),
            Some(failure) => tracing::error!("❌ Workflow run failed after {}ms: {}", duration_ms, failure),
        }

        let status = if failure.is_none() { RunStatus::Succeeded } else { RunStatus::Failed };
        ExecutionResult {
            run_id: self.run_id,
            success: failure.is_none(),
            status,
            failure,
            node_results: self.node_results,
            skipped: self.skipped,
            context: self.context,
            started_at: self.started_at,
            duration_ms,
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
