#![allow(dead_code)]

use async_trait::async_trait;
use nodeway::runtime::{
    EngineConfig, ExecutionEngine, ExecutionObserver, HandlerContext, HandlerRegistry, NodeError, NodeHandler,
    NodeOutput,
};
use nodeway::workflow::{Node, NodeConfig, NodeType};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const ACTION: &str = "action";

/// Synchronous handler built from a closure
pub struct FnHandler<F>(F);

pub fn handler<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Node, &mut HandlerContext<'_>) -> Result<Value, NodeError> + Send + Sync + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F> NodeHandler for FnHandler<F>
where
    F: Fn(&Node, &mut HandlerContext<'_>) -> Result<Value, NodeError> + Send + Sync + 'static,
{
    async fn execute(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        (self.0)(node, ctx)
    }
}

/// Sleeps, then echoes the node id
pub struct SlowHandler(pub Duration);

#[async_trait]
impl NodeHandler for SlowHandler {
    async fn execute(&self, node: &Node, _ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        tokio::time::sleep(self.0).await;
        Ok(json!({ "slept": node.id }))
    }
}

/// Records the id of every node it is asked to execute
#[derive(Default, Clone)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, node_id: &str) {
        self.0.lock().unwrap().push(node_id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Cancels the token as soon as the given node completes
pub struct CancelAfter {
    pub node_id: String,
    pub token: CancellationToken,
}

impl ExecutionObserver for CancelAfter {
    fn on_node_complete(&self, node_id: &str, _output: &NodeOutput) {
        if node_id == self.node_id {
            self.token.cancel();
        }
    }
}

pub fn action(id: &str) -> Node {
    Node::new(id, NodeConfig::Custom { node_type: ACTION.to_string(), config: json!({}) })
}

/// Registry with built-ins plus an `action` handler that logs calls and echoes its inputs
pub fn registry_with_actions(log: &CallLog) -> HandlerRegistry {
    let log = log.clone();
    let mut registry = HandlerRegistry::with_builtins();
    registry.register(
        NodeType::Custom(ACTION.to_string()),
        handler(move |node, ctx| {
            log.push(&node.id);
            Ok(json!({ "node": node.id, "inputs": ctx.input_ids() }))
        }),
    );
    registry
}

pub fn engine(registry: HandlerRegistry) -> ExecutionEngine {
    ExecutionEngine::new(Arc::new(registry), EngineConfig::default())
}
