/// Node handler trait and registry
///
/// Every node type is executed by a [`NodeHandler`] registered against its
/// [`NodeType`]. The registry is assembled once at startup; built-in handlers
/// cover control flow and generic integrations, capability providers
/// (email, spreadsheets, text generation, custom types) register their own.

use crate::runtime::context::HandlerContext;
use crate::runtime::error::NodeError;
use crate::runtime::handlers::{
    ConditionHandler, HttpRequestHandler, ScriptHandler, SetVariableHandler, SwitchHandler,
    TransformHandler, TriggerHandler,
};
use crate::workflow::types::{Node, NodeType};
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

/// Produces a node's output from its configuration and the run so far
///
/// Handlers locate their own inputs (by predecessor id or through template
/// references in config strings) and must report failures as [`NodeError`],
/// distinguishing configuration problems from transient ones.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn execute(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError>;
}

/// Registry of handlers keyed by node type
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<NodeType, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    /// Empty registry, for callers that want full control over dispatch
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(NodeType::Trigger, TriggerHandler)
            .register(NodeType::Condition, ConditionHandler)
            .register(NodeType::Switch, SwitchHandler)
            .register(NodeType::HttpRequest, HttpRequestHandler::new())
            .register(NodeType::Script, ScriptHandler)
            .register(NodeType::SetVariable, SetVariableHandler)
            .register(NodeType::Transform, TransformHandler);
        registry
    }

    /// Register (or replace) the handler for a node type
    pub fn register(&mut self, node_type: NodeType, handler: impl NodeHandler + 'static) -> &mut Self {
        self.register_arc(node_type, Arc::new(handler))
    }

    pub fn register_arc(&mut self, node_type: NodeType, handler: Arc<dyn NodeHandler>) -> &mut Self {
        tracing::debug!("🧩 Registered handler for node type '{}'", node_type);
        self.handlers.insert(node_type, handler);
        self
    }

    pub fn resolve(&self, node_type: &NodeType) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(node_type).cloned()
    }

    pub fn contains(&self, node_type: &NodeType) -> bool {
        self.handlers.contains_key(node_type)
    }

    /// Registered node types, sorted
    pub fn node_types(&self) -> Vec<NodeType> {
        let mut types: Vec<_> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("node_types", &self.node_types())
            .finish()
    }
}
