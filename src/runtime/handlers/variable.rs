/// Data-shaping nodes: set a run variable, or build a new value from a template tree

use crate::runtime::context::HandlerContext;
use crate::runtime::error::NodeError;
use crate::runtime::handler::NodeHandler;
use crate::workflow::types::{Node, NodeConfig};
use async_trait::async_trait;
use serde_json::Value;

pub struct SetVariableHandler;

#[async_trait]
impl NodeHandler for SetVariableHandler {
    async fn execute(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        let NodeConfig::SetVariable(config) = &node.config else {
            return Err(NodeError::config(format!("Node '{}' is not a set_variable node", node.id)));
        };

        if config.name.trim().is_empty() {
            return Err(NodeError::config(format!("Node '{}' has an empty variable name", node.id)));
        }

        let value = ctx.render_value(&config.value)?;
        tracing::debug!("📝 Variable '{}' = {}", config.name, value);
        ctx.set_variable(config.name.clone(), value.clone());

        let mut output = serde_json::Map::new();
        output.insert(config.name.clone(), value);
        Ok(Value::Object(output))
    }
}

pub struct TransformHandler;

#[async_trait]
impl NodeHandler for TransformHandler {
    async fn execute(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        let NodeConfig::Transform(config) = &node.config else {
            return Err(NodeError::config(format!("Node '{}' is not a transform node", node.id)));
        };

        ctx.render_value(&config.output)
    }
}
