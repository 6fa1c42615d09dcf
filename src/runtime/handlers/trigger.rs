/// Trigger node: the entry point of a run
///
/// Emits the payload the run was started with (webhook body, API request
/// body). Without one it falls back to the static `data` in its config.

use crate::runtime::context::HandlerContext;
use crate::runtime::error::NodeError;
use crate::runtime::handler::NodeHandler;
use crate::workflow::types::{Node, NodeConfig};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct TriggerHandler;

#[async_trait]
impl NodeHandler for TriggerHandler {
    async fn execute(&self, node: &Node, ctx: &mut HandlerContext<'_>) -> Result<Value, NodeError> {
        let NodeConfig::Trigger(config) = &node.config else {
            return Err(NodeError::config(format!("Node '{}' is not a trigger node", node.id)));
        };

        if !ctx.payload().is_null() {
            return Ok(ctx.payload().clone());
        }

        Ok(config.data.clone().unwrap_or_else(|| json!({})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::context::RunContext;
    use crate::workflow::types::TriggerConfig;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_payload_wins_over_static_data() {
        let node = Node::new(
            "start",
            NodeConfig::Trigger(TriggerConfig { data: Some(json!({ "x": 0 })), ..Default::default() }),
        );

        let mut run = RunContext::new();
        let payload = json!({ "x": 1 });
        let mut ctx = HandlerContext::new(&mut run, "r", &payload, vec![], HashSet::new());
        assert_eq!(TriggerHandler.execute(&node, &mut ctx).await.unwrap(), json!({ "x": 1 }));

        let empty = Value::Null;
        let mut ctx = HandlerContext::new(&mut run, "r", &empty, vec![], HashSet::new());
        assert_eq!(TriggerHandler.execute(&node, &mut ctx).await.unwrap(), json!({ "x": 0 }));
    }
}
