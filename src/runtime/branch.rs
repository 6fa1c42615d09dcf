/// Branch selection for condition and switch nodes
///
/// A branching node's output names the handles that stay live. Outgoing
/// edges whose `source_handle` is not among them are pruned for the current
/// run only; the persisted graph is never touched.

use crate::runtime::error::NodeError;
use crate::workflow::types::{Edge, Node, NodeType};
use serde_json::Value;
use std::collections::BTreeSet;

/// Handles selected by a completed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveHandles {
    /// Non-branching node: every outgoing edge is live
    All,
    /// Branching node: only edges with one of these handles are live
    Only(BTreeSet<String>),
}

impl LiveHandles {
    pub fn is_live(&self, edge: &Edge) -> bool {
        match self {
            LiveHandles::All => true,
            LiveHandles::Only(handles) => edge
                .source_handle
                .as_deref()
                .is_some_and(|handle| handles.contains(handle)),
        }
    }
}

/// Work out which outgoing handles of `node` are live given its output
///
/// Condition nodes produce `{ "result": bool }` and select exactly one of
/// "true"/"false". Switch nodes produce `{ "handles": [..] }` and may select
/// any number of handles, including none.
pub fn live_successor_handles(node: &Node, output: &Value) -> Result<LiveHandles, NodeError> {
    let node_type = node.node_type();
    if !node_type.is_branching() {
        return Ok(LiveHandles::All);
    }

    match node_type {
        NodeType::Condition => {
            let result = output.get("result").and_then(Value::as_bool).ok_or_else(|| {
                NodeError::config(format!("Condition node '{}' did not produce a boolean 'result'", node.id))
            })?;
            Ok(LiveHandles::Only(BTreeSet::from([result.to_string()])))
        }
        NodeType::Switch => {
            let handles = output
                .get("handles")
                .and_then(Value::as_array)
                .ok_or_else(|| NodeError::config(format!("Switch node '{}' did not produce 'handles'", node.id)))?;

            handles
                .iter()
                .map(|handle| {
                    handle.as_str().map(str::to_string).ok_or_else(|| {
                        NodeError::config(format!("Switch node '{}' produced a non-string handle: {}", node.id, handle))
                    })
                })
                .collect::<Result<BTreeSet<_>, _>>()
                .map(LiveHandles::Only)
        }
        _ => Ok(LiveHandles::All),
    }
}
