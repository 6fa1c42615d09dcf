/// Per-run state: node outputs and named variables
///
/// A [`RunContext`] is owned by exactly one run. The engine is the only
/// writer of outputs; handlers see the context through [`HandlerContext`],
/// which limits what they can read and lets them set variables.

use crate::runtime::error::{ErrorKind, NodeError};
use crate::runtime::template;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Outcome of a single node execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    #[serde(flatten)]
    pub status: NodeStatus,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeStatus {
    Success { value: Value },
    Error { kind: ErrorKind, message: String },
}

impl NodeOutput {
    pub fn success(value: Value, duration_ms: u64) -> Self {
        Self { status: NodeStatus::Success { value }, duration_ms }
    }

    pub fn error(error: &NodeError, duration_ms: u64) -> Self {
        Self {
            status: NodeStatus::Error { kind: error.kind(), message: error.to_string() },
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, NodeStatus::Success { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.status {
            NodeStatus::Success { value } => Some(value),
            NodeStatus::Error { .. } => None,
        }
    }
}

/// Outputs of completed nodes plus the run-wide variable store
///
/// Variables are not scoped per node: a later write to the same name
/// replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub outputs: BTreeMap<String, NodeOutput>,
    pub variables: BTreeMap<String, Value>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node's output; each node id is written once per run
    pub fn record_output(&mut self, node_id: &str, output: NodeOutput) {
        debug_assert!(!self.outputs.contains_key(node_id), "output for '{}' written twice", node_id);
        self.outputs.insert(node_id.to_string(), output);
    }

    pub fn get_output(&self, node_id: &str) -> Option<&NodeOutput> {
        self.outputs.get(node_id)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}

/// The view of a run that a handler receives while executing one node
///
/// Outputs of predecessors reached only through pruned edges are hidden,
/// so a node never reads data from a branch that was not selected.
pub struct HandlerContext<'a> {
    run: &'a mut RunContext,
    run_id: &'a str,
    payload: &'a Value,
    inputs: Vec<String>,
    hidden: HashSet<String>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        run: &'a mut RunContext,
        run_id: &'a str,
        payload: &'a Value,
        inputs: Vec<String>,
        hidden: HashSet<String>,
    ) -> Self {
        Self { run, run_id, payload, inputs, hidden }
    }

    pub fn run_id(&self) -> &str {
        self.run_id
    }

    /// Payload the run was started with (webhook body, API request, ...)
    pub fn payload(&self) -> &Value {
        self.payload
    }

    /// Successful output of a visible node
    pub fn output(&self, node_id: &str) -> Option<&Value> {
        if self.hidden.contains(node_id) {
            return None;
        }
        self.run.get_output(node_id).and_then(NodeOutput::value)
    }

    /// Ids of live predecessors, in edge order, without repeats
    pub fn input_ids(&self) -> &[String] {
        &self.inputs
    }

    /// Outputs of live predecessors keyed by node id
    pub fn inputs(&self) -> BTreeMap<String, Value> {
        self.inputs
            .iter()
            .filter_map(|id| self.output(id).map(|value| (id.clone(), value.clone())))
            .collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.run.get_variable(name)
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.run.variables
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.run.set_variable(name, value);
    }

    /// Render `{{ref}}` tokens inside a string
    pub fn render(&self, text: &str) -> Result<String, NodeError> {
        template::render(text, self)
    }

    /// Render every string inside a JSON value tree
    pub fn render_value(&self, value: &Value) -> Result<Value, NodeError> {
        template::render_value(value, self)
    }
}
