/// Error taxonomy for workflow runs
///
/// Structural errors come out of graph ordering before any node runs.
/// Node errors are returned by handlers (or synthesised by the engine for
/// timeouts and unknown node types). A run failure wraps whichever one
/// terminated the run, or records that the run was cancelled.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Problems with the shape of the graph itself
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphError {
    #[error("Duplicate node id: {node_id}")]
    DuplicateNode { node_id: String },

    #[error("Edge '{edge_id}' references unknown node: {node_id}")]
    UnknownNode { edge_id: String, node_id: String },

    #[error("Workflow contains a cycle through nodes: {}", unresolved.join(", "))]
    Cycle { unresolved: Vec<String> },
}

/// Coarse classification used by callers deciding whether a retry makes sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Deterministic, retrying the same run fails identically
    Config,
    /// I/O or provider failure, a retry of the whole run may succeed
    Transient,
}

/// Failure of a single node
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Timeout: node execution exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl NodeError {
    pub fn config(message: impl Into<String>) -> Self {
        NodeError::Config(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        NodeError::Transient(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::Config(_) => ErrorKind::Config,
            NodeError::Transient(_) | NodeError::Timeout { .. } => ErrorKind::Transient,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::Config(format!("Serialization error: {}", e))
    }
}

/// Terminal reason for a failed run
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RunFailure {
    #[error("Structural error: {error}")]
    Structural { error: GraphError },

    #[error("Node '{node_id}' failed: {error}")]
    Node { node_id: String, error: NodeError },

    #[error("Run cancelled")]
    Cancelled,
}

impl RunFailure {
    /// Whether a higher layer may reasonably retry the whole run
    pub fn is_retryable(&self) -> bool {
        match self {
            RunFailure::Structural { .. } | RunFailure::Cancelled => false,
            RunFailure::Node { error, .. } => error.is_retryable(),
        }
    }
}

impl From<GraphError> for RunFailure {
    fn from(error: GraphError) -> Self {
        RunFailure::Structural { error }
    }
}
