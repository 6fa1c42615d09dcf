/// Runtime Execution Engine
///
/// Sequential, fail-fast execution of workflow DAGs:
/// - Ordering the graph with Kahn's algorithm over petgraph
/// - Resolving branch outputs into pruned edges
/// - Dispatching nodes to registered handlers under a timeout
/// - Per-run context, `{{ref}}` templating and progress observers

// Typed engine errors (structural, node, run-level)
pub mod error;

// Graph construction and deterministic topological ordering
pub mod graph;

// Live-handle resolution for condition/switch outputs
pub mod branch;

// Per-run outputs/variables and the handler-facing view of them
pub mod context;

// `{{ref}}` substitution used by handler configs
pub mod template;

// NodeHandler trait and the type-keyed handler registry
pub mod handler;

// Built-in handlers
pub mod handlers;

pub mod observer;

// Core execution loop
pub mod engine;

// Active run tracking for cancellation
pub mod runs;

pub use context::{HandlerContext, NodeOutput, NodeStatus, RunContext};
pub use engine::{EngineConfig, ExecutionEngine, ExecutionResult, NodeResult, RunOptions, RunStatus};
pub use error::{ErrorKind, GraphError, NodeError, RunFailure};
pub use handler::{HandlerRegistry, NodeHandler};
pub use observer::{ExecutionObserver, NoopObserver, ObservedEvent, RecordingObserver};
pub use runs::{RunGuard, RunTracker};
