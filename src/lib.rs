/// Nodeway: deterministic node-graph workflow execution engine
///
/// This library provides the workflow execution engine (ordering, branch
/// pruning, handler dispatch) together with definition storage, a
/// hot-reload registry and a minimal HTTP trigger surface.

// Core configuration and setup
pub mod config;

// Workflow management layer - handles workflow definitions, storage, and registry
pub mod workflow;

// Runtime execution engine - graph ordering, handlers and the run loop
pub mod runtime;

// HTTP API layer - workflow CRUD, run triggers and cancellation
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use runtime::{ExecutionEngine, ExecutionResult, HandlerRegistry, NodeHandler, RunOptions};
pub use server::start_server;
pub use workflow::{Edge, Node, NodeConfig, NodeType, Workflow};
