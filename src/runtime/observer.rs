/// Live progress callbacks for a run
///
/// The engine invokes these synchronously, in execution order, on the task
/// driving the run. Implementations should return quickly.

use crate::runtime::context::NodeOutput;
use crate::runtime::error::NodeError;
use serde::Serialize;
use std::sync::Mutex;

pub trait ExecutionObserver: Send + Sync {
    /// Called before the node's handler is invoked
    fn on_node_start(&self, _node_id: &str) {}

    fn on_node_complete(&self, _node_id: &str, _output: &NodeOutput) {}

    fn on_node_error(&self, _node_id: &str, _error: &NodeError) {}

    /// Called when branch pruning removes every incoming dependency of a node
    fn on_node_skipped(&self, _node_id: &str) {}
}

/// Observer that ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ObservedEvent {
    Started { node_id: String },
    Completed { node_id: String, output: NodeOutput },
    Failed { node_id: String, error: NodeError },
    Skipped { node_id: String },
}

/// Observer that keeps every callback in order, for progress replay and tests
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    fn push(&self, event: ObservedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ExecutionObserver for RecordingObserver {
    fn on_node_start(&self, node_id: &str) {
        self.push(ObservedEvent::Started { node_id: node_id.to_string() });
    }

    fn on_node_complete(&self, node_id: &str, output: &NodeOutput) {
        self.push(ObservedEvent::Completed { node_id: node_id.to_string(), output: output.clone() });
    }

    fn on_node_error(&self, node_id: &str, error: &NodeError) {
        self.push(ObservedEvent::Failed { node_id: node_id.to_string(), error: error.clone() });
    }

    fn on_node_skipped(&self, node_id: &str) {
        self.push(ObservedEvent::Skipped { node_id: node_id.to_string() });
    }
}
