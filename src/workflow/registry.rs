/// Hot-reload workflow registry using ArcSwap
///
/// Provides lock-free, atomic updates to the in-memory workflow registry.
/// Each workflow update swaps the entire registry pointer, so runs already
/// holding a compiled workflow finish on the definition they started with.

use crate::runtime::error::GraphError;
use crate::runtime::graph;
use crate::workflow::{
    storage::WorkflowStorage,
    types::{NodeConfig, TriggerKind, Workflow},
};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// Lock-free workflow registry for hot-reload capabilities
///
/// The registry is the single source of truth for runnable workflows in
/// memory; storage is only read on startup and reload.
#[derive(Debug)]
pub struct WorkflowRegistry {
    /// Key: workflow_id, Value: compiled workflow definition
    workflows: ArcSwap<HashMap<String, Arc<CompiledWorkflow>>>,

    /// Reference to persistent storage for reload operations
    storage: WorkflowStorage,
}

/// Workflow validated for execution, plus routing metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledWorkflow {
    /// Base workflow definition
    pub workflow: Workflow,

    /// Node ids in execution order
    pub order: Vec<String>,

    /// Ids of trigger nodes, in definition order
    pub trigger_ids: Vec<String>,

    /// Webhook paths declared by trigger nodes, normalized to a leading `/`
    pub webhook_paths: Vec<String>,
}

impl CompiledWorkflow {
    /// Validate the graph structure and extract trigger metadata
    pub fn compile(workflow: Workflow) -> Result<Self, GraphError> {
        let order = graph::order(&workflow.nodes, &workflow.edges)?;

        let mut trigger_ids = Vec::new();
        let mut webhook_paths = Vec::new();
        for node in &workflow.nodes {
            if let NodeConfig::Trigger(trigger) = &node.config {
                trigger_ids.push(node.id.clone());
                if let TriggerKind::Webhook { path } = &trigger.kind {
                    webhook_paths.push(normalize_path(path));
                }
            }
        }

        Ok(Self {
            workflow,
            order,
            trigger_ids,
            webhook_paths,
        })
    }

    pub fn handles_webhook(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.webhook_paths.iter().any(|candidate| *candidate == path)
    }
}

impl WorkflowRegistry {
    /// Create new registry instance with storage backend
    pub fn new(storage: WorkflowStorage) -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
            storage,
        }
    }

    pub fn storage(&self) -> &WorkflowStorage {
        &self.storage
    }

    /// Initialize registry by loading all workflows from storage
    ///
    /// Definitions that no longer compile are logged and left out rather than
    /// blocking startup.
    pub async fn init_from_storage(&self) -> Result<()> {
        let stored_workflows = self.storage.load_all_workflows().await?;

        let mut compiled_workflows = HashMap::with_capacity(stored_workflows.len());
        for (id, workflow) in stored_workflows {
            match CompiledWorkflow::compile(workflow) {
                Ok(compiled) => {
                    compiled_workflows.insert(id, Arc::new(compiled));
                }
                Err(e) => tracing::error!("❌ Skipping stored workflow '{}': {}", id, e),
            }
        }

        // Atomic swap of the entire registry
        self.workflows.store(Arc::new(compiled_workflows));

        tracing::info!("📊 Initialized workflow registry with {} workflows", self.workflows.load().len());

        Ok(())
    }

    /// Validate, persist and publish a workflow definition
    ///
    /// Structural errors are rejected before anything is written.
    pub async fn upsert(&self, workflow: Workflow) -> Result<Arc<CompiledWorkflow>> {
        let compiled = Arc::new(CompiledWorkflow::compile(workflow)?);
        self.storage.save_workflow(&compiled.workflow).await?;
        self.publish(Arc::clone(&compiled));

        tracing::info!("🔥 Hot-reloaded workflow: {} ({})", compiled.workflow.id, compiled.workflow.name);
        Ok(compiled)
    }

    /// Hot-reload a single workflow from storage
    pub async fn reload_workflow(&self, workflow_id: &str) -> Result<Arc<CompiledWorkflow>> {
        let workflow = self
            .storage
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Workflow not found: {}", workflow_id))?;

        let compiled = Arc::new(CompiledWorkflow::compile(workflow)?);
        self.publish(Arc::clone(&compiled));

        tracing::info!("🔄 Reloaded workflow from storage: {}", workflow_id);
        Ok(compiled)
    }

    /// Get a workflow by ID (lock-free read)
    pub fn get_workflow(&self, workflow_id: &str) -> Option<Arc<CompiledWorkflow>> {
        self.workflows.load().get(workflow_id).cloned()
    }

    /// List all active workflow IDs, sorted
    pub fn list_workflow_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workflows.load().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Find the workflow when one of its webhook triggers declares `path`
    pub fn find_webhook(&self, workflow_id: &str, path: &str) -> Option<Arc<CompiledWorkflow>> {
        self.get_workflow(workflow_id)
            .filter(|compiled| compiled.handles_webhook(path))
    }

    /// Delete a workflow from storage and the registry
    ///
    /// Returns false when storage had no such workflow.
    pub async fn remove_workflow(&self, workflow_id: &str) -> Result<bool> {
        let deleted = self.storage.delete_workflow(workflow_id).await?;

        self.workflows.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(workflow_id);
            next
        });

        if deleted {
            tracing::info!("🗑️ Removed workflow: {}", workflow_id);
        }
        Ok(deleted)
    }

    fn publish(&self, compiled: Arc<CompiledWorkflow>) {
        let id = compiled.workflow.id.clone();
        self.workflows.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(id.clone(), Arc::clone(&compiled));
            next
        });
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::{Edge, Node, TriggerConfig};

    fn webhook_workflow(id: &str, path: &str) -> Workflow {
        Workflow {
            id: id.to_string(),
            name: format!("{} workflow", id),
            nodes: vec![
                Node::new(
                    "hook",
                    NodeConfig::Trigger(TriggerConfig {
                        kind: TriggerKind::Webhook { path: path.to_string() },
                        data: None,
                    }),
                ),
                Node::new("manual", NodeConfig::Trigger(TriggerConfig::default())),
            ],
            edges: vec![Edge::new("e1", "hook", "manual")],
        }
    }

    async fn registry() -> WorkflowRegistry {
        WorkflowRegistry::new(WorkflowStorage::connect("sqlite::memory:").await.unwrap())
    }

    #[test]
    fn test_compile_extracts_triggers() {
        let compiled = CompiledWorkflow::compile(webhook_workflow("wf", "signup")).unwrap();
        assert_eq!(compiled.order, vec!["hook", "manual"]);
        assert_eq!(compiled.trigger_ids, vec!["hook", "manual"]);
        assert_eq!(compiled.webhook_paths, vec!["/signup"]);
        assert!(compiled.handles_webhook("/signup/"));
        assert!(!compiled.handles_webhook("/other"));
    }

    #[test]
    fn test_compile_rejects_cycle() {
        let mut workflow = webhook_workflow("wf", "/x");
        workflow.edges.push(Edge::new("back", "manual", "hook"));
        assert!(matches!(CompiledWorkflow::compile(workflow), Err(GraphError::Cycle { .. })));
    }

    #[tokio::test]
    async fn test_upsert_and_remove() {
        let registry = registry().await;
        registry.upsert(webhook_workflow("wf", "/signup")).await.unwrap();

        assert_eq!(registry.list_workflow_ids(), vec!["wf"]);
        assert!(registry.find_webhook("wf", "signup").is_some());
        assert!(registry.find_webhook("wf", "/nope").is_none());

        assert!(registry.remove_workflow("wf").await.unwrap());
        assert!(registry.get_workflow("wf").is_none());
        assert!(!registry.remove_workflow("wf").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_workflow_is_not_saved() {
        let registry = registry().await;
        let mut workflow = webhook_workflow("broken", "/x");
        workflow.edges.push(Edge::new("dangling", "hook", "ghost"));

        assert!(registry.upsert(workflow).await.is_err());
        assert!(registry.storage().get_workflow("broken").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_init_from_storage() {
        let storage = WorkflowStorage::connect("sqlite::memory:").await.unwrap();
        storage.save_workflow(&webhook_workflow("wf", "/a")).await.unwrap();

        let registry = WorkflowRegistry::new(storage);
        registry.init_from_storage().await.unwrap();
        assert!(registry.get_workflow("wf").is_some());
    }
}
