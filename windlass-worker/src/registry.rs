//! Workflow registry: the factory collaborator that resolves workflow
//! types to definitions.

use dashmap::DashMap;
use dyn_clone::DynClone;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use windlass_core::{EngineError, EngineResult};
use windlass_proto::WorkflowType;
use windlass_workflow::{WorkflowContext, WorkflowError};

/// A workflow definition: the deterministic, replay-safe body of a
/// workflow type. Query handlers are registered on the context inside
/// `execute`.
pub trait WorkflowDefinition: Send + Sync + DynClone {
    fn execute(
        &self,
        ctx: WorkflowContext,
        input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>>;
}

dyn_clone::clone_trait_object!(WorkflowDefinition);

/// Factory collaborator: resolves a workflow type to a definition and
/// reports whether tasks for unknown types should be left for another
/// worker instead of failed.
pub trait WorkflowFactory: Send + Sync {
    fn create_workflow(
        &self,
        workflow_type: &WorkflowType,
    ) -> EngineResult<Box<dyn WorkflowDefinition>>;

    fn supports_unknown_types(&self) -> bool;
}

/// Registry-backed workflow factory using DashMap for concurrent access
pub struct WorkflowRegistry {
    workflows: Arc<DashMap<String, Box<dyn WorkflowDefinition>>>,
    tolerate_unknown_types: bool,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(DashMap::new()),
            tolerate_unknown_types: false,
        }
    }

    /// Mark unknown workflow types as tolerable: the surrounding worker is
    /// expected to skip their tasks rather than fail them.
    pub fn tolerate_unknown_types(mut self, tolerate: bool) -> Self {
        self.tolerate_unknown_types = tolerate;
        self
    }

    pub fn register_workflow(&self, name: &str, workflow: Box<dyn WorkflowDefinition>) {
        self.workflows.insert(name.to_string(), workflow);
    }

    pub fn registered_workflows(&self) -> Vec<String> {
        self.workflows.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for WorkflowRegistry {
    fn clone(&self) -> Self {
        Self {
            workflows: Arc::clone(&self.workflows),
            tolerate_unknown_types: self.tolerate_unknown_types,
        }
    }
}

impl WorkflowFactory for WorkflowRegistry {
    fn create_workflow(
        &self,
        workflow_type: &WorkflowType,
    ) -> EngineResult<Box<dyn WorkflowDefinition>> {
        self.workflows
            .get(&workflow_type.name)
            .map(|entry| entry.clone())
            .ok_or_else(|| EngineError::UnknownWorkflowType(workflow_type.name.clone()))
    }

    fn supports_unknown_types(&self) -> bool {
        self.tolerate_unknown_types
    }
}
