//! Persistence contracts for plan and node executions.
//!
//! The backing store owns document layout and provides atomic per-node
//! compare-and-set status semantics; the engine implements no locking of its
//! own over node state. The in-memory implementations back tests and
//! embeddings that do not bring a real store.

use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::{NodeExecution, PlanExecution, Status};

/// Store of node execution documents.
pub trait NodeExecutionStore: Send + Sync {
    fn save(&self, node: NodeExecution);

    fn fetch(&self, node_execution_id: &str) -> Option<NodeExecution>;

    /// Apply `mutator` to the document under the store's atomicity guarantees.
    ///
    /// Returns the updated document, or `None` when it does not exist.
    fn update(
        &self,
        node_execution_id: &str,
        mutator: &mut dyn FnMut(&mut NodeExecution),
    ) -> Option<NodeExecution>;

    /// Compare-and-set the node's status.
    ///
    /// The transition is applied only when the current status is in
    /// `allowed_from`; returns the updated document on success, `None` when
    /// the precondition failed or the document is missing.
    fn update_status(
        &self,
        node_execution_id: &str,
        to: Status,
        allowed_from: &[Status],
    ) -> Option<NodeExecution>;
}

/// Store of plan execution documents.
pub trait PlanExecutionStore: Send + Sync {
    fn save(&self, plan: PlanExecution);

    fn fetch(&self, plan_execution_id: &str) -> Option<PlanExecution>;

    /// Update the plan-level aggregate status.
    ///
    /// A missing plan is treated as already terminal: logged, never an error.
    fn update_status(&self, plan_execution_id: &str, status: Status);
}

/// DashMap-backed node execution store.
pub struct InMemoryNodeExecutionStore {
    nodes: DashMap<String, NodeExecution>,
}

impl InMemoryNodeExecutionStore {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
        }
    }
}

impl Default for InMemoryNodeExecutionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeExecutionStore for InMemoryNodeExecutionStore {
    fn save(&self, node: NodeExecution) {
        self.nodes.insert(node.uuid.clone(), node);
    }

    fn fetch(&self, node_execution_id: &str) -> Option<NodeExecution> {
        self.nodes.get(node_execution_id).map(|entry| entry.clone())
    }

    fn update(
        &self,
        node_execution_id: &str,
        mutator: &mut dyn FnMut(&mut NodeExecution),
    ) -> Option<NodeExecution> {
        let mut entry = self.nodes.get_mut(node_execution_id)?;
        mutator(entry.value_mut());
        Some(entry.clone())
    }

    fn update_status(
        &self,
        node_execution_id: &str,
        to: Status,
        allowed_from: &[Status],
    ) -> Option<NodeExecution> {
        let mut entry = self.nodes.get_mut(node_execution_id)?;
        if !allowed_from.contains(&entry.status) {
            return None;
        }
        entry.status = to;
        Some(entry.clone())
    }
}

/// DashMap-backed plan execution store.
pub struct InMemoryPlanExecutionStore {
    plans: DashMap<String, PlanExecution>,
}

impl InMemoryPlanExecutionStore {
    pub fn new() -> Self {
        Self {
            plans: DashMap::new(),
        }
    }
}

impl Default for InMemoryPlanExecutionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanExecutionStore for InMemoryPlanExecutionStore {
    fn save(&self, plan: PlanExecution) {
        self.plans.insert(plan.uuid.clone(), plan);
    }

    fn fetch(&self, plan_execution_id: &str) -> Option<PlanExecution> {
        self.plans.get(plan_execution_id).map(|entry| entry.clone())
    }

    fn update_status(&self, plan_execution_id: &str, status: Status) {
        match self.plans.get_mut(plan_execution_id) {
            Some(mut entry) => entry.status = status,
            None => {
                tracing::warn!(
                    plan_execution_id,
                    ?status,
                    "plan execution not found while updating status; treating as already terminal"
                );
            }
        }
    }
}

/// Shared handles used by the components that observe and mutate executions.
pub type SharedNodeStore = Arc<dyn NodeExecutionStore>;
pub type SharedPlanStore = Arc<dyn PlanExecutionStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Ambiance, PlanNode, StepType};

    fn node(uuid: &str) -> NodeExecution {
        NodeExecution::new(
            uuid,
            Ambiance::new("plan-1", "a", "o", "p"),
            PlanNode::new("setup-1", "Build", "build", StepType::new("SHELL")),
            0,
        )
    }

    #[test]
    fn test_update_status_honours_precondition() {
        let store = InMemoryNodeExecutionStore::new();
        store.save(node("n1"));

        let updated = store.update_status("n1", Status::Running, &[Status::Queued]);
        assert_eq!(updated.unwrap().status, Status::Running);

        // Second identical transition fails the compare-and-set.
        assert!(store
            .update_status("n1", Status::Running, &[Status::Queued])
            .is_none());
    }

    #[test]
    fn test_update_status_missing_node() {
        let store = InMemoryNodeExecutionStore::new();
        assert!(store
            .update_status("ghost", Status::Running, Status::finalizable_statuses())
            .is_none());
    }

    #[test]
    fn test_plan_store_missing_plan_is_silent() {
        let store = InMemoryPlanExecutionStore::new();
        // Must not panic or error.
        store.update_status("ghost", Status::Aborted);
        assert!(store.fetch("ghost").is_none());
    }

    #[test]
    fn test_node_update_mutator() {
        let store = InMemoryNodeExecutionStore::new();
        store.save(node("n1"));
        let updated = store.update("n1", &mut |doc| {
            doc.retries += 1;
            doc.failure_message = Some("timeout".into());
        });
        assert_eq!(updated.unwrap().retries, 1);
    }
}
