//! Node status update observers.
//!
//! Handlers react to a node reaching a specific status and perform exactly
//! the side effect documented for that status. Delivery is synchronous and
//! at-least-once: a duplicate status event re-invokes its handlers, so a
//! handler that must not double-apply has to de-duplicate itself.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::Status;
use crate::engine::store::{PlanExecutionStore, SharedPlanStore};

/// Transient description of a node reaching a new status.
///
/// Produced by the status-transition subsystem, consumed synchronously by
/// registered handlers, discarded after dispatch.
#[derive(Debug, Clone)]
pub struct NodeUpdateInfo {
    pub node_execution_id: String,
    pub plan_execution_id: String,
    pub status: Status,
    pub updated_at: DateTime<Utc>,
}

impl NodeUpdateInfo {
    pub fn new(
        node_execution_id: impl Into<String>,
        plan_execution_id: impl Into<String>,
        status: Status,
    ) -> Self {
        Self {
            node_execution_id: node_execution_id.into(),
            plan_execution_id: plan_execution_id.into(),
            status,
            updated_at: Utc::now(),
        }
    }
}

/// Observer invoked when a node reaches the status it is registered for.
pub trait NodeStatusUpdateHandler: Send + Sync {
    fn handle_node_status_update(&self, info: &NodeUpdateInfo);
}

/// Dispatch table from status to its ordered handlers.
///
/// Handlers for the same status run in registration order; handlers for
/// different statuses are independent and may run concurrently across nodes.
pub struct NodeStatusUpdateObserver {
    handlers: RwLock<HashMap<Status, Vec<Arc<dyn NodeStatusUpdateHandler>>>>,
}

impl NodeStatusUpdateObserver {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, status: Status, handler: Arc<dyn NodeStatusUpdateHandler>) {
        self.handlers.write().entry(status).or_default().push(handler);
    }

    /// Invoke the handlers registered for `info.status`, in order.
    pub fn dispatch(&self, info: &NodeUpdateInfo) {
        let handlers = {
            let map = self.handlers.read();
            map.get(&info.status).cloned().unwrap_or_default()
        };
        for handler in handlers {
            handler.handle_node_status_update(info);
        }
    }
}

impl Default for NodeStatusUpdateObserver {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler for nodes entering `INPUT_WAITING`.
pub struct InputWaitingStatusUpdate {
    plan_store: SharedPlanStore,
}

impl InputWaitingStatusUpdate {
    pub fn new(plan_store: SharedPlanStore) -> Self {
        Self { plan_store }
    }
}

impl NodeStatusUpdateHandler for InputWaitingStatusUpdate {
    fn handle_node_status_update(&self, info: &NodeUpdateInfo) {
        // Updating only the plan status and not parent node executions.
        self.plan_store
            .update_status(&info.plan_execution_id, Status::InputWaiting);
    }
}
