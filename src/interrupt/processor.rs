//! Interrupt processing.
//!
//! The processor consumes an [`InterruptPackage`] by value, locates the node
//! by ambiance, validates the node's suspended mode against the package's
//! descriptor kind, and applies the requested transition. Delivery retry is
//! owned by the task orchestration layer; once delivered, a package is
//! processed at most once.

use serde_json::Value;
use std::sync::Arc;

use crate::domain::{NodeExecution, Status};
use crate::engine::context::EngineContext;
use crate::engine::store::{
    NodeExecutionStore, PlanExecutionStore, SharedNodeStore, SharedPlanStore,
};
use crate::engine::Step;
use crate::error::{EngineError, EngineResult};
use crate::observers::{NodeStatusUpdateObserver, NodeUpdateInfo};
use crate::registry::StepRegistry;

use super::{InterruptPackage, InterruptType};

pub struct InterruptProcessor {
    node_store: SharedNodeStore,
    plan_store: SharedPlanStore,
    observer: Arc<NodeStatusUpdateObserver>,
    step_registry: Arc<StepRegistry>,
    context: EngineContext,
}

impl InterruptProcessor {
    pub fn new(
        node_store: SharedNodeStore,
        plan_store: SharedPlanStore,
        observer: Arc<NodeStatusUpdateObserver>,
        step_registry: Arc<StepRegistry>,
        context: EngineContext,
    ) -> Self {
        Self {
            node_store,
            plan_store,
            observer,
            step_registry,
            context,
        }
    }

    /// Process one interrupt against the node the package's ambiance names.
    pub async fn process(
        &self,
        interrupt_type: InterruptType,
        package: InterruptPackage,
    ) -> EngineResult<()> {
        let node_execution_id = package
            .ambiance()
            .node_execution_id()
            .ok_or_else(|| {
                EngineError::Internal("interrupt package ambiance carries no node level".into())
            })?
            .to_string();
        let node = self
            .node_store
            .fetch(&node_execution_id)
            .ok_or_else(|| EngineError::NodeNotFound(node_execution_id.clone()))?;

        let result = match interrupt_type {
            InterruptType::Abort => self.abort(&node, &package).await,
            InterruptType::Pause => self.pause(&node, &package),
            InterruptType::Resume => self.resume(&node, &package),
            InterruptType::Retry => self.retry(&node, &package),
        };

        match &result {
            Ok(()) => {
                tracing::info!(
                    node_execution_id = %node_execution_id,
                    interrupt = ?interrupt_type,
                    user_marked = package.is_user_marked(),
                    "interrupt processed"
                );
            }
            Err(err) => {
                tracing::warn!(
                    node_execution_id = %node_execution_id,
                    interrupt = ?interrupt_type,
                    error = %err,
                    "interrupt processing failed"
                );
            }
        }
        result
    }

    /// Reject packages whose descriptor kind does not match the node's
    /// suspended mode.
    fn validate_package(node: &NodeExecution, package: &InterruptPackage) -> EngineResult<()> {
        match &node.pending_response {
            Some(pending) if pending.mode() == package.mode() => Ok(()),
            Some(pending) => Err(EngineError::StaleInterrupt {
                node_execution_id: node.uuid.clone(),
                carried: package.mode(),
                actual: pending.mode().to_string(),
            }),
            None => Err(EngineError::StaleInterrupt {
                node_execution_id: node.uuid.clone(),
                carried: package.mode(),
                actual: format!("{:?}", node.status),
            }),
        }
    }

    async fn abort(&self, node: &NodeExecution, package: &InterruptPackage) -> EngineResult<()> {
        if node.status == Status::Aborted {
            // Idempotent at the node level.
            tracing::debug!(node_execution_id = %node.uuid, "node already aborted");
            return Ok(());
        }
        Self::validate_package(node, package)?;

        self.node_store
            .update_status(
                &node.uuid,
                Status::Discontinuing,
                Status::finalizable_statuses(),
            )
            .ok_or(EngineError::StatusTransitionRejected {
                node_execution_id: node.uuid.clone(),
                from: node.status,
                to: Status::Discontinuing,
            })?;

        // Give the step a chance to cancel the outstanding work.
        if let Ok(step) = self.step_registry.obtain(&node.plan_node.step_type) {
            let parameters = package.parameters().cloned().unwrap_or(Value::Null);
            step.handle_abort(package.ambiance(), &parameters, package.pending())
                .await;
        }

        let now = self.context.time_provider.now_millis();
        self.node_store
            .update(&node.uuid, &mut |doc| {
                doc.status = Status::Aborted;
                doc.pending_response = None;
                doc.end_ts = Some(now);
            })
            .ok_or_else(|| EngineError::NodeNotFound(node.uuid.clone()))?;

        let plan_execution_id = package.ambiance().plan_execution_id();
        self.observer.dispatch(&NodeUpdateInfo::new(
            &node.uuid,
            plan_execution_id,
            Status::Aborted,
        ));
        self.plan_store.update_status(plan_execution_id, Status::Aborted);
        Ok(())
    }

    fn pause(&self, node: &NodeExecution, package: &InterruptPackage) -> EngineResult<()> {
        Self::validate_package(node, package)?;
        self.node_store
            .update_status(&node.uuid, Status::Paused, Status::waiting_statuses())
            .ok_or(EngineError::StatusTransitionRejected {
                node_execution_id: node.uuid.clone(),
                from: node.status,
                to: Status::Paused,
            })?;

        let plan_execution_id = package.ambiance().plan_execution_id();
        self.observer.dispatch(&NodeUpdateInfo::new(
            &node.uuid,
            plan_execution_id,
            Status::Paused,
        ));
        self.plan_store.update_status(plan_execution_id, Status::Paused);
        Ok(())
    }

    fn resume(&self, node: &NodeExecution, package: &InterruptPackage) -> EngineResult<()> {
        Self::validate_package(node, package)?;
        // Restore the waiting status the pending descriptor parked the node on.
        let waiting = package.pending().waiting_status();
        self.node_store
            .update_status(&node.uuid, waiting, &[Status::Paused])
            .ok_or(EngineError::StatusTransitionRejected {
                node_execution_id: node.uuid.clone(),
                from: node.status,
                to: waiting,
            })?;

        let plan_execution_id = package.ambiance().plan_execution_id();
        self.observer
            .dispatch(&NodeUpdateInfo::new(&node.uuid, plan_execution_id, waiting));
        self.plan_store.update_status(plan_execution_id, Status::Running);
        Ok(())
    }

    fn retry(&self, node: &NodeExecution, package: &InterruptPackage) -> EngineResult<()> {
        Self::validate_package(node, package)?;
        self.node_store
            .update(&node.uuid, &mut |doc| {
                doc.status = Status::Queued;
                doc.pending_response = None;
                doc.failure_message = None;
                doc.end_ts = None;
                doc.retries += 1;
            })
            .ok_or_else(|| EngineError::NodeNotFound(node.uuid.clone()))?;

        self.observer.dispatch(&NodeUpdateInfo::new(
            &node.uuid,
            package.ambiance().plan_execution_id(),
            Status::Queued,
        ));
        Ok(())
    }
}
