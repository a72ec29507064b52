//! Plan definitions and execution documents.
//!
//! A [`Plan`] is the static directed definition of what to run; a
//! [`PlanExecution`] is one run of it, and a [`NodeExecution`] is one step
//! instance within that run. Execution documents are owned by the backing
//! store; the engine manipulates them only through the store's atomic
//! operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::registry::AdviserObtainment;

use super::{Ambiance, PendingResponse, Status};

/// Identifier of a step implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepType(String);

impl StepType {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn kind(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One node in a plan definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanNode {
    pub uuid: String,
    pub name: String,
    pub identifier: String,
    pub step_type: StepType,
    /// Opaque parameters handed to the step on dispatch.
    #[serde(default)]
    pub step_parameters: Value,
    /// Advisers consulted, in order, once the node concludes.
    #[serde(default)]
    pub adviser_obtainments: Vec<AdviserObtainment>,
}

impl PlanNode {
    pub fn new(
        uuid: impl Into<String>,
        name: impl Into<String>,
        identifier: impl Into<String>,
        step_type: StepType,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            identifier: identifier.into(),
            step_type,
            step_parameters: Value::Null,
            adviser_obtainments: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.step_parameters = parameters;
        self
    }

    pub fn with_adviser(mut self, obtainment: AdviserObtainment) -> Self {
        self.adviser_obtainments.push(obtainment);
        self
    }
}

/// The static definition of what to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub uuid: String,
    pub start_node_id: String,
    pub nodes: Vec<PlanNode>,
}

impl Plan {
    pub fn new(uuid: impl Into<String>, start_node_id: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            start_node_id: start_node_id.into(),
            nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: PlanNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn node(&self, uuid: &str) -> Option<&PlanNode> {
        self.nodes.iter().find(|node| node.uuid == uuid)
    }
}

/// One step instance within a plan execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecution {
    pub uuid: String,
    pub ambiance: Ambiance,
    pub plan_node: PlanNode,
    pub status: Status,
    /// Present exactly while the node is suspended on an external event.
    pub pending_response: Option<PendingResponse>,
    pub failure_message: Option<String>,
    /// Number of retries already spent on this node.
    pub retries: u32,
    pub start_ts: i64,
    pub end_ts: Option<i64>,
}

impl NodeExecution {
    pub fn new(uuid: impl Into<String>, ambiance: Ambiance, plan_node: PlanNode, now: i64) -> Self {
        Self {
            uuid: uuid.into(),
            ambiance,
            plan_node,
            status: Status::Queued,
            pending_response: None,
            failure_message: None,
            retries: 0,
            start_ts: now,
            end_ts: None,
        }
    }
}

/// One run of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanExecution {
    pub uuid: String,
    pub plan_id: String,
    pub status: Status,
    pub start_ts: i64,
    pub end_ts: Option<i64>,
}

impl PlanExecution {
    pub fn new(uuid: impl Into<String>, plan_id: impl Into<String>, now: i64) -> Self {
        Self {
            uuid: uuid.into(),
            plan_id: plan_id.into(),
            status: Status::Running,
            start_ts: now,
            end_ts: None,
        }
    }
}
