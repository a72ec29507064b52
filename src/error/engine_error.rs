//! Engine-level error types.

use super::{RegistryError, ResolveError};
use crate::domain::{PendingMode, Status};
use thiserror::Error;

/// Errors raised while advancing a plan execution.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Node execution not found: {0}")]
    NodeNotFound(String),
    #[error("Plan execution not found: {0}")]
    PlanNotFound(String),
    #[error("Plan node not found: {0}")]
    PlanNodeNotFound(String),
    #[error(
        "Stale interrupt for node execution {node_execution_id}: \
         package carries {carried:?} but node is suspended on {actual}"
    )]
    StaleInterrupt {
        node_execution_id: String,
        carried: PendingMode,
        actual: String,
    },
    #[error("Status transition rejected for {node_execution_id}: {from:?} -> {to:?}")]
    StatusTransitionRejected {
        node_execution_id: String,
        from: Status,
        to: Status,
    },
    #[error("Step execution error: {0}")]
    StepFailure(String),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolveError),
    #[error("Internal error: {0}")]
    Internal(String),
}
