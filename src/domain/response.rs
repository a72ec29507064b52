//! Pending-response descriptors.
//!
//! A step that yields control to an external task returns one of these
//! descriptors from dispatch; the engine parks the node on the matching
//! waiting status and resumes it when the described callbacks arrive.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Status;

/// Descriptor for a step waiting on plain asynchronous callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncExecutableResponse {
    /// Correlation ids the step expects completion notifications for.
    pub callback_ids: Vec<String>,
    /// Optional deadline after which the node is expired.
    #[serde(default)]
    pub timeout_millis: Option<u64>,
}

/// Descriptor for a step executing a chain of asynchronous callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncChainExecutableResponse {
    pub callback_id: String,
    /// Whether this link is the last one in the chain.
    pub chain_end: bool,
}

/// Descriptor for a step waiting on a remote task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskExecutableResponse {
    pub task_id: String,
    pub task_category: String,
}

/// Descriptor for a step executing a chain of remote tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChainExecutableResponse {
    pub task_id: String,
    pub task_category: String,
    /// Whether this link is the last one in the chain.
    pub chain_end: bool,
}

/// The four suspension modes a node can be parked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PendingMode {
    Async,
    AsyncChain,
    Task,
    TaskChain,
}

impl fmt::Display for PendingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PendingMode::Async => "ASYNC",
            PendingMode::AsyncChain => "ASYNC_CHAIN",
            PendingMode::Task => "TASK",
            PendingMode::TaskChain => "TASK_CHAIN",
        };
        f.write_str(name)
    }
}

/// A pending-response descriptor with exactly one active variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingResponse {
    Async(AsyncExecutableResponse),
    AsyncChain(AsyncChainExecutableResponse),
    Task(TaskExecutableResponse),
    TaskChain(TaskChainExecutableResponse),
}

impl PendingResponse {
    pub fn mode(&self) -> PendingMode {
        match self {
            PendingResponse::Async(_) => PendingMode::Async,
            PendingResponse::AsyncChain(_) => PendingMode::AsyncChain,
            PendingResponse::Task(_) => PendingMode::Task,
            PendingResponse::TaskChain(_) => PendingMode::TaskChain,
        }
    }

    /// The waiting status a node carrying this descriptor is parked on.
    pub fn waiting_status(&self) -> Status {
        match self {
            PendingResponse::Async(_) | PendingResponse::AsyncChain(_) => Status::AsyncWaiting,
            PendingResponse::Task(_) | PendingResponse::TaskChain(_) => Status::TaskWaiting,
        }
    }

    /// Correlation ids whose completion notifications resume the node.
    pub fn callback_ids(&self) -> Vec<&str> {
        match self {
            PendingResponse::Async(resp) => {
                resp.callback_ids.iter().map(String::as_str).collect()
            }
            PendingResponse::AsyncChain(resp) => vec![resp.callback_id.as_str()],
            PendingResponse::Task(resp) => vec![resp.task_id.as_str()],
            PendingResponse::TaskChain(resp) => vec![resp.task_id.as_str()],
        }
    }
}
