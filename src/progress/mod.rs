//! Async progress tracking.
//!
//! While a node's remote task is outstanding, progress callbacks report a
//! status-carrying payload. Only the latest value per node is kept; progress
//! is advisory until an authoritative completion event finalizes the node.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::domain::Status;

/// Status payload reported by a progress callback for a waiting task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncProgressData {
    /// New status of the node; `NoOp` means "no status change yet".
    pub status: Status,
}

impl AsyncProgressData {
    pub fn new(status: Status) -> Self {
        Self { status }
    }
}

impl Default for AsyncProgressData {
    fn default() -> Self {
        Self {
            status: Status::NoOp,
        }
    }
}

/// Latest progress value per node execution, last-write-wins.
///
/// Callbacks for the same node may race; that is acceptable because the
/// stored value is advisory and overwritten on every tick.
pub struct ProgressTracker {
    latest: DashMap<String, AsyncProgressData>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            latest: DashMap::new(),
        }
    }

    /// Record a progress tick, overwriting any previous value for the node.
    pub fn update(&self, node_execution_id: impl Into<String>, data: AsyncProgressData) {
        self.latest.insert(node_execution_id.into(), data);
    }

    /// Latest progress for the node, if any tick arrived.
    pub fn latest(&self, node_execution_id: &str) -> Option<AsyncProgressData> {
        self.latest.get(node_execution_id).map(|entry| *entry.value())
    }

    /// Drop tracked progress once the node is finalized.
    pub fn clear(&self, node_execution_id: &str) {
        self.latest.remove(node_execution_id);
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
