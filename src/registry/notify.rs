//! Notify publisher registry — named channels for completion notifications.
//!
//! Unlike the adviser registry, registration here is last-write-wins and a
//! lookup miss returns `None` rather than an error; callers must handle the
//! absent case. The asymmetry mirrors the two registries' roles: adviser
//! wiring is fixed at startup, publisher wiring may be rebound.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A completion notification routed back into the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Correlation id the waiting node registered for this callback.
    pub correlation_id: String,
    /// Response payload produced by the external task.
    pub data: Value,
}

impl Notification {
    pub fn new(correlation_id: impl Into<String>, data: Value) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            data,
        }
    }
}

/// Delivery channel for asynchronous completion notifications.
pub trait NotifyPublisher: Send + Sync {
    fn send(&self, notification: Notification);
}

/// Registry mapping channel names to publishers.
pub struct NotifyPublisherRegistry {
    registry: DashMap<String, Arc<dyn NotifyPublisher>>,
}

impl NotifyPublisherRegistry {
    pub fn new() -> Self {
        Self {
            registry: DashMap::new(),
        }
    }

    /// Register a publisher under `name`, replacing any existing mapping.
    pub fn register(&self, name: impl Into<String>, publisher: Arc<dyn NotifyPublisher>) {
        self.registry.insert(name.into(), publisher);
    }

    /// Look up the publisher for `name`, if one is registered.
    pub fn obtain(&self, name: &str) -> Option<Arc<dyn NotifyPublisher>> {
        self.registry.get(name).map(|entry| entry.value().clone())
    }
}

impl Default for NotifyPublisherRegistry {
    fn default() -> Self {
        Self::new()
    }
}
