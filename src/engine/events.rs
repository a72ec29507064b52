use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::{PendingMode, Status};
use crate::interrupt::InterruptType;

/// Engine events emitted while a plan advances.
#[derive(Clone, Debug, Serialize)]
pub enum EngineEvent {
    /// A node began executing.
    NodeStarted {
        node_execution_id: String,
        node_identifier: String,
        timestamp: DateTime<Utc>,
    },

    /// A node yielded to an external task and was parked.
    NodeSuspended {
        node_execution_id: String,
        mode: PendingMode,
        timestamp: DateTime<Utc>,
    },

    /// A suspended node received its completion data and continued.
    NodeResumed {
        node_execution_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A node reached a conclusion status.
    NodeConcluded {
        node_execution_id: String,
        status: Status,
        timestamp: DateTime<Utc>,
    },

    /// An adviser scheduled a retry of a concluded node.
    NodeRetryScheduled {
        node_execution_id: String,
        retry_index: u32,
        wait_millis: u64,
        timestamp: DateTime<Utc>,
    },

    /// An interrupt was processed against a node.
    InterruptProcessed {
        node_execution_id: String,
        interrupt: InterruptType,
        user_marked: bool,
        timestamp: DateTime<Utc>,
    },

    /// The plan execution reached a final status.
    PlanConcluded {
        plan_execution_id: String,
        status: Status,
        timestamp: DateTime<Utc>,
    },
}

pub type EventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Sender wrapper that makes event emission optional and infallible.
#[derive(Clone, Default)]
pub struct EventEmitter {
    tx: Option<EventSender>,
}

impl EventEmitter {
    pub fn new(tx: EventSender) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_channel() {
        let (sender, mut receiver) = create_event_channel();
        let emitter = EventEmitter::new(sender);

        emitter.emit(EngineEvent::NodeStarted {
            node_execution_id: "n1".to_string(),
            node_identifier: "build".to_string(),
            timestamp: Utc::now(),
        });

        let event = receiver.recv().await.unwrap();
        match event {
            EngineEvent::NodeStarted {
                node_execution_id, ..
            } => assert_eq!(node_execution_id, "n1"),
            _ => panic!("Unexpected event type"),
        }
    }

    #[test]
    fn test_disabled_emitter_drops_events() {
        let emitter = EventEmitter::disabled();
        emitter.emit(EngineEvent::PlanConcluded {
            plan_execution_id: "p1".to_string(),
            status: Status::Succeeded,
            timestamp: Utc::now(),
        });
    }
}
