use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::{Ambiance, PendingMode, PendingResponse};

/// An externally or internally triggered control signal targeting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterruptType {
    Abort,
    Pause,
    Resume,
    Retry,
}

/// Envelope for one interrupt event against a suspended node.
///
/// The package owns exactly one pending-response descriptor, identifying
/// which resumption path applies; the [`PendingResponse`] sum type makes a
/// second descriptor unrepresentable. A package is consumed by value by the
/// interrupt processor, so processing is at most once.
#[derive(Debug, Clone)]
pub struct InterruptPackage {
    ambiance: Ambiance,
    parameters: Option<Value>,
    pending: PendingResponse,
    metadata: HashMap<String, String>,
    user_marked: bool,
}

impl InterruptPackage {
    pub fn new(ambiance: Ambiance, pending: PendingResponse) -> Self {
        Self {
            ambiance,
            parameters: None,
            pending,
            metadata: HashMap::new(),
            user_marked: false,
        }
    }

    /// Attach the resolved step parameters of the targeted node.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Mark the interrupt as human-initiated.
    ///
    /// Affects audit and reporting only, never control flow.
    pub fn user_marked(mut self) -> Self {
        self.user_marked = true;
        self
    }

    pub fn ambiance(&self) -> &Ambiance {
        &self.ambiance
    }

    pub fn parameters(&self) -> Option<&Value> {
        self.parameters.as_ref()
    }

    pub fn pending(&self) -> &PendingResponse {
        &self.pending
    }

    pub fn mode(&self) -> PendingMode {
        self.pending.mode()
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn is_user_marked(&self) -> bool {
        self.user_marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AsyncExecutableResponse, TaskExecutableResponse};
    use serde_json::json;

    fn ambiance() -> Ambiance {
        Ambiance::new("plan-1", "acct", "org", "proj")
    }

    #[test]
    fn test_package_carries_exactly_one_descriptor() {
        // The descriptor is a sum type: a package holding both an async and a
        // task response cannot be expressed, closing a gap the optional-field
        // encoding would leave open.
        let package = InterruptPackage::new(
            ambiance(),
            PendingResponse::Task(TaskExecutableResponse {
                task_id: "t-1".into(),
                task_category: "delegate".into(),
            }),
        );
        assert_eq!(package.mode(), PendingMode::Task);
    }

    #[test]
    fn test_builder_accessors() {
        let package = InterruptPackage::new(
            ambiance(),
            PendingResponse::Async(AsyncExecutableResponse {
                callback_ids: vec!["cb-1".into()],
                timeout_millis: None,
            }),
        )
        .with_parameters(json!({"script": "make"}))
        .with_metadata("origin", "api")
        .user_marked();

        assert!(package.is_user_marked());
        assert_eq!(package.parameters().unwrap()["script"], json!("make"));
        assert_eq!(package.metadata()["origin"], "api");
        assert_eq!(package.mode(), PendingMode::Async);
    }

    #[test]
    fn test_default_is_engine_initiated() {
        let package = InterruptPackage::new(
            ambiance(),
            PendingResponse::Async(AsyncExecutableResponse {
                callback_ids: vec![],
                timeout_millis: None,
            }),
        );
        assert!(!package.is_user_marked());
    }
}
