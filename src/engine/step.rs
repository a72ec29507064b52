use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::{Ambiance, PendingResponse, Status};
use crate::error::EngineError;

/// Outcome of a concluded step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Conclusion status: `Succeeded`, `Failed`, or `Skipped`.
    pub status: Status,
    pub failure_message: Option<String>,
    /// Named outputs published as sweeping outputs for downstream nodes.
    pub outputs: HashMap<String, Value>,
}

impl StepOutcome {
    pub fn success() -> Self {
        Self {
            status: Status::Succeeded,
            failure_message: None,
            outputs: HashMap::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            failure_message: Some(message.into()),
            outputs: HashMap::new(),
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: Status::Skipped,
            failure_message: None,
            outputs: HashMap::new(),
        }
    }

    pub fn with_output(mut self, name: impl Into<String>, value: Value) -> Self {
        self.outputs.insert(name.into(), value);
        self
    }
}

/// What a dispatch produced: a finished outcome, or a suspension descriptor.
#[derive(Debug, Clone)]
pub enum StepResponse {
    Outcome(StepOutcome),
    Pending(PendingResponse),
}

/// A step executable: the unit of work a plan node dispatches.
///
/// Returning [`StepResponse::Pending`] suspends the node without blocking the
/// executing thread; the engine resumes the step on another thread once the
/// described callbacks arrive.
#[async_trait]
pub trait Step: Send + Sync {
    async fn execute(
        &self,
        ambiance: &Ambiance,
        parameters: &Value,
    ) -> Result<StepResponse, EngineError>;

    /// Consume collected async response data and continue.
    ///
    /// Chain steps may return another pending descriptor to park the node on
    /// the next link; everything else concludes with an outcome. Steps that
    /// never suspend keep the default, which reports a wiring defect.
    async fn resume(
        &self,
        _ambiance: &Ambiance,
        _parameters: &Value,
        _response_data: HashMap<String, Value>,
    ) -> Result<StepResponse, EngineError> {
        Err(EngineError::Internal(
            "step does not support resumption".to_string(),
        ))
    }

    /// Best-effort cleanup when the node is aborted mid-flight.
    async fn handle_abort(
        &self,
        _ambiance: &Ambiance,
        _parameters: &Value,
        _pending: &PendingResponse,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_constructors() {
        let outcome = StepOutcome::success().with_output("artifact", Value::from("app:1.2"));
        assert_eq!(outcome.status, Status::Succeeded);
        assert_eq!(outcome.outputs["artifact"], Value::from("app:1.2"));

        let failed = StepOutcome::failed("exit 1");
        assert_eq!(failed.status, Status::Failed);
        assert_eq!(failed.failure_message.as_deref(), Some("exit 1"));
    }
}
