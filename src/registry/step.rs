//! Step registry — executables looked up by step type.
//!
//! Same strict semantics as the adviser registry: one registration per type,
//! duplicates rejected. A lookup miss fails the dispatching node through the
//! engine's standard failure path.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::StepType;
use crate::engine::Step;
use crate::error::RegistryError;

/// Process-wide registry mapping step types to step implementations.
pub struct StepRegistry {
    registry: DashMap<StepType, Arc<dyn Step>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            registry: DashMap::new(),
        }
    }

    pub fn register(&self, step_type: StepType, step: Arc<dyn Step>) -> Result<(), RegistryError> {
        match self.registry.entry(step_type) {
            Entry::Occupied(occupied) => Err(RegistryError::DuplicateRegistration(
                occupied.key().to_string(),
            )),
            Entry::Vacant(vacant) => {
                vacant.insert(step);
                Ok(())
            }
        }
    }

    pub fn obtain(&self, step_type: &StepType) -> Result<Arc<dyn Step>, RegistryError> {
        match self.registry.get(step_type) {
            Some(step) => Ok(step.clone()),
            None => Err(RegistryError::UnregisteredType(step_type.to_string())),
        }
    }

    pub fn registered_types(&self) -> Vec<StepType> {
        self.registry.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Ambiance;
    use crate::engine::{StepOutcome, StepResponse};
    use crate::error::EngineError;
    use async_trait::async_trait;
    use serde_json::Value;

    struct NoopStep;

    #[async_trait]
    impl Step for NoopStep {
        async fn execute(
            &self,
            _ambiance: &Ambiance,
            _parameters: &Value,
        ) -> Result<StepResponse, EngineError> {
            Ok(StepResponse::Outcome(StepOutcome::success()))
        }
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = StepRegistry::new();
        registry
            .register(StepType::new("SHELL"), Arc::new(NoopStep))
            .unwrap();
        let err = registry
            .register(StepType::new("SHELL"), Arc::new(NoopStep))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRegistration(_)));
    }

    #[test]
    fn test_obtain_unknown_type() {
        let registry = StepRegistry::new();
        let err = registry.obtain(&StepType::new("K8S")).err().unwrap();
        assert!(matches!(err, RegistryError::UnregisteredType(_)));
    }
}
