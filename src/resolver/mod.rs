//! Sweeping-output resolution.
//!
//! A sweeping output is a named value published by one node and made visible
//! to others through expression references. The [`SweepingOutputResolver`] is
//! the functor the expression engine calls with a string key during
//! evaluation over a bound [`Ambiance`].

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use crate::domain::Ambiance;
use crate::error::ResolveError;

/// Reference to a named sweeping output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefObject {
    name: String,
}

impl RefObject {
    /// Build a sweeping-output reference from an expression key.
    pub fn sweeping_output(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Backing service holding published outputs, keyed by plan execution.
///
/// `resolve` returns the serialized JSON representation, or `None` when the
/// reference has no backing value. Implementations live outside the engine;
/// [`InMemorySweepingOutputService`] ships for tests and embedding without a
/// real store.
pub trait SweepingOutputService: Send + Sync {
    fn resolve(
        &self,
        ambiance: &Ambiance,
        ref_object: &RefObject,
    ) -> Result<Option<String>, ResolveError>;

    /// Publish a named output for the ambiance's plan execution.
    fn consume(
        &self,
        ambiance: &Ambiance,
        name: &str,
        value: &Value,
    ) -> Result<(), ResolveError>;
}

/// Lazily resolves named execution outputs during expression evaluation.
///
/// One resolver is bound to one ambiance and shared across concurrent
/// evaluations; resolution calls are serialized through an internal mutex.
/// There is deliberately no caching: repeated keys repeat the query, so the
/// expression always sees the service's current value.
pub struct SweepingOutputResolver {
    service: Arc<dyn SweepingOutputService>,
    ambiance: Ambiance,
    guard: Mutex<()>,
}

impl SweepingOutputResolver {
    pub fn new(service: Arc<dyn SweepingOutputService>, ambiance: Ambiance) -> Self {
        Self {
            service,
            ambiance,
            guard: Mutex::new(()),
        }
    }

    pub fn ambiance(&self) -> &Ambiance {
        &self.ambiance
    }

    /// Resolve `key` against the bound ambiance.
    ///
    /// Returns `Ok(None)` when the reference has no backing value; malformed
    /// serialized data is a [`ResolveError::Malformed`], which aborts only the
    /// expression evaluation that asked, never the node.
    pub fn resolve(&self, key: &str) -> Result<Option<Value>, ResolveError> {
        let _guard = self.guard.lock();
        let serialized = self
            .service
            .resolve(&self.ambiance, &RefObject::sweeping_output(key))?;
        match serialized {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|err| {
                ResolveError::Malformed {
                    key: key.to_string(),
                    message: err.to_string(),
                }
            }),
        }
    }
}

/// In-memory sweeping-output service, scoped per plan execution.
pub struct InMemorySweepingOutputService {
    outputs: DashMap<(String, String), String>,
}

impl InMemorySweepingOutputService {
    pub fn new() -> Self {
        Self {
            outputs: DashMap::new(),
        }
    }
}

impl Default for InMemorySweepingOutputService {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepingOutputService for InMemorySweepingOutputService {
    fn resolve(
        &self,
        ambiance: &Ambiance,
        ref_object: &RefObject,
    ) -> Result<Option<String>, ResolveError> {
        let key = (
            ambiance.plan_execution_id().to_string(),
            ref_object.name().to_string(),
        );
        Ok(self.outputs.get(&key).map(|entry| entry.value().clone()))
    }

    fn consume(&self, ambiance: &Ambiance, name: &str, value: &Value) -> Result<(), ResolveError> {
        let serialized = serde_json::to_string(value).map_err(|err| ResolveError::Malformed {
            key: name.to_string(),
            message: err.to_string(),
        })?;
        self.outputs.insert(
            (
                ambiance.plan_execution_id().to_string(),
                name.to_string(),
            ),
            serialized,
        );
        Ok(())
    }
}
