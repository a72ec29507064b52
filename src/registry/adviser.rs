//! Adviser registry — pluggable post-node-completion decision logic.
//!
//! Advisers are looked up by [`AdviserType`] and materialized from typed
//! parameters by an [`AdviserProducer`]. Registration is strict: a second
//! producer for the same type is rejected, and the first stays resolvable.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::domain::{Ambiance, Status};
use crate::error::RegistryError;

/// Identifier of an adviser implementation: a kind plus optional discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdviserType {
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    discriminator: Option<String>,
}

impl AdviserType {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            discriminator: None,
        }
    }

    pub fn with_discriminator(kind: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            discriminator: Some(discriminator.into()),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }
}

impl fmt::Display for AdviserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.discriminator {
            Some(discriminator) => write!(f, "{}/{}", self.kind, discriminator),
            None => f.write_str(&self.kind),
        }
    }
}

/// A request value pairing an [`AdviserType`] with opaque parameters.
///
/// Consumed once to materialize an [`Adviser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviserObtainment {
    pub adviser_type: AdviserType,
    #[serde(default)]
    pub parameters: Value,
}

impl AdviserObtainment {
    pub fn new(adviser_type: AdviserType, parameters: Value) -> Self {
        Self {
            adviser_type,
            parameters,
        }
    }
}

/// The conclusion an adviser inspects.
#[derive(Debug, Clone)]
pub struct AdviseEvent<'a> {
    pub ambiance: &'a Ambiance,
    /// Status the node concluded with.
    pub status: Status,
    pub failure_message: Option<&'a str>,
    /// Retries already spent on the node.
    pub retries: u32,
}

/// What an adviser decided should happen after a node concluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Advise {
    /// Proceed to the given plan node.
    NextStep { node_id: String },
    /// Re-dispatch the concluded node after the given wait.
    Retry { wait_millis: u64 },
    /// Conclude the whole plan with the given status.
    EndPlan { status: Status },
}

/// Pluggable decision unit consulted after a node concludes.
pub trait Adviser: Send + Sync {
    /// Whether this adviser applies to the given conclusion.
    fn can_advise(&self, event: &AdviseEvent<'_>) -> bool;

    /// Produce an advise, or `None` to defer to the next obtainment.
    fn on_advise(&self, event: &AdviseEvent<'_>) -> Option<Advise>;
}

/// Factory building a concrete [`Adviser`] from obtainment parameters.
pub trait AdviserProducer: Send + Sync {
    fn produce(&self, parameters: &Value) -> Arc<dyn Adviser>;
}

impl<F> AdviserProducer for F
where
    F: Fn(&Value) -> Arc<dyn Adviser> + Send + Sync,
{
    fn produce(&self, parameters: &Value) -> Arc<dyn Adviser> {
        self(parameters)
    }
}

/// Process-wide registry mapping adviser types to producers.
///
/// Populated during module wiring, read from many execution threads; the
/// underlying map is internally synchronized, so callers never lock.
pub struct AdviserRegistry {
    registry: DashMap<AdviserType, Arc<dyn AdviserProducer>>,
}

impl AdviserRegistry {
    pub fn new() -> Self {
        Self {
            registry: DashMap::new(),
        }
    }

    /// Register a producer for `adviser_type`.
    ///
    /// Duplicate registration is an error and leaves the first producer in
    /// place; the check and insert are a single atomic entry operation.
    pub fn register(
        &self,
        adviser_type: AdviserType,
        producer: Arc<dyn AdviserProducer>,
    ) -> Result<(), RegistryError> {
        match self.registry.entry(adviser_type) {
            Entry::Occupied(occupied) => Err(RegistryError::DuplicateRegistration(
                occupied.key().to_string(),
            )),
            Entry::Vacant(vacant) => {
                vacant.insert(producer);
                Ok(())
            }
        }
    }

    /// Materialize an adviser from an obtainment.
    pub fn obtain(&self, obtainment: &AdviserObtainment) -> Result<Arc<dyn Adviser>, RegistryError> {
        match self.registry.get(&obtainment.adviser_type) {
            Some(producer) => Ok(producer.produce(&obtainment.parameters)),
            None => Err(RegistryError::UnregisteredType(
                obtainment.adviser_type.to_string(),
            )),
        }
    }

    pub fn registered_types(&self) -> Vec<AdviserType> {
        self.registry.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for AdviserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TagAdviser(&'static str);

    impl Adviser for TagAdviser {
        fn can_advise(&self, _event: &AdviseEvent<'_>) -> bool {
            true
        }

        fn on_advise(&self, _event: &AdviseEvent<'_>) -> Option<Advise> {
            Some(Advise::NextStep {
                node_id: self.0.to_string(),
            })
        }
    }

    fn event_for(ambiance: &Ambiance) -> AdviseEvent<'_> {
        AdviseEvent {
            ambiance,
            status: Status::Succeeded,
            failure_message: None,
            retries: 0,
        }
    }

    #[test]
    fn test_register_and_obtain() {
        let registry = AdviserRegistry::new();
        registry
            .register(
                AdviserType::new("ON_FAIL"),
                Arc::new(|_: &Value| Arc::new(TagAdviser("first")) as Arc<dyn Adviser>),
            )
            .unwrap();

        let obtainment = AdviserObtainment::new(AdviserType::new("ON_FAIL"), json!({}));
        let adviser = registry.obtain(&obtainment).unwrap();

        let ambiance = Ambiance::new("p1", "a", "o", "pr");
        assert_eq!(
            adviser.on_advise(&event_for(&ambiance)),
            Some(Advise::NextStep {
                node_id: "first".into()
            })
        );
    }

    #[test]
    fn test_duplicate_registration_keeps_first_producer() {
        let registry = AdviserRegistry::new();
        registry
            .register(
                AdviserType::new("ON_FAIL"),
                Arc::new(|_: &Value| Arc::new(TagAdviser("first")) as Arc<dyn Adviser>),
            )
            .unwrap();

        let err = registry
            .register(
                AdviserType::new("ON_FAIL"),
                Arc::new(|_: &Value| Arc::new(TagAdviser("second")) as Arc<dyn Adviser>),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRegistration(_)));

        let obtainment = AdviserObtainment::new(AdviserType::new("ON_FAIL"), json!({}));
        let adviser = registry.obtain(&obtainment).unwrap();
        let ambiance = Ambiance::new("p1", "a", "o", "pr");
        assert_eq!(
            adviser.on_advise(&event_for(&ambiance)),
            Some(Advise::NextStep {
                node_id: "first".into()
            })
        );
    }

    #[test]
    fn test_obtain_unregistered_type() {
        let registry = AdviserRegistry::new();
        let obtainment = AdviserObtainment::new(AdviserType::new("ON_SKIP"), json!({}));
        let err = registry.obtain(&obtainment).err().unwrap();
        assert!(matches!(err, RegistryError::UnregisteredType(_)));
        assert!(err.to_string().contains("ON_SKIP"));
    }

    #[test]
    fn test_discriminator_distinguishes_types() {
        let registry = AdviserRegistry::new();
        registry
            .register(
                AdviserType::new("RETRY"),
                Arc::new(|_: &Value| Arc::new(TagAdviser("plain")) as Arc<dyn Adviser>),
            )
            .unwrap();
        registry
            .register(
                AdviserType::with_discriminator("RETRY", "manual"),
                Arc::new(|_: &Value| Arc::new(TagAdviser("manual")) as Arc<dyn Adviser>),
            )
            .unwrap();

        assert_eq!(registry.registered_types().len(), 2);
    }
}
