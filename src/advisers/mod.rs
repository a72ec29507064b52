//! Built-in advisers and their default wiring.
//!
//! The adviser variant set is open; these three cover the common plan shapes
//! and double as the reference producers for the registry. Anything else can
//! be registered through [`AdviserRegistry::register`].

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::domain::Status;
use crate::registry::{Advise, AdviseEvent, Adviser, AdviserRegistry, AdviserType};

/// Adviser kind wired for [`OnSuccessAdviser`].
pub const ON_SUCCESS: &str = "ON_SUCCESS";
/// Adviser kind wired for [`RetryAdviser`].
pub const RETRY: &str = "RETRY";
/// Adviser kind wired for [`OnFailAdviser`].
pub const ON_FAIL: &str = "ON_FAIL";

#[derive(Debug, Deserialize)]
struct OnSuccessParameters {
    next_node_id: String,
}

/// Proceeds to the configured next node on a positive conclusion.
pub struct OnSuccessAdviser {
    next_node_id: Option<String>,
}

impl OnSuccessAdviser {
    pub fn from_parameters(parameters: &Value) -> Self {
        let parsed: Option<OnSuccessParameters> =
            serde_json::from_value(parameters.clone()).ok();
        Self {
            next_node_id: parsed.map(|p| p.next_node_id),
        }
    }
}

impl Adviser for OnSuccessAdviser {
    fn can_advise(&self, event: &AdviseEvent<'_>) -> bool {
        Status::positive_statuses().contains(&event.status)
    }

    fn on_advise(&self, _event: &AdviseEvent<'_>) -> Option<Advise> {
        self.next_node_id
            .as_ref()
            .map(|node_id| Advise::NextStep {
                node_id: node_id.clone(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct RetryParameters {
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    /// Wait before each attempt; the last entry repeats when exhausted.
    #[serde(default)]
    wait_millis: Vec<u64>,
}

fn default_max_retries() -> u32 {
    1
}

/// Re-dispatches a broken node until its retry budget is spent.
pub struct RetryAdviser {
    max_retries: u32,
    wait_millis: Vec<u64>,
}

impl RetryAdviser {
    pub fn from_parameters(parameters: &Value) -> Self {
        let parsed: RetryParameters = serde_json::from_value(parameters.clone())
            .unwrap_or(RetryParameters {
                max_retries: default_max_retries(),
                wait_millis: Vec::new(),
            });
        Self {
            max_retries: parsed.max_retries,
            wait_millis: parsed.wait_millis,
        }
    }

    fn wait_for_attempt(&self, attempt: u32) -> u64 {
        match self.wait_millis.as_slice() {
            [] => 0,
            waits => {
                let index = (attempt as usize).min(waits.len() - 1);
                waits[index]
            }
        }
    }
}

impl Adviser for RetryAdviser {
    fn can_advise(&self, event: &AdviseEvent<'_>) -> bool {
        Status::retryable_statuses().contains(&event.status) && event.retries < self.max_retries
    }

    fn on_advise(&self, event: &AdviseEvent<'_>) -> Option<Advise> {
        Some(Advise::Retry {
            wait_millis: self.wait_for_attempt(event.retries),
        })
    }
}

/// Concludes the plan as failed once a node breaks for good.
pub struct OnFailAdviser;

impl Adviser for OnFailAdviser {
    fn can_advise(&self, event: &AdviseEvent<'_>) -> bool {
        Status::broke_statuses().contains(&event.status)
    }

    fn on_advise(&self, _event: &AdviseEvent<'_>) -> Option<Advise> {
        Some(Advise::EndPlan {
            status: Status::Failed,
        })
    }
}

/// Create a registry with the built-in adviser kinds wired.
pub fn default_adviser_registry() -> AdviserRegistry {
    let registry = AdviserRegistry::new();
    // A fresh registry has no prior registrations to collide with.
    register_defaults(&registry).expect("built-in adviser wiring on a fresh registry");
    registry
}

/// Wire the built-in producers into an existing registry.
pub fn register_defaults(registry: &AdviserRegistry) -> Result<(), crate::error::RegistryError> {
    registry.register(
        AdviserType::new(ON_SUCCESS),
        Arc::new(|parameters: &Value| {
            Arc::new(OnSuccessAdviser::from_parameters(parameters)) as Arc<dyn Adviser>
        }),
    )?;
    registry.register(
        AdviserType::new(RETRY),
        Arc::new(|parameters: &Value| {
            Arc::new(RetryAdviser::from_parameters(parameters)) as Arc<dyn Adviser>
        }),
    )?;
    registry.register(
        AdviserType::new(ON_FAIL),
        Arc::new(|_: &Value| Arc::new(OnFailAdviser) as Arc<dyn Adviser>),
    )?;
    Ok(())
}
