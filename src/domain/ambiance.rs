use serde::{Deserialize, Serialize};

/// One level in the execution hierarchy (stage, step group, step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Uuid of the plan node this level was spawned from.
    pub setup_id: String,
    /// Uuid of the node execution at this level.
    pub runtime_id: String,
    /// Human-readable identifier within the plan.
    pub identifier: String,
}

impl Level {
    pub fn new(
        setup_id: impl Into<String>,
        runtime_id: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            setup_id: setup_id.into(),
            runtime_id: runtime_id.into(),
            identifier: identifier.into(),
        }
    }
}

/// Immutable positional context of a node within a plan execution.
///
/// An `Ambiance` is shared by reference across resolver calls within one
/// evaluation and never mutated; descending a level produces a new value via
/// [`with_level`](Ambiance::with_level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ambiance {
    plan_execution_id: String,
    account_id: String,
    org_id: String,
    project_id: String,
    levels: Vec<Level>,
}

impl Ambiance {
    pub fn new(
        plan_execution_id: impl Into<String>,
        account_id: impl Into<String>,
        org_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            plan_execution_id: plan_execution_id.into(),
            account_id: account_id.into(),
            org_id: org_id.into(),
            project_id: project_id.into(),
            levels: Vec::new(),
        }
    }

    /// Return a new ambiance one level deeper.
    pub fn with_level(&self, level: Level) -> Ambiance {
        let mut next = self.clone();
        next.levels.push(level);
        next
    }

    pub fn plan_execution_id(&self) -> &str {
        &self.plan_execution_id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Runtime id of the current (deepest) level, if any.
    pub fn node_execution_id(&self) -> Option<&str> {
        self.levels.last().map(|level| level.runtime_id.as_str())
    }

    /// Setup id of the current (deepest) level, if any.
    pub fn node_setup_id(&self) -> Option<&str> {
        self.levels.last().map(|level| level.setup_id.as_str())
    }
}
