//! Execution status — the canonical definition of node and plan states.
//!
//! Status groups and the allowed-start sets drive every compare-and-set
//! transition in the engine; a transition is legal only when the current
//! status appears in the target's allowed-start set.

use serde::{Deserialize, Serialize};

/// Execution status of a node or plan execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Progress sentinel: no status change reported yet.
    NoOp,

    // In-progress statuses
    Running,
    InterventionWaiting,
    TimedWaiting,
    AsyncWaiting,
    TaskWaiting,
    InputWaiting,
    Discontinuing,

    // Final statuses
    Queued,
    Skipped,
    Paused,
    Aborted,
    Errored,
    Failed,
    Expired,
    Succeeded,
}

use Status::*;

const FINALIZABLE: &[Status] = &[
    Queued,
    Running,
    Paused,
    AsyncWaiting,
    TaskWaiting,
    TimedWaiting,
    InputWaiting,
    Discontinuing,
];

const POSITIVE: &[Status] = &[Succeeded, Skipped];

const BROKE: &[Status] = &[Failed, Errored];

const RESUMABLE: &[Status] = &[
    Queued,
    Running,
    AsyncWaiting,
    TaskWaiting,
    TimedWaiting,
    InputWaiting,
    InterventionWaiting,
];

const FLOWING: &[Status] = &[
    Running,
    AsyncWaiting,
    TaskWaiting,
    TimedWaiting,
    InputWaiting,
    Discontinuing,
];

const FINAL: &[Status] = &[
    Queued, Skipped, Paused, Aborted, Errored, Failed, Expired, Succeeded,
];

const RETRYABLE: &[Status] = &[Failed, Errored, Expired];

const WAITING: &[Status] = &[
    AsyncWaiting,
    TaskWaiting,
    TimedWaiting,
    InputWaiting,
    InterventionWaiting,
];

impl Status {
    /// Statuses from which an execution can still be driven to a final status.
    pub fn finalizable_statuses() -> &'static [Status] {
        FINALIZABLE
    }

    /// Statuses counting as a positive conclusion.
    pub fn positive_statuses() -> &'static [Status] {
        POSITIVE
    }

    /// Statuses counting as a broken conclusion.
    pub fn broke_statuses() -> &'static [Status] {
        BROKE
    }

    /// Statuses from which a resume interrupt is meaningful.
    pub fn resumable_statuses() -> &'static [Status] {
        RESUMABLE
    }

    /// Statuses in which the execution is actively making (or awaiting) progress.
    pub fn flowing_statuses() -> &'static [Status] {
        FLOWING
    }

    /// Final statuses.
    pub fn final_statuses() -> &'static [Status] {
        FINAL
    }

    /// Conclusions an adviser may choose to retry.
    pub fn retryable_statuses() -> &'static [Status] {
        RETRYABLE
    }

    /// Suspension statuses: the node yielded to an external event.
    pub fn waiting_statuses() -> &'static [Status] {
        WAITING
    }

    pub fn is_final(self) -> bool {
        FINAL.contains(&self)
    }

    pub fn is_broken(self) -> bool {
        BROKE.contains(&self)
    }

    pub fn is_waiting(self) -> bool {
        WAITING.contains(&self)
    }

    /// Statuses an execution is allowed to be in when transitioning to `to`.
    pub fn allowed_start_set(to: Status) -> &'static [Status] {
        match to {
            Running => &[
                Queued,
                AsyncWaiting,
                TaskWaiting,
                TimedWaiting,
                InputWaiting,
                InterventionWaiting,
                Paused,
            ],
            InterventionWaiting => BROKE,
            TimedWaiting | AsyncWaiting | TaskWaiting | InputWaiting | Paused => {
                &[Queued, Running]
            }
            Discontinuing => &[
                Queued,
                Running,
                AsyncWaiting,
                TaskWaiting,
                TimedWaiting,
                InputWaiting,
                InterventionWaiting,
                Paused,
            ],
            Skipped => &[Queued],
            Queued => &[Paused],
            Aborted | Succeeded | Errored | Failed | Expired => FINALIZABLE,
            NoOp => &[],
        }
    }

    /// Whether a transition from `from` to `to` is legal.
    pub fn can_transition(from: Status, to: Status) -> bool {
        Status::allowed_start_set(to).contains(&from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waiting_statuses_are_finalizable() {
        for status in Status::waiting_statuses() {
            assert!(
                Status::finalizable_statuses().contains(status)
                    || *status == InterventionWaiting,
                "{status:?} should be finalizable"
            );
        }
    }

    #[test]
    fn test_allowed_start_set_running() {
        assert!(Status::can_transition(Queued, Running));
        assert!(Status::can_transition(AsyncWaiting, Running));
        assert!(Status::can_transition(Paused, Running));
        assert!(!Status::can_transition(Succeeded, Running));
        assert!(!Status::can_transition(Aborted, Running));
    }

    #[test]
    fn test_allowed_start_set_final() {
        assert!(Status::can_transition(Running, Succeeded));
        assert!(Status::can_transition(Discontinuing, Aborted));
        assert!(!Status::can_transition(Succeeded, Failed));
    }

    #[test]
    fn test_no_op_has_no_start_set() {
        assert!(Status::allowed_start_set(NoOp).is_empty());
    }

    #[test]
    fn test_serde_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&InputWaiting).unwrap(),
            "\"INPUT_WAITING\""
        );
        let status: Status = serde_json::from_str("\"NO_OP\"").unwrap();
        assert_eq!(status, NoOp);
    }
}
