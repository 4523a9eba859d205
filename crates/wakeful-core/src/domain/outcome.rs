//! Outcomes of the fire path.

use serde::Serialize;

use super::ids::ExecutionId;

/// Verdict of the duplicate-delivery guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupVerdict {
    Accept,

    /// Fired within the spurious-fire threshold of being scheduled.
    RejectTooSoonAfterSchedule,

    /// Same task fired within the suppression window.
    RejectDuplicate,
}

impl DedupVerdict {
    pub fn is_accept(self) -> bool {
        matches!(self, DedupVerdict::Accept)
    }
}

/// What `on_fired` did with an event. Exactly one dispatch branch runs per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FireOutcome {
    /// Dropped by the dedup guard; completion already invoked.
    Rejected { verdict: DedupVerdict },

    /// Handed to the live callback. The execution stays registered until
    /// `finish` or a backend timeout.
    Dispatched { execution_id: ExecutionId },

    /// Auto-completed and every schedule was cancelled.
    /// `configuration_gap` is set when no handler, reload or stop was configured.
    Stopped {
        execution_id: ExecutionId,
        configuration_gap: bool,
    },

    /// Host relaunch requested, firing auto-completed.
    Relaunched { execution_id: ExecutionId },

    /// Firing auto-completed and handed to the headless handler.
    /// `delivered` is false when no handler is registered under the name; the
    /// handler itself runs on its own task and is not awaited.
    Headless {
        execution_id: ExecutionId,
        handler: String,
        delivered: bool,
    },
}

impl FireOutcome {
    pub fn execution_id(&self) -> Option<ExecutionId> {
        match self {
            Self::Rejected { .. } => None,
            Self::Dispatched { execution_id }
            | Self::Stopped { execution_id, .. }
            | Self::Relaunched { execution_id }
            | Self::Headless { execution_id, .. } => Some(*execution_id),
        }
    }
}
