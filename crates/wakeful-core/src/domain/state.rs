//! State - coordinator と実行中タスクの状態
//!
//! # 状態遷移
//! - Coordinator: Unconfigured → Configured → Scheduled、Stopped はどこからでも
//! - Execution: Fired → Dispatched → (registry から削除 = Completed)

use serde::{Deserialize, Serialize};

/// Lifecycle of the coordinator as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No task has been configured yet.
    Unconfigured,

    /// At least one task is configured but nothing is scheduled.
    Configured,

    /// Configured tasks were handed to their backends.
    Scheduled,

    /// Every backend registration was cancelled.
    Stopped,
}

/// State of one in-flight execution held by the task registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Accepted and registered, dispatch not decided yet.
    Fired,

    /// Handed to the live callback; waits for `finish` or a backend timeout.
    Dispatched,
}
