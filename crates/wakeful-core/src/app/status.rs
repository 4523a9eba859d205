//! Status - coordinator のスナップショット
//!
//! ログや CLI に出すための読み取り専用ビュー。取得した時点の値であり、ロックは保持しない。

use serde::Serialize;

use crate::domain::{BackendKind, BackgroundStatus, CoordinatorState, TaskId};
use crate::execution::ExecutingTaskView;

/// A configured task and the backend it is currently registered on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfiguredTask {
    pub task_id: TaskId,
    /// `None` while the task is configured but not registered on any backend.
    pub backend: Option<BackendKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorStatus {
    pub state: CoordinatorState,
    pub background_status: BackgroundStatus,
    pub configured: Vec<ConfiguredTask>,
    pub executing: Vec<ExecutingTaskView>,
    pub dedup_entries: usize,
}

impl CoordinatorStatus {
    /// Number of executions still waiting for `finish` or a timeout.
    pub fn in_flight(&self) -> usize {
        self.executing.len()
    }

    pub fn is_idle(&self) -> bool {
        self.executing.is_empty()
    }
}
