//! TaskRegistry - 実行中タスクの台帳
//!
//! 発火を受け付けてから完了するまでの間、task_id ごとに 1 件だけ実行を保持する。
//! 完了（`complete`）・タイムアウト（`on_timeout`）・停止（`drain`）のいずれかで
//! エントリを取り除き、そのとき必ず CompletionHandler を呼ぶ。
//!
//! # 学習ポイント
//! - HashMap の entry API で「無ければ挿入」を 1 回のロックで行う
//! - CompletionHandler はロックを外してから呼ぶ（コールバック中に registry を触っても詰まらない）
//! - キーは大文字小文字を畳んだ task_id（backend が返す綴りの揺れを吸収）

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::completion::CompletionHandler;
use crate::domain::{BackendHandle, DuplicateTaskError, ExecutionId, ExecutionState, TaskId};
use crate::ports::{Clock, IdGenerator};

/// An in-flight execution. Owns the completion handler until it is finished.
#[derive(Debug)]
struct ExecutingTask {
    task_id: TaskId,
    execution_id: ExecutionId,
    state: ExecutionState,
    handle: BackendHandle,
    started_at: DateTime<Utc>,
    completion: CompletionHandler,
}

/// Read-only view of an in-flight execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutingTaskView {
    pub task_id: TaskId,
    pub execution_id: ExecutionId,
    pub state: ExecutionState,
    pub handle: BackendHandle,
    pub started_at: DateTime<Utc>,
}

/// Returned by `register` when the task already has an execution in flight.
///
/// The rejected completion handler is handed back so the caller can release it.
#[derive(Debug)]
pub struct DuplicateRegistration {
    pub error: DuplicateTaskError,
    pub completion: CompletionHandler,
}

pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, ExecutingTask>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskRegistry {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            clock,
            ids,
        }
    }

    /// Record a new execution for `task_id`.
    pub fn register(
        &self,
        task_id: TaskId,
        completion: CompletionHandler,
        handle: BackendHandle,
    ) -> Result<ExecutionId, DuplicateRegistration> {
        let mut tasks = self.lock();
        match tasks.entry(task_id.folded()) {
            Entry::Occupied(occupied) => Err(DuplicateRegistration {
                error: DuplicateTaskError(occupied.get().task_id.clone()),
                completion,
            }),
            Entry::Vacant(vacant) => {
                let execution_id = self.ids.generate_execution_id();
                vacant.insert(ExecutingTask {
                    task_id,
                    execution_id,
                    state: ExecutionState::Fired,
                    handle,
                    started_at: self.clock.now(),
                    completion,
                });
                Ok(execution_id)
            }
        }
    }

    pub fn lookup(&self, task_id: &TaskId) -> Option<ExecutingTaskView> {
        self.lock().get(&task_id.folded()).map(view)
    }

    /// Fired → Dispatched. Returns false when the task is not registered.
    pub fn mark_dispatched(&self, task_id: &TaskId) -> bool {
        match self.lock().get_mut(&task_id.folded()) {
            Some(task) => {
                task.state = ExecutionState::Dispatched;
                true
            }
            None => false,
        }
    }

    /// Remove the execution and signal its completion.
    ///
    /// Returns false (and does nothing) when `task_id` has no execution in flight.
    pub fn complete(&self, task_id: &TaskId) -> bool {
        let removed = self.lock().remove(&task_id.folded());
        match removed {
            Some(task) => {
                tracing::debug!(
                    task_id = %task.task_id,
                    execution_id = %task.execution_id,
                    "execution complete"
                );
                task.completion.finish();
                true
            }
            None => {
                tracing::debug!(task_id = %task_id, "complete: no execution in flight");
                false
            }
        }
    }

    /// The backend revoked the execution before it finished.
    pub fn on_timeout(&self, task_id: &TaskId) -> bool {
        let removed = self.lock().remove(&task_id.folded());
        match removed {
            Some(task) => {
                tracing::warn!(
                    task_id = %task.task_id,
                    execution_id = %task.execution_id,
                    state = ?task.state,
                    "execution timed out"
                );
                task.completion.finish();
                true
            }
            None => false,
        }
    }

    /// Complete every in-flight execution. Returns how many were drained.
    pub fn drain(&self) -> usize {
        let drained: Vec<ExecutingTask> = self.lock().drain().map(|(_, task)| task).collect();
        let count = drained.len();
        for task in drained {
            tracing::debug!(task_id = %task.task_id, "execution drained");
            task.completion.finish();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Ids of the tasks in flight, sorted.
    pub fn task_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .lock()
            .values()
            .map(|task| task.task_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Views of every in-flight execution, sorted by task id.
    pub fn snapshot(&self) -> Vec<ExecutingTaskView> {
        let mut views: Vec<ExecutingTaskView> = self
            .lock()
            .values()
            .map(view)
            .collect();
        views.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        views
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ExecutingTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn view(task: &ExecutingTask) -> ExecutingTaskView {
    ExecutingTaskView {
        task_id: task.task_id.clone(),
        execution_id: task.execution_id,
        state: task.state,
        handle: task.handle.clone(),
        started_at: task.started_at,
    }
}
