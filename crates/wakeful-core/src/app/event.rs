//! Fired events and the live callback.

use chrono::{DateTime, Utc};

use crate::domain::{BackendHandle, ScheduledPayload, TaskId};
use crate::execution::CompletionHandler;

/// A wake-up delivered by a backend.
#[derive(Debug)]
pub struct FiredEvent {
    pub task_id: TaskId,
    /// When the firing schedule was requested.
    pub scheduled_at: DateTime<Utc>,
    pub handle: BackendHandle,
    pub completion: CompletionHandler,
}

impl FiredEvent {
    pub fn new(
        task_id: TaskId,
        scheduled_at: DateTime<Utc>,
        handle: BackendHandle,
        completion: CompletionHandler,
    ) -> Self {
        Self {
            task_id,
            scheduled_at,
            handle,
            completion,
        }
    }

    /// A job scheduler firing, carrying back the payload it was registered with.
    pub fn from_payload(
        payload: ScheduledPayload,
        handle: BackendHandle,
        completion: CompletionHandler,
    ) -> Self {
        Self::new(payload.task_id, payload.scheduled_at, handle, completion)
    }
}

/// In-process callback invoked while the host application is in the foreground.
///
/// Called synchronously on the delivering task and must not block. The execution
/// stays registered until `FetchCoordinator::finish` is called with the same id or
/// the backend times it out.
pub trait FetchListener: Send + Sync {
    fn on_fetch(&self, task_id: &TaskId);
}

impl<F> FetchListener for F
where
    F: Fn(&TaskId) + Send + Sync,
{
    fn on_fetch(&self, task_id: &TaskId) {
        self(task_id)
    }
}
