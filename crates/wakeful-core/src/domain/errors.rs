//! Errors - エラー型と分類
//!
//! # 方針
//! - 設定の矛盾は `ConfigWarning`（validate.rs）で補正し、エラーにはしない
//! - backend 不在・重複発火・headless 解決失敗は各 enum で表現し、`FetchError` に集約
//! - foreground 判定の権限エラー（`LifecycleError::PermissionDenied`）は握りつぶさず伝播

use thiserror::Error;

use super::ids::TaskId;
use super::schedule::BackendKind;

/// Errors raised while building configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("task id must not be empty")]
    EmptyTaskId,
}

/// A task id was registered while a previous execution of it is still in flight.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task '{0}' already has an execution in flight")]
pub struct DuplicateTaskError(pub TaskId);

/// Errors reported by a scheduling backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{0} backend is unavailable")]
    Unavailable(BackendKind),

    #[error("{backend} backend rejected the request: {reason}")]
    Rejected { backend: BackendKind, reason: String },
}

/// Errors reported by a headless handler resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no headless handler registered as '{0}'")]
    NotFound(String),

    #[error("headless handler '{handler}' failed: {reason}")]
    Invocation { handler: String, reason: String },
}

/// Errors reported by the app lifecycle collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The process is not allowed to inspect its own foreground state.
    #[error("permission denied while checking foreground state: {0}")]
    PermissionDenied(String),

    #[error("relaunch failed: {0}")]
    RelaunchFailed(String),
}

/// Errors reported by a config store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config store encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("config store worker: {0}")]
    Worker(String),
}

/// Top-level error of the coordinator surface.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no task has been configured")]
    NotConfigured,

    #[error("task '{0}' is not configured")]
    UnknownTask(TaskId),

    #[error("task '{0}' is already scheduled")]
    AlreadyScheduled(TaskId),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateTaskError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_task() {
        let id = TaskId::new("sync").unwrap();
        assert_eq!(
            DuplicateTaskError(id.clone()).to_string(),
            "task 'sync' already has an execution in flight"
        );
        assert_eq!(
            FetchError::UnknownTask(id).to_string(),
            "task 'sync' is not configured"
        );
    }

    #[test]
    fn backend_errors_name_the_backend() {
        let err = BackendError::Unavailable(BackendKind::JobScheduler);
        assert_eq!(err.to_string(), "job-scheduler backend is unavailable");
    }
}
