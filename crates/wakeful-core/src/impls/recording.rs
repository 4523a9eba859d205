//! Recording backends - テスト・シミュレーション用の ports 実装
//!
//! OS のスケジューラやプロセス管理の代わりに、受け取った要求を記録するだけの実装。
//! CLI のシミュレータと各モジュールのテストで使う。

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{BackendError, BackendKind, JobHandle, LifecycleError, TaskId};
use crate::ports::{AlarmRequest, AlarmScheduler, AppLifecycle, JobRequest, JobScheduler};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Job scheduler that records every request and cancellation.
pub struct RecordingJobScheduler {
    next_handle: AtomicU64,
    available: AtomicBool,
    requests: Mutex<Vec<JobRequest>>,
    cancelled: Mutex<Vec<TaskId>>,
}

impl RecordingJobScheduler {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            available: AtomicBool::new(true),
            requests: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    /// While unavailable, `schedule` fails with `BackendError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<JobRequest> {
        lock(&self.requests).clone()
    }

    pub fn cancelled(&self) -> Vec<TaskId> {
        lock(&self.cancelled).clone()
    }
}

impl Default for RecordingJobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobScheduler for RecordingJobScheduler {
    async fn schedule(&self, request: JobRequest) -> Result<JobHandle, BackendError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(BackendKind::JobScheduler));
        }
        lock(&self.requests).push(request);
        Ok(JobHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }

    async fn cancel(&self, task_id: &TaskId) {
        lock(&self.cancelled).push(task_id.clone());
    }
}

/// Alarm scheduler that records every request and cancellation.
pub struct RecordingAlarmScheduler {
    available: AtomicBool,
    requests: Mutex<Vec<AlarmRequest>>,
    cancelled: Mutex<Vec<String>>,
}

impl RecordingAlarmScheduler {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            requests: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<AlarmRequest> {
        lock(&self.requests).clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        lock(&self.cancelled).clone()
    }
}

impl Default for RecordingAlarmScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlarmScheduler for RecordingAlarmScheduler {
    async fn set(&self, request: AlarmRequest) -> Result<(), BackendError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(BackendKind::Alarm));
        }
        lock(&self.requests).push(request);
        Ok(())
    }

    async fn cancel(&self, token: &str) {
        lock(&self.cancelled).push(token.to_string());
    }
}

/// App lifecycle with a switchable foreground flag.
pub struct StaticLifecycle {
    foreground: AtomicBool,
    permission_denied: AtomicBool,
    relaunches: AtomicU32,
}

impl StaticLifecycle {
    pub fn new(foreground: bool) -> Self {
        Self {
            foreground: AtomicBool::new(foreground),
            permission_denied: AtomicBool::new(false),
            relaunches: AtomicU32::new(0),
        }
    }

    pub fn foreground() -> Self {
        Self::new(true)
    }

    pub fn background() -> Self {
        Self::new(false)
    }

    pub fn set_foreground(&self, foreground: bool) {
        self.foreground.store(foreground, Ordering::SeqCst);
    }

    /// While set, `is_foreground` fails with `LifecycleError::PermissionDenied`.
    pub fn set_permission_denied(&self, denied: bool) {
        self.permission_denied.store(denied, Ordering::SeqCst);
    }

    pub fn relaunches(&self) -> u32 {
        self.relaunches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppLifecycle for StaticLifecycle {
    async fn is_foreground(&self) -> Result<bool, LifecycleError> {
        if self.permission_denied.load(Ordering::SeqCst) {
            return Err(LifecycleError::PermissionDenied(
                "foreground state is not readable".to_string(),
            ));
        }
        Ok(self.foreground.load(Ordering::SeqCst))
    }

    async fn relaunch(&self) -> Result<(), LifecycleError> {
        self.relaunches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lifecycle_reports_permission_errors() {
        let lifecycle = StaticLifecycle::background();
        assert!(!lifecycle.is_foreground().await.unwrap());

        lifecycle.set_permission_denied(true);
        assert!(matches!(
            lifecycle.is_foreground().await,
            Err(LifecycleError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn alarm_scheduler_can_be_made_unavailable() {
        let alarms = RecordingAlarmScheduler::new();
        alarms.set_available(false);

        let request = AlarmRequest {
            schedule_id: ulid::Ulid::new().into(),
            token: "t".to_string(),
            fire_at: chrono::Utc::now(),
            repeat_every: None,
            exact: true,
        };
        assert_eq!(
            alarms.set(request).await,
            Err(BackendError::Unavailable(BackendKind::Alarm))
        );
        assert!(alarms.requests().is_empty());
    }
}
