//! Backend - スケジューリング backend の選択
//!
//! 1 つのタスクは 2 種類の wake-up primitive のどちらか一方で登録される。
//! - **JobSchedulerBackend**: 制約付きジョブスケジューラ（新しいプラットフォーム）
//! - **AlarmBackend**: タイマーによるフォールバック
//!
//! どちらを使うかは `PlatformCapabilities` とタスクごとの `force_alarm_manager` で決まる。

pub mod alarm;
pub mod job;

use async_trait::async_trait;

use crate::domain::{
    BackendError, BackendHandle, BackendKind, PlatformCapabilities, TaskConfig, TaskId,
};

pub use self::alarm::AlarmBackend;
pub use self::job::JobSchedulerBackend;

/// A wake-up primitive that can register and cancel task schedules.
#[async_trait]
pub trait SchedulingBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn schedule(&self, config: &TaskConfig) -> Result<BackendHandle, BackendError>;

    /// No-op when nothing is registered for `task_id`.
    async fn cancel(&self, task_id: &TaskId);
}

/// Chooses the backend for each task.
///
/// Either backend may be missing (the host did not provide it); scheduling on a
/// missing backend fails with `BackendError::Unavailable`.
pub struct BackendSelector {
    capabilities: PlatformCapabilities,
    job: Option<JobSchedulerBackend>,
    alarm: Option<AlarmBackend>,
}

impl BackendSelector {
    pub fn new(
        capabilities: PlatformCapabilities,
        job: Option<JobSchedulerBackend>,
        alarm: Option<AlarmBackend>,
    ) -> Self {
        Self {
            capabilities,
            job,
            alarm,
        }
    }

    pub fn capabilities(&self) -> &PlatformCapabilities {
        &self.capabilities
    }

    /// Which backend `config` is scheduled on.
    pub fn select(&self, config: &TaskConfig) -> BackendKind {
        if self.capabilities.rich_scheduler && !config.force_alarm_manager() {
            BackendKind::JobScheduler
        } else {
            BackendKind::Alarm
        }
    }

    pub async fn schedule(&self, config: &TaskConfig) -> Result<BackendHandle, BackendError> {
        let kind = self.select(config);
        let backend = self
            .backend(kind)
            .ok_or(BackendError::Unavailable(kind))?;

        let handle = backend.schedule(config).await?;
        tracing::info!(
            task_id = %config.task_id(),
            backend = %kind,
            interval_minutes = config.interval_minutes(),
            periodic = config.periodic(),
            "task scheduled"
        );
        Ok(handle)
    }

    /// Cancel on the backend that issued `handle`.
    pub async fn cancel(&self, task_id: &TaskId, handle: &BackendHandle) {
        match self.backend(handle.kind()) {
            Some(backend) => backend.cancel(task_id).await,
            None => {
                tracing::debug!(task_id = %task_id, backend = %handle.kind(), "cancel: backend absent")
            }
        }
    }

    /// Cancel on every backend (the issuing one is unknown, e.g. after a restart).
    pub async fn cancel_any(&self, task_id: &TaskId) {
        if let Some(job) = &self.job {
            job.cancel(task_id).await;
        }
        if let Some(alarm) = &self.alarm {
            alarm.cancel(task_id).await;
        }
    }

    fn backend(&self, kind: BackendKind) -> Option<&dyn SchedulingBackend> {
        match kind {
            BackendKind::JobScheduler => self.job.as_ref().map(|b| b as &dyn SchedulingBackend),
            BackendKind::Alarm => self.alarm.as_ref().map(|b| b as &dyn SchedulingBackend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigValidator, RawTaskConfig};
    use crate::impls::{RecordingAlarmScheduler, RecordingJobScheduler};
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::sync::Arc;

    struct Fixture {
        jobs: Arc<RecordingJobScheduler>,
        alarms: Arc<RecordingAlarmScheduler>,
        selector: BackendSelector,
    }

    fn fixture(capabilities: PlatformCapabilities) -> Fixture {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let ids = Arc::new(UlidGenerator::new(clock.clone()));
        let jobs = Arc::new(RecordingJobScheduler::new());
        let alarms = Arc::new(RecordingAlarmScheduler::new());

        let selector = BackendSelector::new(
            capabilities,
            Some(JobSchedulerBackend::new(
                jobs.clone(),
                capabilities,
                clock.clone(),
                ids.clone(),
            )),
            Some(AlarmBackend::new(alarms.clone(), clock, ids)),
        );
        Fixture {
            jobs,
            alarms,
            selector,
        }
    }

    fn config(raw: RawTaskConfig) -> TaskConfig {
        ConfigValidator::validate(TaskId::fetch(), &raw).config
    }

    #[rstest]
    #[case::modern(PlatformCapabilities::modern(), false, BackendKind::JobScheduler)]
    #[case::forced(PlatformCapabilities::modern(), true, BackendKind::Alarm)]
    #[case::legacy(PlatformCapabilities::legacy(), false, BackendKind::Alarm)]
    #[case::legacy_forced(PlatformCapabilities::legacy(), true, BackendKind::Alarm)]
    fn selection_follows_capabilities_and_override(
        #[case] capabilities: PlatformCapabilities,
        #[case] force_alarm: bool,
        #[case] expected: BackendKind,
    ) {
        let f = fixture(capabilities);
        let config = config(RawTaskConfig::new().with_force_alarm_manager(force_alarm));

        assert_eq!(f.selector.select(&config), expected);
    }

    #[tokio::test]
    async fn schedule_uses_exactly_one_backend() {
        let f = fixture(PlatformCapabilities::modern());

        let handle = f
            .selector
            .schedule(&config(RawTaskConfig::new()))
            .await
            .unwrap();

        assert_eq!(handle.kind(), BackendKind::JobScheduler);
        assert_eq!(f.jobs.requests().len(), 1);
        assert!(f.alarms.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_backend_is_unavailable() {
        let selector = BackendSelector::new(PlatformCapabilities::modern(), None, None);

        let err = selector
            .schedule(&config(RawTaskConfig::new()))
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::Unavailable(BackendKind::JobScheduler));
    }

    #[tokio::test]
    async fn cancel_goes_to_the_issuing_backend() {
        let f = fixture(PlatformCapabilities::modern());
        let id = TaskId::fetch();

        f.selector
            .cancel(&id, &BackendHandle::Alarm {
                token: id.to_string(),
            })
            .await;

        assert_eq!(f.alarms.cancelled(), vec![id.to_string()]);
        assert!(f.jobs.cancelled().is_empty());
    }

    #[tokio::test]
    async fn cancel_any_reaches_both_backends() {
        let f = fixture(PlatformCapabilities::modern());
        let id = TaskId::fetch();

        f.selector.cancel_any(&id).await;

        assert_eq!(f.jobs.cancelled(), vec![id.clone()]);
        assert_eq!(f.alarms.cancelled(), vec![id.to_string()]);
    }
}
