//! JobSchedulerBackend - 制約付きジョブスケジューラへの登録

use std::sync::Arc;

use async_trait::async_trait;

use super::SchedulingBackend;
use crate::domain::{
    BackendError, BackendHandle, BackendKind, ConstraintSet, PlatformCapabilities,
    ScheduledPayload, TaskConfig, TaskId,
};
use crate::ports::{Clock, IdGenerator, JobRequest, JobScheduler};

pub struct JobSchedulerBackend {
    scheduler: Arc<dyn JobScheduler>,
    capabilities: PlatformCapabilities,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl JobSchedulerBackend {
    pub fn new(
        scheduler: Arc<dyn JobScheduler>,
        capabilities: PlatformCapabilities,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            scheduler,
            capabilities,
            clock,
            ids,
        }
    }

    /// Build the registration request for `config`.
    ///
    /// Constraints the platform cannot express are left out of the request.
    pub fn request_for(&self, config: &TaskConfig) -> JobRequest {
        let interval = config.minimum_interval();
        let flex = (config.periodic() && self.capabilities.flex_interval).then_some(interval);

        JobRequest {
            schedule_id: self.ids.generate_schedule_id(),
            task_id: config.task_id().clone(),
            periodic: config.periodic(),
            interval,
            flex,
            constraints: ConstraintSet::from_config(config, &self.capabilities),
            persisted: config.persisted(),
            payload: ScheduledPayload {
                task_id: config.task_id().clone(),
                scheduled_at: self.clock.now(),
            },
        }
    }
}

#[async_trait]
impl SchedulingBackend for JobSchedulerBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::JobScheduler
    }

    async fn schedule(&self, config: &TaskConfig) -> Result<BackendHandle, BackendError> {
        let request = self.request_for(config);
        tracing::debug!(
            task_id = %request.task_id,
            schedule_id = %request.schedule_id,
            persisted = request.persisted,
            "submitting job"
        );
        let job = self.scheduler.schedule(request).await?;
        Ok(BackendHandle::Job { job })
    }

    async fn cancel(&self, task_id: &TaskId) {
        self.scheduler.cancel(task_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigValidator, NetworkType, RawTaskConfig};
    use crate::impls::RecordingJobScheduler;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn backend(
        capabilities: PlatformCapabilities,
    ) -> (Arc<FixedClock>, Arc<RecordingJobScheduler>, JobSchedulerBackend) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let ids = Arc::new(UlidGenerator::new(clock.clone()));
        let scheduler = Arc::new(RecordingJobScheduler::new());
        let backend = JobSchedulerBackend::new(scheduler.clone(), capabilities, clock.clone(), ids);
        (clock, scheduler, backend)
    }

    #[tokio::test]
    async fn periodic_job_carries_constraints_flex_and_payload() {
        let (clock, scheduler, backend) = backend(PlatformCapabilities::modern());
        let raw = RawTaskConfig::new()
            .with_interval_minutes(30)
            .with_network_type(NetworkType::Any)
            .with_requires_storage_not_low(true)
            .with_headless_handler("sync")
            .with_stop_on_terminate(false)
            .with_start_on_boot(true);
        let config = ConfigValidator::validate(TaskId::fetch(), &raw).config;

        let handle = backend.schedule(&config).await.unwrap();
        assert!(matches!(handle, BackendHandle::Job { .. }));

        let requests = scheduler.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.periodic);
        assert_eq!(request.interval, Duration::from_secs(30 * 60));
        assert_eq!(request.flex, Some(Duration::from_secs(30 * 60)));
        assert!(request.persisted);
        assert_eq!(request.constraints.network_type, NetworkType::Any);
        assert_eq!(request.constraints.requires_storage_not_low, Some(true));
        assert_eq!(request.payload.task_id, TaskId::fetch());
        assert_eq!(request.payload.scheduled_at, clock.now());
    }

    #[tokio::test]
    async fn legacy_rich_platform_omits_flex_and_extended_constraints() {
        let mut caps = PlatformCapabilities::modern();
        caps.flex_interval = false;
        caps.battery_storage_constraints = false;
        let (_clock, scheduler, backend) = backend(caps);
        let raw = RawTaskConfig::new().with_requires_battery_not_low(true);
        let config = ConfigValidator::validate(TaskId::fetch(), &raw).config;

        backend.schedule(&config).await.unwrap();

        let request = &scheduler.requests()[0];
        assert_eq!(request.flex, None);
        assert_eq!(request.constraints.requires_battery_not_low, None);
        assert!(!request.persisted);
    }

    #[tokio::test]
    async fn one_shot_job_uses_interval_as_latency() {
        let (_clock, scheduler, backend) = backend(PlatformCapabilities::modern());
        let id = TaskId::new("upload").unwrap();
        let config = ConfigValidator::validate(id.clone(), &RawTaskConfig::new()).config;

        backend.schedule(&config).await.unwrap();

        let request = &scheduler.requests()[0];
        assert_eq!(request.task_id, id);
        assert!(!request.periodic);
        assert_eq!(request.flex, None);
        assert_eq!(request.interval, Duration::from_secs(15 * 60));
    }

    #[tokio::test]
    async fn unavailable_scheduler_is_reported() {
        let (_clock, scheduler, backend) = backend(PlatformCapabilities::modern());
        scheduler.set_available(false);
        let config = ConfigValidator::validate(TaskId::fetch(), &RawTaskConfig::new()).config;

        let err = backend.schedule(&config).await.unwrap_err();
        assert_eq!(err, BackendError::Unavailable(BackendKind::JobScheduler));
    }
}
