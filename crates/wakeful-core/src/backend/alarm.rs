//! AlarmBackend - タイマーによるフォールバック
//!
//! 制約は渡せない。periodic なら繰り返しタイマー、one-shot なら exact な 1 回きりのタイマー。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;

use super::SchedulingBackend;
use crate::domain::{BackendError, BackendHandle, BackendKind, TaskConfig, TaskId};
use crate::ports::{AlarmRequest, AlarmScheduler, Clock, IdGenerator};

pub struct AlarmBackend {
    scheduler: Arc<dyn AlarmScheduler>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl AlarmBackend {
    pub fn new(
        scheduler: Arc<dyn AlarmScheduler>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            scheduler,
            clock,
            ids,
        }
    }

    pub fn request_for(&self, config: &TaskConfig) -> AlarmRequest {
        let interval = config.minimum_interval();
        let delay = TimeDelta::from_std(interval).unwrap_or(TimeDelta::MAX);

        AlarmRequest {
            schedule_id: self.ids.generate_schedule_id(),
            token: config.task_id().to_string(),
            fire_at: self.clock.now() + delay,
            repeat_every: config.periodic().then_some(interval),
            exact: !config.periodic(),
        }
    }
}

#[async_trait]
impl SchedulingBackend for AlarmBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Alarm
    }

    async fn schedule(&self, config: &TaskConfig) -> Result<BackendHandle, BackendError> {
        let request = self.request_for(config);
        let token = request.token.clone();
        tracing::debug!(
            task_id = %config.task_id(),
            schedule_id = %request.schedule_id,
            fire_at = %request.fire_at,
            "setting alarm"
        );
        self.scheduler.set(request).await?;
        Ok(BackendHandle::Alarm { token })
    }

    async fn cancel(&self, task_id: &TaskId) {
        self.scheduler.cancel(task_id.as_str()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigValidator, RawTaskConfig};
    use crate::impls::RecordingAlarmScheduler;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case::periodic(true, Some(Duration::from_secs(20 * 60)), false)]
    #[case::one_shot(false, None, true)]
    #[tokio::test]
    async fn alarm_request_shape(
        #[case] periodic: bool,
        #[case] repeat_every: Option<Duration>,
        #[case] exact: bool,
    ) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let ids = Arc::new(UlidGenerator::new(clock.clone()));
        let alarms = Arc::new(RecordingAlarmScheduler::new());
        let backend = AlarmBackend::new(alarms.clone(), clock, ids);
        let raw = RawTaskConfig::new()
            .with_interval_minutes(20)
            .with_periodic(periodic);
        let config = ConfigValidator::validate(TaskId::fetch(), &raw).config;

        let handle = backend.schedule(&config).await.unwrap();
        assert_eq!(
            handle,
            BackendHandle::Alarm {
                token: TaskId::fetch().to_string()
            }
        );

        let request = &alarms.requests()[0];
        assert_eq!(request.fire_at, now + chrono::Duration::minutes(20));
        assert_eq!(request.repeat_every, repeat_every);
        assert_eq!(request.exact, exact);
    }
}
