//! JobScheduler port - 制約付きジョブスケジューラ（rich backend）
//!
//! OS のジョブスケジューラそのものは外部の協調者です。
//! このクレートは `JobRequest` を組み立てて渡すだけです。

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{BackendError, ConstraintSet, JobHandle, ScheduleId, ScheduledPayload, TaskId};

/// A registration request for the job scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub schedule_id: ScheduleId,
    pub task_id: TaskId,
    pub periodic: bool,
    /// Period of a periodic job, or minimum latency of a one-shot job.
    pub interval: Duration,
    /// Flex window of a periodic job, when the platform supports one.
    pub flex: Option<Duration>,
    pub constraints: ConstraintSet,
    /// Keep the registration across device reboots.
    pub persisted: bool,
    pub payload: ScheduledPayload,
}

/// JobScheduler は task_id ごとにジョブを登録・取消する
///
/// # 設計原則
/// - 同じ task_id での再登録は既存の登録を置き換える（idempotent）
/// - 未登録 / 既に発火済みの task_id の cancel は no-op
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// `BackendError::Unavailable` when the scheduler service is absent.
    async fn schedule(&self, request: JobRequest) -> Result<JobHandle, BackendError>;

    async fn cancel(&self, task_id: &TaskId);
}
