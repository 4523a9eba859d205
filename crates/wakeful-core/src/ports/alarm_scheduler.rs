//! AlarmScheduler port - タイマーベースのフォールバック backend
//!
//! 制約は表現できない。絶対時刻と繰り返し間隔だけを渡す。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BackendError, ScheduleId};

/// A timer registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    pub schedule_id: ScheduleId,
    /// Match token used for cancellation (the task id).
    pub token: String,
    /// First fire time.
    pub fire_at: DateTime<Utc>,
    /// Repeat period; `None` for a one-shot alarm.
    pub repeat_every: Option<Duration>,
    /// One-shot alarms ask for exact delivery (allowed while idle).
    pub exact: bool,
}

/// AlarmScheduler は token をキーにタイマーを登録・取消する
///
/// 同じ token で `set` すると既存のタイマーを置き換える。
#[async_trait]
pub trait AlarmScheduler: Send + Sync {
    async fn set(&self, request: AlarmRequest) -> Result<(), BackendError>;

    /// Unknown tokens are a no-op.
    async fn cancel(&self, token: &str);
}
