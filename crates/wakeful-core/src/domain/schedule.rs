//! Values exchanged with scheduling backends.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{NetworkType, TaskConfig};
use super::ids::TaskId;
use super::platform::PlatformCapabilities;

/// Which wake-up primitive issued a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Constraint-aware job scheduler.
    JobScheduler,
    /// Timer / alarm fallback.
    Alarm,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JobScheduler => f.write_str("job-scheduler"),
            Self::Alarm => f.write_str("alarm"),
        }
    }
}

/// Opaque handle the job scheduler assigns to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub u64);

/// Handle of a backend registration, tagged by the backend that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendHandle {
    Job { job: JobHandle },
    /// Alarms are matched by token for cancellation; the token is the task id.
    Alarm { token: String },
}

impl BackendHandle {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Job { .. } => BackendKind::JobScheduler,
            Self::Alarm { .. } => BackendKind::Alarm,
        }
    }
}

/// Constraints handed to the job scheduler.
///
/// `None` means the platform cannot express the constraint and it was omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub network_type: NetworkType,
    pub requires_charging: bool,
    pub requires_device_idle: bool,
    pub requires_battery_not_low: Option<bool>,
    pub requires_storage_not_low: Option<bool>,
}

impl ConstraintSet {
    pub fn from_config(config: &TaskConfig, capabilities: &PlatformCapabilities) -> Self {
        let extended = capabilities.battery_storage_constraints;
        Self {
            network_type: config.network_type(),
            requires_charging: config.requires_charging(),
            requires_device_idle: config.requires_device_idle(),
            requires_battery_not_low: extended.then_some(config.requires_battery_not_low()),
            requires_storage_not_low: extended.then_some(config.requires_storage_not_low()),
        }
    }
}

/// Opaque payload the job scheduler hands back when the job fires.
///
/// `scheduled_at` lets the fire path drop the immediate spurious event some
/// schedulers emit right after a periodic registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPayload {
    pub task_id: TaskId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub scheduled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::RawTaskConfig;
    use crate::domain::validate::ConfigValidator;
    use chrono::TimeZone;

    fn config() -> TaskConfig {
        let raw = RawTaskConfig::new()
            .with_network_type(NetworkType::Unmetered)
            .with_requires_charging(true)
            .with_requires_battery_not_low(true)
            .with_requires_storage_not_low(false);
        ConfigValidator::validate(TaskId::fetch(), &raw).config
    }

    #[test]
    fn constraints_keep_extended_flags_on_modern_platforms() {
        let set = ConstraintSet::from_config(&config(), &PlatformCapabilities::modern());

        assert_eq!(set.network_type, NetworkType::Unmetered);
        assert!(set.requires_charging);
        assert_eq!(set.requires_battery_not_low, Some(true));
        assert_eq!(set.requires_storage_not_low, Some(false));
    }

    #[test]
    fn constraints_omit_unsupported_flags() {
        let mut caps = PlatformCapabilities::modern();
        caps.battery_storage_constraints = false;
        let set = ConstraintSet::from_config(&config(), &caps);

        assert_eq!(set.requires_battery_not_low, None);
        assert_eq!(set.requires_storage_not_low, None);
        assert!(set.requires_charging);
    }

    #[test]
    fn payload_encodes_schedule_time_as_epoch_millis() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let payload = ScheduledPayload {
            task_id: TaskId::fetch(),
            scheduled_at: at,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["taskId"], "wakeful.fetch");
        assert_eq!(json["scheduledAt"], at.timestamp_millis());
    }

    #[test]
    fn handle_reports_issuing_backend() {
        let job = BackendHandle::Job { job: JobHandle(7) };
        let alarm = BackendHandle::Alarm {
            token: "wakeful.fetch".into(),
        };
        assert_eq!(job.kind(), BackendKind::JobScheduler);
        assert_eq!(alarm.kind(), BackendKind::Alarm);
    }
}
