//! Task configuration: the raw (stored / user supplied) form and the validated form.
//!
//! `RawTaskConfig` is what the config store persists and what the embedding
//! application passes in. Every field is optional because stored values may predate
//! newer fields. `TaskConfig` is only produced by [`ConfigValidator`], so every
//! `TaskConfig` in the system already satisfies the cross-field invariants.
//!
//! [`ConfigValidator`]: super::validate::ConfigValidator

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ids::TaskId;

/// Platform-imposed floor of the wake-up interval, in minutes.
pub const MINIMUM_FETCH_INTERVAL_MINUTES: u32 = 15;

/// Network requirement of a task (integer codes match the stored form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    /// No network needed.
    #[default]
    None,
    Any,
    Unmetered,
    NotRoaming,
    Cellular,
}

impl NetworkType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Any),
            2 => Some(Self::Unmetered),
            3 => Some(Self::NotRoaming),
            4 => Some(Self::Cellular),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Any => 1,
            Self::Unmetered => 2,
            Self::NotRoaming => 3,
            Self::Cellular => 4,
        }
    }
}

/// Unvalidated task configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTaskConfig {
    /// Wake-up interval in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_fetch_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on_terminate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_on_boot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_reload: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_alarm_manager: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_network_type: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_battery_not_low: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_charging: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_device_idle: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_storage_not_low: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless_handler: Option<String>,
}

impl RawTaskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval_minutes(mut self, minutes: u32) -> Self {
        self.minimum_fetch_interval = Some(minutes);
        self
    }

    pub fn with_periodic(mut self, periodic: bool) -> Self {
        self.periodic = Some(periodic);
        self
    }

    pub fn with_stop_on_terminate(mut self, value: bool) -> Self {
        self.stop_on_terminate = Some(value);
        self
    }

    pub fn with_start_on_boot(mut self, value: bool) -> Self {
        self.start_on_boot = Some(value);
        self
    }

    pub fn with_force_reload(mut self, value: bool) -> Self {
        self.force_reload = Some(value);
        self
    }

    pub fn with_force_alarm_manager(mut self, value: bool) -> Self {
        self.force_alarm_manager = Some(value);
        self
    }

    pub fn with_network_type(mut self, network: NetworkType) -> Self {
        self.required_network_type = Some(network.code());
        self
    }

    pub fn with_requires_charging(mut self, value: bool) -> Self {
        self.requires_charging = Some(value);
        self
    }

    pub fn with_requires_device_idle(mut self, value: bool) -> Self {
        self.requires_device_idle = Some(value);
        self
    }

    pub fn with_requires_battery_not_low(mut self, value: bool) -> Self {
        self.requires_battery_not_low = Some(value);
        self
    }

    pub fn with_requires_storage_not_low(mut self, value: bool) -> Self {
        self.requires_storage_not_low = Some(value);
        self
    }

    pub fn with_headless_handler(mut self, handler: impl Into<String>) -> Self {
        self.headless_handler = Some(handler.into());
        self
    }
}

/// Validated, immutable task configuration.
///
/// Invariants (established by the validator):
/// - `headless_handler.is_some()` implies `!force_reload`
/// - `headless_handler.is_none() && !force_reload` implies
///   `stop_on_terminate && !start_on_boot`
/// - `interval_minutes >= MINIMUM_FETCH_INTERVAL_MINUTES`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    pub(crate) task_id: TaskId,
    pub(crate) interval_minutes: u32,
    pub(crate) periodic: bool,
    pub(crate) network_type: NetworkType,
    pub(crate) requires_charging: bool,
    pub(crate) requires_device_idle: bool,
    pub(crate) requires_battery_not_low: bool,
    pub(crate) requires_storage_not_low: bool,
    pub(crate) stop_on_terminate: bool,
    pub(crate) start_on_boot: bool,
    pub(crate) force_reload: bool,
    pub(crate) force_alarm_manager: bool,
    pub(crate) headless_handler: Option<String>,
}

impl TaskConfig {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn minimum_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }

    pub fn periodic(&self) -> bool {
        self.periodic
    }

    pub fn network_type(&self) -> NetworkType {
        self.network_type
    }

    pub fn requires_network(&self) -> bool {
        self.network_type != NetworkType::None
    }

    pub fn requires_charging(&self) -> bool {
        self.requires_charging
    }

    pub fn requires_device_idle(&self) -> bool {
        self.requires_device_idle
    }

    pub fn requires_battery_not_low(&self) -> bool {
        self.requires_battery_not_low
    }

    pub fn requires_storage_not_low(&self) -> bool {
        self.requires_storage_not_low
    }

    pub fn stop_on_terminate(&self) -> bool {
        self.stop_on_terminate
    }

    pub fn start_on_boot(&self) -> bool {
        self.start_on_boot
    }

    pub fn force_reload(&self) -> bool {
        self.force_reload
    }

    pub fn force_alarm_manager(&self) -> bool {
        self.force_alarm_manager
    }

    pub fn headless_handler(&self) -> Option<&str> {
        self.headless_handler.as_deref()
    }

    /// Whether the backend should keep the registration across device reboots.
    pub fn persisted(&self) -> bool {
        self.start_on_boot && !self.stop_on_terminate
    }

    /// The stored form of this configuration (every field present).
    pub fn to_raw(&self) -> RawTaskConfig {
        RawTaskConfig {
            minimum_fetch_interval: Some(self.interval_minutes),
            periodic: Some(self.periodic),
            stop_on_terminate: Some(self.stop_on_terminate),
            start_on_boot: Some(self.start_on_boot),
            force_reload: Some(self.force_reload),
            force_alarm_manager: Some(self.force_alarm_manager),
            required_network_type: Some(self.network_type.code()),
            requires_battery_not_low: Some(self.requires_battery_not_low),
            requires_charging: Some(self.requires_charging),
            requires_device_idle: Some(self.requires_device_idle),
            requires_storage_not_low: Some(self.requires_storage_not_low),
            headless_handler: self.headless_handler.clone(),
        }
    }
}

impl fmt::Display for TaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.to_raw()).map_err(|_| fmt::Error)?;
        write!(f, "[{}] {}", self.task_id, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, NetworkType::None)]
    #[case(1, NetworkType::Any)]
    #[case(2, NetworkType::Unmetered)]
    #[case(3, NetworkType::NotRoaming)]
    #[case(4, NetworkType::Cellular)]
    fn network_codes_map_both_ways(#[case] code: i32, #[case] network: NetworkType) {
        assert_eq!(NetworkType::from_code(code), Some(network));
        assert_eq!(network.code(), code);
    }

    #[test]
    fn unknown_network_code_is_not_mapped() {
        assert_eq!(NetworkType::from_code(7), None);
        assert_eq!(NetworkType::from_code(-1), None);
    }

    #[test]
    fn raw_config_uses_camel_case_and_skips_absent_fields() {
        let raw = RawTaskConfig::new()
            .with_interval_minutes(30)
            .with_headless_handler("sync");
        let json = serde_json::to_value(&raw).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "minimumFetchInterval": 30, "headlessHandler": "sync" })
        );
    }

    #[test]
    fn raw_config_accepts_partial_documents() {
        let raw: RawTaskConfig =
            serde_json::from_str(r#"{ "stopOnTerminate": false }"#).unwrap();
        assert_eq!(raw.stop_on_terminate, Some(false));
        assert_eq!(raw.minimum_fetch_interval, None);
    }
}
