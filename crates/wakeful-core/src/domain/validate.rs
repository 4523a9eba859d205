//! ConfigValidator - 設定の矛盾を補正する（fail soft）
//!
//! 矛盾した設定は拒否せず、問題のフィールドを上書きして `ConfigWarning` を記録します。
//! 起動直後の新しい設定だけでなく、ConfigStore から読み戻した古い設定にも適用します。

use std::fmt;

use super::config::{MINIMUM_FETCH_INTERVAL_MINUTES, NetworkType, RawTaskConfig, TaskConfig};
use super::ids::TaskId;

/// A correction applied by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `requiredNetworkType` was not a known code; `NetworkType::None` was used.
    InvalidNetworkType { code: i32 },

    /// A headless handler cannot be combined with `forceReload`.
    ForceReloadDisabled,

    /// Without a headless handler or `forceReload` nothing can run after termination.
    StopOnTerminateEnforced,

    /// Without a headless handler or `forceReload` nothing can run after boot.
    StartOnBootDisabled,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNetworkType { code } => {
                write!(f, "invalid requiredNetworkType {code}; using none")
            }
            Self::ForceReloadDisabled => {
                f.write_str("headless handler is incompatible with forceReload; enforcing forceReload: false")
            }
            Self::StopOnTerminateEnforced => f.write_str(
                "{forceReload: false, headlessHandler: null} is incompatible with stopOnTerminate: false; enforcing stopOnTerminate: true",
            ),
            Self::StartOnBootDisabled => f.write_str(
                "{forceReload: false, headlessHandler: null} is incompatible with startOnBoot: true; enforcing startOnBoot: false",
            ),
        }
    }
}

/// Result of validation: the accepted config plus every correction made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub config: TaskConfig,
    pub warnings: Vec<ConfigWarning>,
}

impl Validated {
    pub fn is_corrected(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Applies defaults, the interval floor and the cross-field invariants.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate `raw` for `task_id`. Never fails.
    ///
    /// Defaults: 15 minute interval, `periodic` only for the fetch task,
    /// `stopOnTerminate: true` unless a headless handler is set, everything else off.
    pub fn validate(task_id: TaskId, raw: &RawTaskConfig) -> Validated {
        let mut warnings = Vec::new();

        let requested = raw
            .minimum_fetch_interval
            .unwrap_or(MINIMUM_FETCH_INTERVAL_MINUTES);
        let interval_minutes = requested.max(MINIMUM_FETCH_INTERVAL_MINUTES);
        if interval_minutes != requested {
            tracing::debug!(
                task_id = %task_id,
                requested,
                applied = interval_minutes,
                "interval raised to platform minimum"
            );
        }

        let network_type = match raw.required_network_type {
            None => NetworkType::None,
            Some(code) => NetworkType::from_code(code).unwrap_or_else(|| {
                warnings.push(ConfigWarning::InvalidNetworkType { code });
                NetworkType::None
            }),
        };

        let headless_handler = raw.headless_handler.clone().filter(|h| !h.trim().is_empty());
        let mut force_reload = raw.force_reload.unwrap_or(false);
        // headless handler があれば終了後も発火を受け取る
        let mut stop_on_terminate = raw.stop_on_terminate.unwrap_or(headless_handler.is_none());
        let mut start_on_boot = raw.start_on_boot.unwrap_or(false);

        if headless_handler.is_some() {
            if force_reload {
                warnings.push(ConfigWarning::ForceReloadDisabled);
                force_reload = false;
            }
        } else if !force_reload {
            if !stop_on_terminate {
                warnings.push(ConfigWarning::StopOnTerminateEnforced);
                stop_on_terminate = true;
            }
            if start_on_boot {
                warnings.push(ConfigWarning::StartOnBootDisabled);
                start_on_boot = false;
            }
        }

        for warning in &warnings {
            tracing::warn!(task_id = %task_id, "configuration error: {warning}");
        }

        let periodic = raw.periodic.unwrap_or_else(|| task_id.is_fetch());
        let config = TaskConfig {
            task_id,
            interval_minutes,
            periodic,
            network_type,
            requires_charging: raw.requires_charging.unwrap_or(false),
            requires_device_idle: raw.requires_device_idle.unwrap_or(false),
            requires_battery_not_low: raw.requires_battery_not_low.unwrap_or(false),
            requires_storage_not_low: raw.requires_storage_not_low.unwrap_or(false),
            stop_on_terminate,
            start_on_boot,
            force_reload,
            force_alarm_manager: raw.force_alarm_manager.unwrap_or(false),
            headless_handler,
        };

        Validated { config, warnings }
    }
}
