//! Platform capability flags, injected from outside the core.

use serde::{Deserialize, Serialize};

/// Whether the host allows background wake-ups at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundStatus {
    /// Background execution is restricted by the device (parental controls etc.).
    Restricted,
    /// The user disabled background execution for this app.
    Denied,
    Available,
}

/// What the running platform can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    /// A constraint-aware job scheduler is present.
    pub rich_scheduler: bool,
    /// Periodic jobs accept a flex window.
    pub flex_interval: bool,
    /// Battery-not-low / storage-not-low constraints are expressible.
    pub battery_storage_constraints: bool,
    pub background_status: BackgroundStatus,
}

impl PlatformCapabilities {
    /// A current platform: every capability present.
    pub fn modern() -> Self {
        Self {
            rich_scheduler: true,
            flex_interval: true,
            battery_storage_constraints: true,
            background_status: BackgroundStatus::Available,
        }
    }

    /// An old platform: only the timer backend.
    pub fn legacy() -> Self {
        Self {
            rich_scheduler: false,
            flex_interval: false,
            battery_storage_constraints: false,
            background_status: BackgroundStatus::Available,
        }
    }

    pub fn with_background_status(mut self, status: BackgroundStatus) -> Self {
        self.background_status = status;
        self
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::modern()
    }
}
