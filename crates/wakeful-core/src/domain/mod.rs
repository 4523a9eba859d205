//! Domain model (ids, task configuration, validation, backend values, states, outcomes).

pub mod config;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod platform;
pub mod schedule;
pub mod state;
pub mod validate;

pub use self::config::{MINIMUM_FETCH_INTERVAL_MINUTES, NetworkType, RawTaskConfig, TaskConfig};
pub use self::errors::{
    BackendError, ConfigError, DuplicateTaskError, FetchError, LifecycleError, ResolveError,
    StoreError,
};
pub use self::ids::{ExecutionId, FETCH_TASK_ID, ScheduleId, TaskId};
pub use self::outcome::{DedupVerdict, FireOutcome};
pub use self::platform::{BackgroundStatus, PlatformCapabilities};
pub use self::schedule::{BackendHandle, BackendKind, ConstraintSet, JobHandle, ScheduledPayload};
pub use self::state::{CoordinatorState, ExecutionState};
pub use self::validate::{ConfigValidator, ConfigWarning, Validated};
