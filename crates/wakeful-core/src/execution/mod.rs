//! Execution tracking: completion signals, duplicate suppression, in-flight registry.

pub mod completion;
pub mod dedup;
pub mod registry;

pub use self::completion::CompletionHandler;
pub use self::dedup::{DedupGuard, DedupPolicy};
pub use self::registry::{DuplicateRegistration, ExecutingTaskView, TaskRegistry};
