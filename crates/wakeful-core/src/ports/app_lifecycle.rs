//! AppLifecycle port - ホストアプリの foreground 判定と再起動

use async_trait::async_trait;

use crate::domain::LifecycleError;

#[async_trait]
pub trait AppLifecycle: Send + Sync {
    /// Is the host application in the foreground?
    ///
    /// `LifecycleError::PermissionDenied` must be returned, not mapped to `false`:
    /// the answer selects the dispatch branch.
    async fn is_foreground(&self) -> Result<bool, LifecycleError>;

    /// Ask the platform to relaunch the host process.
    async fn relaunch(&self) -> Result<(), LifecycleError>;
}
