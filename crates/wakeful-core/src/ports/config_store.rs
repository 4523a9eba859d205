//! ConfigStore port - タスク設定の永続化
//!
//! プロセス再起動（headless 起動・端末再起動）後に設定を読み戻すために使う。
//! 読み戻した設定は必ず ConfigValidator を通し直す。
//!
//! # 実装
//! - **InMemoryConfigStore**: テスト・開発用
//! - **JsonFileConfigStore**: JSON ファイル

use async_trait::async_trait;

use crate::domain::{RawTaskConfig, StoreError, TaskId};

/// Key-value persistence of raw task configuration, keyed by task id.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self, task_id: &TaskId) -> Result<Option<RawTaskConfig>, StoreError>;

    async fn save(&self, task_id: &TaskId, config: &RawTaskConfig) -> Result<(), StoreError>;

    /// Removing an unknown id is a no-op.
    async fn remove(&self, task_id: &TaskId) -> Result<(), StoreError>;

    /// Every stored task id.
    async fn task_ids(&self) -> Result<Vec<TaskId>, StoreError>;
}
