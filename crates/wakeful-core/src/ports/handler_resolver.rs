//! HandlerResolver port - headless handler の解決と呼び出し
//!
//! アプリが終了している間の発火は、識別子で登録された handler に渡す。
//! 既定の実装は `headless::HeadlessRegistry`（登録済みテーブル、リフレクションなし）。

use async_trait::async_trait;

use crate::domain::{ResolveError, TaskId};

#[async_trait]
pub trait HandlerResolver: Send + Sync {
    /// Locate `handler_id` and run it for `task_id`.
    ///
    /// `ResolveError::NotFound` when nothing is registered under the id,
    /// `ResolveError::Invocation` when the handler itself failed.
    async fn invoke(&self, handler_id: &str, task_id: &TaskId) -> Result<(), ResolveError>;

    /// Whether `handler_id` can be resolved (used for fail-fast checks at build time).
    fn contains(&self, handler_id: &str) -> bool;
}
