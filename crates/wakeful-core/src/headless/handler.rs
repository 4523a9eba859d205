//! HeadlessHandler - アプリ終了中の発火を受け取る handler
//!
//! # 学習ポイント
//! - Object-safe な async trait（`Arc<dyn HeadlessHandler>` でテーブルに入れる）
//! - クロージャを trait object に包むアダプタ（FnHandler）

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::domain::TaskId;

/// Failure reported by a headless handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HeadlessError(pub String);

impl HeadlessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// HeadlessHandler はアプリが起動していない間の発火を処理する
///
/// # 使用例
/// ```ignore
/// struct SyncHandler;
///
/// #[async_trait]
/// impl HeadlessHandler for SyncHandler {
///     async fn on_fetch(&self, task_id: &TaskId) -> Result<(), HeadlessError> {
///         sync_everything().await;
///         Ok(())
///     }
/// }
/// ```
///
/// 完了通知は handler 自身の責任（coordinator はこの時点で発火を完了済み）。
#[async_trait]
pub trait HeadlessHandler: Send + Sync {
    async fn on_fetch(&self, task_id: &TaskId) -> Result<(), HeadlessError>;
}

/// Adapter turning an async closure into a [`HeadlessHandler`].
pub struct FnHandler<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(TaskId) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HeadlessError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> HeadlessHandler for FnHandler<F, Fut>
where
    F: Fn(TaskId) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HeadlessError>> + Send + 'static,
{
    async fn on_fetch(&self, task_id: &TaskId) -> Result<(), HeadlessError> {
        (self.f)(task_id.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn fn_handler_forwards_the_task_id() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = FnHandler::new({
            let calls = calls.clone();
            move |task_id: TaskId| {
                let calls = calls.clone();
                async move {
                    assert!(task_id.is_fetch());
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        });

        handler.on_fetch(&TaskId::fetch()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
