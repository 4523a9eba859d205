//! HeadlessRegistry - headless handler の登録表
//!
//! 名前 → handler の表。組み込み先アプリが起動時に埋め、
//! TaskConfig の `headless_handler` に書かれた名前で引く。
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Arc による共有所有権（呼び出し中にロックを持たない）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::handler::{FnHandler, HeadlessError, HeadlessHandler};
use crate::domain::{ResolveError, TaskId};
use crate::ports::HandlerResolver;

/// RegistryError は HeadlessRegistry の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("headless handler '{0}' is already registered")]
    AlreadyRegistered(String),
}

#[derive(Default)]
pub struct HeadlessRegistry {
    handlers: HashMap<String, Arc<dyn HeadlessHandler>>,
}

impl HeadlessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> Result<(), RegistryError>
    where
        H: HeadlessHandler + 'static,
    {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Register an async closure under `name`.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> Result<(), RegistryError>
    where
        F: Fn(TaskId) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), HeadlessError>> + Send + 'static,
    {
        self.register(name, FnHandler::new(f))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn HeadlessHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl HandlerResolver for HeadlessRegistry {
    async fn invoke(&self, handler_id: &str, task_id: &TaskId) -> Result<(), ResolveError> {
        let handler = self
            .get(handler_id)
            .ok_or_else(|| ResolveError::NotFound(handler_id.to_string()))?;

        handler
            .on_fetch(task_id)
            .await
            .map_err(|e| ResolveError::Invocation {
                handler: handler_id.to_string(),
                reason: e.to_string(),
            })
    }

    fn contains(&self, handler_id: &str) -> bool {
        self.handlers.contains_key(handler_id)
    }
}
