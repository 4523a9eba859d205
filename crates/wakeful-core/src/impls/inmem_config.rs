//! InMemoryConfigStore - テスト・開発用の設定ストア

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{RawTaskConfig, StoreError, TaskId};
use crate::ports::ConfigStore;

/// Process-local config store. Clones share the same map, so a clone can stand in
/// for the "persisted" store of a restarted coordinator in tests.
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    entries: Arc<Mutex<HashMap<TaskId, RawTaskConfig>>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, RawTaskConfig>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load(&self, task_id: &TaskId) -> Result<Option<RawTaskConfig>, StoreError> {
        Ok(self.lock().get(task_id).cloned())
    }

    async fn save(&self, task_id: &TaskId, config: &RawTaskConfig) -> Result<(), StoreError> {
        self.lock().insert(task_id.clone(), config.clone());
        Ok(())
    }

    async fn remove(&self, task_id: &TaskId) -> Result<(), StoreError> {
        self.lock().remove(task_id);
        Ok(())
    }

    async fn task_ids(&self) -> Result<Vec<TaskId>, StoreError> {
        let mut ids: Vec<TaskId> = self.lock().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_remove() {
        let store = InMemoryConfigStore::new();
        let id = TaskId::fetch();
        let raw = RawTaskConfig::new().with_interval_minutes(30);

        assert_eq!(store.load(&id).await.unwrap(), None);

        store.save(&id, &raw).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(raw));
        assert_eq!(store.task_ids().await.unwrap(), vec![id.clone()]);

        store.remove(&id).await.unwrap();
        assert!(store.is_empty());
        // 未登録の remove は no-op
        store.remove(&id).await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = InMemoryConfigStore::new();
        let other = store.clone();

        store
            .save(&TaskId::fetch(), &RawTaskConfig::new())
            .await
            .unwrap();
        assert_eq!(other.len(), 1);
    }
}
