//! JsonFileConfigStore - JSON ファイルに設定を保存する
//!
//! 1 つのファイルに `{ "<task id>": { ...raw config... } }` の map を保存する。
//! ファイルが無ければ空として扱う。壊れた JSON は `StoreError::Encoding` として返す。
//!
//! # 学習ポイント
//! - std::fs のブロッキング I/O は spawn_blocking に逃がす
//! - 書き込みは一時ファイル + rename（途中で落ちても元のファイルは壊れない）

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RawTaskConfig, StoreError, TaskId};
use crate::ports::ConfigStore;

type Entries = BTreeMap<TaskId, RawTaskConfig>;

pub struct JsonFileConfigStore {
    path: Arc<PathBuf>,
    /// Serializes read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl JsonFileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Entries, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_entries(&path))
            .await
            .map_err(|e| StoreError::Worker(format!("read failed: {e}")))?
    }

    async fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Entries) + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut entries = read_entries(&path)?;
            f(&mut entries);
            write_entries(&path, &entries)
        })
        .await
        .map_err(|e| StoreError::Worker(format!("write failed: {e}")))?
    }
}

fn read_entries(path: &Path) -> Result<Entries, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(Entries::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_entries(path: &Path, entries: &Entries) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl ConfigStore for JsonFileConfigStore {
    async fn load(&self, task_id: &TaskId) -> Result<Option<RawTaskConfig>, StoreError> {
        Ok(self.read().await?.remove(task_id))
    }

    async fn save(&self, task_id: &TaskId, config: &RawTaskConfig) -> Result<(), StoreError> {
        let task_id = task_id.clone();
        let config = config.clone();
        self.update(move |entries| {
            entries.insert(task_id, config);
        })
        .await
    }

    async fn remove(&self, task_id: &TaskId) -> Result<(), StoreError> {
        let task_id = task_id.clone();
        self.update(move |entries| {
            entries.remove(&task_id);
        })
        .await
    }

    async fn task_ids(&self) -> Result<Vec<TaskId>, StoreError> {
        Ok(self.read().await?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("wakeful-{}", Ulid::new()))
            .join("tasks.json")
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let store = JsonFileConfigStore::new(temp_path());

        assert_eq!(store.load(&TaskId::fetch()).await.unwrap(), None);
        assert!(store.task_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_survive_a_new_store_instance() {
        let path = temp_path();
        let id = TaskId::new("upload").unwrap();
        let raw = RawTaskConfig::new()
            .with_interval_minutes(60)
            .with_start_on_boot(true)
            .with_headless_handler("uploader");

        JsonFileConfigStore::new(&path)
            .save(&id, &raw)
            .await
            .unwrap();

        let reopened = JsonFileConfigStore::new(&path);
        assert_eq!(reopened.load(&id).await.unwrap(), Some(raw));
        assert_eq!(reopened.task_ids().await.unwrap(), vec![id.clone()]);

        reopened.remove(&id).await.unwrap();
        assert_eq!(reopened.load(&id).await.unwrap(), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn file_uses_camel_case_keys() {
        let path = temp_path();
        let store = JsonFileConfigStore::new(&path);
        store
            .save(
                &TaskId::fetch(),
                &RawTaskConfig::new().with_stop_on_terminate(false),
            )
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"wakeful.fetch\""));
        assert!(text.contains("\"stopOnTerminate\": false"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_encoding_error() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileConfigStore::new(&path)
            .load(&TaskId::fetch())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Encoding(_)));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
