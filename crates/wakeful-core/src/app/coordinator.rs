//! FetchCoordinator - 発火の受付から完了までを束ねる状態機械
//!
//! # 状態遷移
//! - Coordinator: Unconfigured → Configured → Scheduled、Stopped はどこからでも
//! - 発火ごと: DedupGuard → TaskRegistry.register → dispatch（5 分岐のうち 1 つ）
//!
//! # dispatch の優先順位
//! 1. foreground かつ live callback あり → live callback（finish / timeout まで登録を保持）
//! 2. stop_on_terminate → 完了して全体を stop
//! 3. force_reload → アプリを再起動して完了
//! 4. headless handler → 完了してから handler を別タスクで起動（終了を待たない）
//! 5. どれでもない → 設定の穴として警告し、2 と同じく stop
//!
//! # ロックの方針
//! - `inner`（状態・設定・backend handle・listener）は std Mutex で短く保持する
//! - backend / store / lifecycle / listener / resolver を呼ぶ間はロックを持たない

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use super::event::{FetchListener, FiredEvent};
use super::status::{ConfiguredTask, CoordinatorStatus};
use crate::backend::BackendSelector;
use crate::domain::{
    BackendHandle, BackgroundStatus, ConfigValidator, CoordinatorState, FetchError, FireOutcome,
    RawTaskConfig, ResolveError, TaskConfig, TaskId, Validated,
};
use crate::execution::{DedupGuard, TaskRegistry};
use crate::ports::{AppLifecycle, ConfigStore, HandlerResolver};

struct TaskEntry {
    config: TaskConfig,
    /// Registration on the backend, if scheduling succeeded.
    handle: Option<BackendHandle>,
}

struct Inner {
    state: CoordinatorState,
    tasks: BTreeMap<TaskId, TaskEntry>,
    listener: Option<Arc<dyn FetchListener>>,
}

/// Orchestrates configuration, scheduling, firing and completion of background tasks.
///
/// Built with [`CoordinatorBuilder`](super::CoordinatorBuilder). Share it behind an
/// `Arc`; every operation takes `&self`.
pub struct FetchCoordinator {
    selector: BackendSelector,
    store: Arc<dyn ConfigStore>,
    resolver: Arc<dyn HandlerResolver>,
    lifecycle: Arc<dyn AppLifecycle>,
    dedup: DedupGuard,
    registry: TaskRegistry,
    inner: Mutex<Inner>,
}

impl FetchCoordinator {
    pub(crate) fn new(
        selector: BackendSelector,
        store: Arc<dyn ConfigStore>,
        resolver: Arc<dyn HandlerResolver>,
        lifecycle: Arc<dyn AppLifecycle>,
        dedup: DedupGuard,
        registry: TaskRegistry,
    ) -> Self {
        Self {
            selector,
            store,
            resolver,
            lifecycle,
            dedup,
            registry,
            inner: Mutex::new(Inner {
                state: CoordinatorState::Unconfigured,
                tasks: BTreeMap::new(),
                listener: None,
            }),
        }
    }

    // ========================================
    // 設定とスケジュール
    // ========================================

    /// Configure the periodic fetch task and start it.
    ///
    /// Corrections made by the validator are returned (and logged), never raised.
    pub async fn configure<L>(&self, raw: RawTaskConfig, listener: L) -> Result<Validated, FetchError>
    where
        L: FetchListener + 'static,
    {
        let validated = ConfigValidator::validate(TaskId::fetch(), &raw);
        tracing::info!(config = %validated.config, "configure");

        {
            let mut inner = self.lock();
            let previous = inner.tasks.remove(validated.config.task_id());
            inner.tasks.insert(
                validated.config.task_id().clone(),
                TaskEntry {
                    config: validated.config.clone(),
                    handle: previous.and_then(|entry| entry.handle),
                },
            );
            inner.listener = Some(Arc::new(listener));
            if matches!(inner.state, CoordinatorState::Unconfigured) {
                inner.state = CoordinatorState::Configured;
            }
        }

        self.start().await?;
        Ok(validated)
    }

    /// Configure and schedule an additional task under its own id.
    pub async fn schedule_task(&self, task_id: &str, raw: RawTaskConfig) -> Result<Validated, FetchError> {
        let task_id = TaskId::new(task_id)?;
        let validated = ConfigValidator::validate(task_id.clone(), &raw);

        {
            let mut inner = self.lock();
            if inner.tasks.contains_key(&task_id) {
                return Err(FetchError::AlreadyScheduled(task_id));
            }
            inner.tasks.insert(
                task_id.clone(),
                TaskEntry {
                    config: validated.config.clone(),
                    handle: None,
                },
            );
            if matches!(inner.state, CoordinatorState::Unconfigured) {
                inner.state = CoordinatorState::Configured;
            }
        }

        if let Err(e) = self.store.save(&task_id, &validated.config.to_raw()).await {
            let mut inner = self.lock();
            inner.tasks.remove(&task_id);
            if inner.tasks.is_empty() && matches!(inner.state, CoordinatorState::Configured) {
                inner.state = CoordinatorState::Unconfigured;
            }
            return Err(e.into());
        }

        tracing::info!(config = %validated.config, "schedule task");
        if self.schedule_one(&validated.config).await {
            self.lock().state = CoordinatorState::Scheduled;
        }
        Ok(validated)
    }

    /// Persist and schedule every configured task. Returns how many were registered.
    ///
    /// A backend that is unavailable leaves its task configured but inert until the
    /// next `start`.
    pub async fn start(&self) -> Result<usize, FetchError> {
        let configs = self.configs();
        if configs.is_empty() {
            return Err(FetchError::NotConfigured);
        }

        let status = self.status();
        if status != BackgroundStatus::Available {
            tracing::warn!(?status, "background execution is not available; scheduling anyway");
        }

        for config in &configs {
            self.store.save(config.task_id(), &config.to_raw()).await?;
        }

        let mut scheduled = 0;
        for config in &configs {
            if self.schedule_one(config).await {
                scheduled += 1;
            }
        }

        let mut inner = self.lock();
        inner.state = if scheduled > 0 {
            CoordinatorState::Scheduled
        } else {
            CoordinatorState::Configured
        };
        tracing::info!(scheduled, configured = configs.len(), state = ?inner.state, "start");
        Ok(scheduled)
    }

    /// Cancel every backend registration and complete every in-flight execution.
    ///
    /// Configurations stay in memory (so `start` can resume) but are removed from
    /// the store, so nothing is re-registered at the next boot.
    /// Returns the number of executions that were force-completed.
    pub async fn stop(&self) -> usize {
        let cancellations: Vec<(TaskId, Option<BackendHandle>)> = {
            let mut inner = self.lock();
            inner
                .tasks
                .iter_mut()
                .map(|(task_id, entry)| (task_id.clone(), entry.handle.take()))
                .collect()
        };

        for (task_id, handle) in &cancellations {
            self.cancel(task_id, handle.as_ref()).await;
            if let Err(e) = self.store.remove(task_id).await {
                tracing::warn!(task_id = %task_id, error = %e, "failed to forget stored config");
            }
        }

        let drained = self.registry.drain();
        self.lock().state = CoordinatorState::Stopped;
        tracing::info!(cancelled = cancellations.len(), drained, "stop");
        drained
    }

    /// Cancel and forget one task. Returns false when the id is unknown.
    pub async fn stop_task(&self, task_id: &TaskId) -> Result<bool, FetchError> {
        let removed = {
            let mut inner = self.lock();
            let removed = inner.tasks.remove(task_id);
            if inner.tasks.is_empty() && removed.is_some() {
                inner.state = CoordinatorState::Unconfigured;
            }
            removed
        };

        let known = match removed {
            Some(entry) => {
                self.cancel(task_id, entry.handle.as_ref()).await;
                true
            }
            None => {
                let stored = self.store.load(task_id).await?.is_some();
                if stored {
                    self.selector.cancel_any(task_id).await;
                }
                stored
            }
        };
        if !known {
            return Ok(false);
        }

        self.registry.complete(task_id);
        self.store.remove(task_id).await?;
        tracing::info!(task_id = %task_id, "task stopped");
        Ok(true)
    }

    /// Re-register persisted tasks after a device reboot.
    ///
    /// Runs on a spawned task so store I/O and backend calls stay off the caller.
    /// Resolves to the number of tasks registered.
    pub fn on_boot(self: &Arc<Self>) -> JoinHandle<Result<usize, FetchError>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.reschedule_persisted().await })
    }

    async fn reschedule_persisted(&self) -> Result<usize, FetchError> {
        let mut scheduled = 0;
        for task_id in self.store.task_ids().await? {
            let Some(raw) = self.store.load(&task_id).await? else {
                continue;
            };
            let config = ConfigValidator::validate(task_id.clone(), &raw).config;
            if !config.persisted() {
                tracing::debug!(task_id = %task_id, "boot: task does not start on boot");
                continue;
            }

            self.remember(&config);
            if self.schedule_one(&config).await {
                scheduled += 1;
            }
        }

        if scheduled > 0 {
            self.lock().state = CoordinatorState::Scheduled;
        }
        tracing::info!(scheduled, "boot re-registration complete");
        Ok(scheduled)
    }

    // ========================================
    // 発火
    // ========================================

    /// Handle a wake-up delivered by a backend.
    ///
    /// The event's completion handler is invoked exactly once on every path: right
    /// away for rejected events, errors and auto-completing branches, or through
    /// `finish` / `on_timeout` for events dispatched to the live callback.
    pub async fn on_fired(&self, event: FiredEvent) -> Result<FireOutcome, FetchError> {
        let FiredEvent {
            task_id,
            scheduled_at,
            handle,
            completion,
        } = event;

        let verdict = self.dedup.accept(&task_id, scheduled_at);
        if !verdict.is_accept() {
            completion.finish();
            return Ok(FireOutcome::Rejected { verdict });
        }

        let config = match self.config_for(&task_id).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::warn!(task_id = %task_id, "fired task is not configured");
                completion.finish();
                return Err(FetchError::UnknownTask(task_id));
            }
            Err(e) => {
                completion.finish();
                return Err(e);
            }
        };

        let execution_id = match self.registry.register(task_id.clone(), completion, handle) {
            Ok(execution_id) => execution_id,
            Err(duplicate) => {
                tracing::error!(error = %duplicate.error, "overlapping execution delivered");
                duplicate.completion.finish();
                return Err(duplicate.error.into());
            }
        };
        tracing::debug!(task_id = %task_id, execution_id = %execution_id, "fired");

        // 1. live callback
        let listener = self.lock().listener.clone();
        if let Some(listener) = listener {
            let foreground = match self.lifecycle.is_foreground().await {
                Ok(foreground) => foreground,
                Err(e) => {
                    self.registry.complete(&task_id);
                    return Err(e.into());
                }
            };
            if foreground {
                self.registry.mark_dispatched(&task_id);
                tracing::info!(task_id = %task_id, execution_id = %execution_id, "dispatch: live callback");
                if catch_unwind(AssertUnwindSafe(|| listener.on_fetch(&task_id))).is_err() {
                    tracing::error!(
                        task_id = %task_id,
                        "live callback panicked; execution waits for finish or timeout"
                    );
                }
                return Ok(FireOutcome::Dispatched { execution_id });
            }
        }

        // 2. stop on terminate
        if config.stop_on_terminate() {
            tracing::info!(task_id = %task_id, "dispatch: stop on terminate");
            self.registry.complete(&task_id);
            self.stop().await;
            return Ok(FireOutcome::Stopped {
                execution_id,
                configuration_gap: false,
            });
        }

        // 3. force reload
        if config.force_reload() {
            tracing::info!(task_id = %task_id, "dispatch: relaunch host");
            if let Err(e) = self.lifecycle.relaunch().await {
                tracing::error!(task_id = %task_id, error = %e, "relaunch failed");
            }
            self.registry.complete(&task_id);
            return Ok(FireOutcome::Relaunched { execution_id });
        }

        // 4. headless handler
        if let Some(handler) = config.headless_handler() {
            self.registry.complete(&task_id);
            let delivered = self.resolver.contains(handler);
            if delivered {
                tracing::info!(task_id = %task_id, handler, "dispatch: headless");
                self.spawn_headless(handler.to_string(), task_id.clone());
            } else {
                let error = ResolveError::NotFound(handler.to_string());
                tracing::warn!(task_id = %task_id, error = %error, "headless dispatch failed");
            }
            return Ok(FireOutcome::Headless {
                execution_id,
                handler: handler.to_string(),
                delivered,
            });
        }

        // 5. configuration gap
        tracing::warn!(
            task_id = %task_id,
            "no headless handler, forceReload or stopOnTerminate configured; stopping"
        );
        self.registry.complete(&task_id);
        self.stop().await;
        Ok(FireOutcome::Stopped {
            execution_id,
            configuration_gap: true,
        })
    }

    /// Signal that the work for `task_id` is done. No-op for unknown ids.
    pub fn finish(&self, task_id: &TaskId) -> bool {
        self.registry.complete(task_id)
    }

    /// The backend revoked the execution of `task_id`.
    pub fn on_timeout(&self, task_id: &TaskId) -> bool {
        self.registry.on_timeout(task_id)
    }

    // ========================================
    // 照会
    // ========================================

    pub fn status(&self) -> BackgroundStatus {
        self.selector.capabilities().background_status
    }

    pub fn state(&self) -> CoordinatorState {
        self.lock().state
    }

    /// Validated configuration of `task_id` held in memory.
    pub fn config(&self, task_id: &TaskId) -> Option<TaskConfig> {
        self.lock().tasks.get(task_id).map(|entry| entry.config.clone())
    }

    pub fn snapshot(&self) -> CoordinatorStatus {
        let (state, configured) = {
            let inner = self.lock();
            let configured = inner
                .tasks
                .iter()
                .map(|(task_id, entry)| ConfiguredTask {
                    task_id: task_id.clone(),
                    backend: entry.handle.as_ref().map(BackendHandle::kind),
                })
                .collect();
            (inner.state, configured)
        };

        CoordinatorStatus {
            state,
            background_status: self.status(),
            configured,
            executing: self.registry.snapshot(),
            dedup_entries: self.dedup.len(),
        }
    }

    // ========================================
    // 内部
    // ========================================

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn configs(&self) -> Vec<TaskConfig> {
        self.lock()
            .tasks
            .values()
            .map(|entry| entry.config.clone())
            .collect()
    }

    fn remember(&self, config: &TaskConfig) {
        let mut inner = self.lock();
        inner
            .tasks
            .entry(config.task_id().clone())
            .or_insert_with(|| TaskEntry {
                config: config.clone(),
                handle: None,
            });
        if matches!(inner.state, CoordinatorState::Unconfigured) {
            inner.state = CoordinatorState::Configured;
        }
    }

    /// In-memory config, falling back to the store (restarted process).
    async fn config_for(&self, task_id: &TaskId) -> Result<Option<TaskConfig>, FetchError> {
        if let Some(config) = self.config(task_id) {
            return Ok(Some(config));
        }

        let Some(raw) = self.store.load(task_id).await? else {
            return Ok(None);
        };
        let config = ConfigValidator::validate(task_id.clone(), &raw).config;
        tracing::debug!(config = %config, "config reloaded from store");
        self.remember(&config);
        Ok(Some(config))
    }

    /// Register `config` on its backend and remember the handle.
    async fn schedule_one(&self, config: &TaskConfig) -> bool {
        match self.selector.schedule(config).await {
            Ok(handle) => {
                if let Some(entry) = self.lock().tasks.get_mut(config.task_id()) {
                    entry.handle = Some(handle);
                }
                true
            }
            Err(e) => {
                tracing::warn!(
                    task_id = %config.task_id(),
                    error = %e,
                    "failed to schedule; task stays configured until the next start"
                );
                false
            }
        }
    }

    /// Run the headless handler on its own task; failures are only logged.
    fn spawn_headless(&self, handler: String, task_id: TaskId) {
        let resolver = Arc::clone(&self.resolver);
        tokio::spawn(async move {
            if let Err(e) = resolver.invoke(&handler, &task_id).await {
                tracing::warn!(task_id = %task_id, error = %e, "headless handler failed");
            }
        });
    }

    async fn cancel(&self, task_id: &TaskId, handle: Option<&BackendHandle>) {
        match handle {
            Some(handle) => self.selector.cancel(task_id, handle).await,
            None => self.selector.cancel_any(task_id).await,
        }
    }
}
