//! CoordinatorBuilder - FetchCoordinator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 省略可能な協調者にはデフォルト実装を入れる（SystemClock / UlidGenerator / InMemoryConfigStore）

use std::future::Future;
use std::sync::Arc;

use super::coordinator::FetchCoordinator;
use crate::backend::{AlarmBackend, BackendSelector, JobSchedulerBackend};
use crate::domain::{BackendKind, PlatformCapabilities, TaskId};
use crate::execution::{DedupGuard, DedupPolicy, TaskRegistry};
use crate::headless::{HeadlessError, HeadlessHandler, HeadlessRegistry, RegistryError};
use crate::impls::InMemoryConfigStore;
use crate::ports::{
    AlarmScheduler, AppLifecycle, Clock, ConfigStore, HandlerResolver, IdGenerator, JobScheduler,
    SystemClock, UlidGenerator,
};

/// CoordinatorBuilder は FetchCoordinator を構築
///
/// # 使用例
/// ```ignore
/// let coordinator = CoordinatorBuilder::new()
///     .capabilities(PlatformCapabilities::modern())
///     .job_scheduler(Arc::new(MyJobScheduler))
///     .lifecycle(Arc::new(MyLifecycle))
///     .register_headless("sync", SyncHandler)?
///     .expect_handlers(&["sync"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_handlers() で期待される headless handler 名を登録
/// - build() 時に「期待集合 ⊆ 解決可能な集合」をチェック
/// - プラットフォームが使う backend が無ければ BuildError を返す
pub struct CoordinatorBuilder {
    capabilities: PlatformCapabilities,
    dedup_policy: DedupPolicy,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    job_scheduler: Option<Arc<dyn JobScheduler>>,
    alarm_scheduler: Option<Arc<dyn AlarmScheduler>>,
    store: Option<Arc<dyn ConfigStore>>,
    lifecycle: Option<Arc<dyn AppLifecycle>>,
    headless: HeadlessRegistry,
    resolver: Option<Arc<dyn HandlerResolver>>,
    expected_handlers: Option<Vec<String>>,
}

/// BuildError は coordinator 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing headless handlers: {0:?}. These handlers were expected but not registered.")]
    MissingHandlers(Vec<String>),

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("The platform schedules on the {0} backend but none was provided")]
    NoBackend(BackendKind),
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            capabilities: PlatformCapabilities::default(),
            dedup_policy: DedupPolicy::default(),
            clock: None,
            ids: None,
            job_scheduler: None,
            alarm_scheduler: None,
            store: None,
            lifecycle: None,
            headless: HeadlessRegistry::new(),
            resolver: None,
            expected_handlers: None,
        }
    }

    pub fn capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn dedup_policy(mut self, policy: DedupPolicy) -> Self {
        self.dedup_policy = policy;
        self
    }

    /// Defaults to `SystemClock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to a `UlidGenerator` over the builder's clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn job_scheduler(mut self, scheduler: Arc<dyn JobScheduler>) -> Self {
        self.job_scheduler = Some(scheduler);
        self
    }

    pub fn alarm_scheduler(mut self, scheduler: Arc<dyn AlarmScheduler>) -> Self {
        self.alarm_scheduler = Some(scheduler);
        self
    }

    /// Defaults to an `InMemoryConfigStore`.
    pub fn config_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn AppLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Headless handler を名前で登録
    pub fn register_headless<H>(mut self, name: impl Into<String>, handler: H) -> Result<Self, RegistryError>
    where
        H: HeadlessHandler + 'static,
    {
        self.headless.register(name, handler)?;
        Ok(self)
    }

    pub fn register_headless_fn<F, Fut>(mut self, name: impl Into<String>, f: F) -> Result<Self, RegistryError>
    where
        F: Fn(TaskId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HeadlessError>> + Send + 'static,
    {
        self.headless.register_fn(name, f)?;
        Ok(self)
    }

    /// Use an external resolver instead of the registered handler table.
    ///
    /// Handlers passed to `register_headless` are ignored when this is set.
    pub fn resolver(mut self, resolver: Arc<dyn HandlerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// 期待される headless handler 名のリストを設定
    pub fn expect_handlers(mut self, names: &[&str]) -> Self {
        self.expected_handlers = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    /// # 検証
    /// - expect_handlers() で設定された名前が全て解決できるかチェック
    /// - AppLifecycle が設定されているかチェック
    /// - capabilities が選ぶ backend が渡されているかチェック
    pub fn build(self) -> Result<FetchCoordinator, BuildError> {
        let resolver: Arc<dyn HandlerResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(self.headless),
        };

        if let Some(expected) = &self.expected_handlers {
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !resolver.contains(name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingHandlers(missing));
            }
        }

        let lifecycle = self
            .lifecycle
            .ok_or(BuildError::MissingCollaborator("app lifecycle"))?;

        let primary = if self.capabilities.rich_scheduler {
            BackendKind::JobScheduler
        } else {
            BackendKind::Alarm
        };
        let primary_present = match primary {
            BackendKind::JobScheduler => self.job_scheduler.is_some(),
            BackendKind::Alarm => self.alarm_scheduler.is_some(),
        };
        if !primary_present {
            return Err(BuildError::NoBackend(primary));
        }

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        let store: Arc<dyn ConfigStore> = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryConfigStore::new()));

        let selector = BackendSelector::new(
            self.capabilities,
            self.job_scheduler.map(|scheduler| {
                JobSchedulerBackend::new(scheduler, self.capabilities, clock.clone(), ids.clone())
            }),
            self.alarm_scheduler
                .map(|scheduler| AlarmBackend::new(scheduler, clock.clone(), ids.clone())),
        );

        Ok(FetchCoordinator::new(
            selector,
            store,
            resolver,
            lifecycle,
            DedupGuard::new(self.dedup_policy, clock.clone()),
            TaskRegistry::new(clock, ids),
        ))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{RecordingAlarmScheduler, RecordingJobScheduler, StaticLifecycle};

    fn base() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
            .job_scheduler(Arc::new(RecordingJobScheduler::new()))
            .lifecycle(Arc::new(StaticLifecycle::background()))
    }

    #[test]
    fn build_success() {
        let coordinator = base()
            .register_headless_fn("sync", |_task_id: TaskId| async { Ok(()) })
            .unwrap()
            .expect_handlers(&["sync"])
            .build();
        assert!(coordinator.is_ok());
    }

    #[test]
    fn build_missing_handlers() {
        let coordinator = base()
            .register_headless_fn("sync", |_task_id: TaskId| async { Ok(()) })
            .unwrap()
            .expect_handlers(&["sync", "upload"])
            .build();
        assert!(matches!(
            coordinator,
            Err(BuildError::MissingHandlers(missing)) if missing == vec!["upload".to_string()]
        ));
    }

    #[test]
    fn duplicate_handler_name_is_rejected() {
        let result = base()
            .register_headless_fn("sync", |_task_id: TaskId| async { Ok(()) })
            .unwrap()
            .register_headless_fn("sync", |_task_id: TaskId| async { Ok(()) });
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn build_without_lifecycle_fails() {
        let coordinator = CoordinatorBuilder::new()
            .job_scheduler(Arc::new(RecordingJobScheduler::new()))
            .build();
        assert!(matches!(
            coordinator,
            Err(BuildError::MissingCollaborator("app lifecycle"))
        ));
    }

    #[test]
    fn legacy_platform_needs_the_alarm_backend() {
        let coordinator = base()
            .capabilities(PlatformCapabilities::legacy())
            .build();
        assert!(matches!(
            coordinator,
            Err(BuildError::NoBackend(BackendKind::Alarm))
        ));

        let coordinator = base()
            .capabilities(PlatformCapabilities::legacy())
            .alarm_scheduler(Arc::new(RecordingAlarmScheduler::new()))
            .build();
        assert!(coordinator.is_ok());
    }
}
