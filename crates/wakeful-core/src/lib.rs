//! wakeful-core
//!
//! Core building blocks for coordinating background wake-ups.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, config, validate, platform, schedule, state, outcome, errors）
//! - **ports**: 抽象化レイヤー（JobScheduler, AlarmScheduler, ConfigStore, HandlerResolver, AppLifecycle, Clock, IdGenerator）
//! - **backend**: スケジューリング backend の選択（ジョブスケジューラ / アラーム）
//! - **execution**: 実行中タスクの台帳と重複配送の抑止（TaskRegistry, DedupGuard）
//! - **headless**: アプリ終了中の発火を受け取る handler の登録表
//! - **app**: FetchCoordinator と CoordinatorBuilder
//! - **impls**: 実装（InMemoryConfigStore, JsonFileConfigStore, 記録用 backend など開発用）

pub mod app;
pub mod backend;
pub mod domain;
pub mod execution;
pub mod headless;
pub mod impls;
pub mod ports;

pub use self::app::{CoordinatorBuilder, FetchCoordinator, FetchListener, FiredEvent};
