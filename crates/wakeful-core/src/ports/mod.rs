//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! OS のスケジューラ、設定の永続化、headless handler の解決、アプリの
//! ライフサイクルはすべて外部の協調者で、core はこれらの trait 越しにしか触らない。

pub mod alarm_scheduler;
pub mod app_lifecycle;
pub mod clock;
pub mod config_store;
pub mod handler_resolver;
pub mod id_generator;
pub mod job_scheduler;

// 主要な trait を再エクスポート
pub use self::alarm_scheduler::{AlarmRequest, AlarmScheduler};
pub use self::app_lifecycle::AppLifecycle;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::config_store::ConfigStore;
pub use self::handler_resolver::HandlerResolver;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_scheduler::{JobRequest, JobScheduler};
