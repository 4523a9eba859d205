//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryConfigStore** / **JsonFileConfigStore**: ConfigStore
//! - **RecordingJobScheduler** / **RecordingAlarmScheduler**: 要求を記録するだけの backend
//! - **StaticLifecycle**: foreground フラグを外から切り替えられる AppLifecycle
//!
//! # 本番用実装
//! OS のジョブスケジューラ・アラーム・プロセス管理への接続は、
//! 組み込み先アプリ側で ports の trait を実装して渡す。

pub mod inmem_config;
pub mod json_config;
pub mod recording;

// 主要な型を再エクスポート
pub use self::inmem_config::InMemoryConfigStore;
pub use self::json_config::JsonFileConfigStore;
pub use self::recording::{RecordingAlarmScheduler, RecordingJobScheduler, StaticLifecycle};
