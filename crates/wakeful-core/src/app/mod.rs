//! App - アプリケーション層
//!
//! ports と execution を組み合わせて、発火の受付から完了までを実装します。
//!
//! # 主要コンポーネント
//! - **CoordinatorBuilder**: 協調者のワイヤリングと起動時検証
//! - **FetchCoordinator**: configure → schedule → fire → dispatch → complete の状態機械
//! - **CoordinatorStatus**: スナップショット

pub mod builder;
pub mod coordinator;
pub mod event;
pub mod status;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, CoordinatorBuilder};
pub use self::coordinator::FetchCoordinator;
pub use self::event::{FetchListener, FiredEvent};
pub use self::status::{ConfiguredTask, CoordinatorStatus};
