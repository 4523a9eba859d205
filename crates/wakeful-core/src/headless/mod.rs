//! Headless - アプリ終了中の発火を処理する handler の登録表
//!
//! 名前でクラスを探す動的解決の代わりに、起動時に登録した handler の表を引く。

pub mod handler;
pub mod registry;

pub use self::handler::{FnHandler, HeadlessError, HeadlessHandler};
pub use self::registry::{HeadlessRegistry, RegistryError};
