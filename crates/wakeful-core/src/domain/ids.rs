//! Domain identifiers.
//!
//! # 2 種類の ID
//! - **TaskId**: 利用側が決める文字列 ID（例: `"wakeful.fetch"`）。backend への登録、
//!   dedup window、registry のキーになる。
//! - **Id<T>**: ULID ベースの型付き ID。1 回の発火（ExecutionId）や 1 回の schedule
//!   要求（ScheduleId）をログ上で追跡するために使う。
//!
//! ## Phantom Type パターン
//! `Id<T>` の `T` は実行時には使わないマーカー型で、
//! `ExecutionId` と `ScheduleId` をコンパイル時に区別します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

use super::errors::ConfigError;

/// Identifier of the built-in periodic fetch task.
pub const FETCH_TASK_ID: &str = "wakeful.fetch";

/// Identifier of a schedulable task.
///
/// Never empty: construction through [`TaskId::new`] rejects blank strings, and
/// deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyTaskId);
        }
        Ok(Self(value))
    }

    /// The id of the built-in fetch task.
    pub fn fetch() -> Self {
        Self(FETCH_TASK_ID.to_string())
    }

    pub fn is_fetch(&self) -> bool {
        self.0 == FETCH_TASK_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Same task as `other`, ignoring ASCII case (how backends report ids back).
    pub fn matches(&self, other: &TaskId) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Case-folded form used as a lookup key by the dedup window and the registry.
    pub fn folded(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl TryFrom<String> for TaskId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for TaskId {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"exec-", "sched-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しません。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Execution のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Execution {}

impl IdMarker for Execution {
    fn prefix() -> &'static str {
        "exec-"
    }
}

/// Schedule のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Schedule {}

impl IdMarker for Schedule {
    fn prefix() -> &'static str {
        "sched-"
    }
}

/// Identifier of one accepted firing (one registry entry).
pub type ExecutionId = Id<Execution>;

/// Identifier of one request handed to a scheduling backend.
pub type ScheduleId = Id<Schedule>;
