//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{ExecutionId, ScheduleId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は ExecutionId / ScheduleId を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドの発火から同時に使われる）
pub trait IdGenerator: Send + Sync {
    fn generate_execution_id(&self) -> ExecutionId;

    fn generate_schedule_id(&self) -> ScheduleId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// FixedClock を渡せば timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_execution_id(&self) -> ExecutionId {
        ExecutionId::from(self.next_ulid())
    }

    fn generate_schedule_id(&self) -> ScheduleId {
        ScheduleId::from(self.next_ulid())
    }
}
