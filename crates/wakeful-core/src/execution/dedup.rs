//! DedupGuard - 重複配送の抑止
//!
//! 一部の backend は同じ論理タスクを短時間に複数回発火させる。
//! 直近の発火を (task_id, fired_at) の小さな窓に保持し、窓の中にある task_id の
//! 再発火を拒否する。
//!
//! # 学習ポイント
//! - 読んで判定して書く、を 1 つの Mutex の中で完結させる（check-then-act を原子的に）
//! - VecDeque による容量固定の窓（古いものから捨てる）

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{DedupVerdict, TaskId};
use crate::ports::Clock;

/// Tunables of the duplicate-delivery guard.
///
/// Two variants have been used in production and neither is known to be the
/// correct one, so both are named here and the threshold stays configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupPolicy {
    /// Window size; the oldest entry is evicted past this.
    pub capacity: usize,
    /// Re-deliveries of the same task within this window are duplicates.
    pub suppression: Duration,
    /// Fires this soon after scheduling are the scheduler's immediate first fire.
    pub spurious_fire_threshold: Duration,
}

impl DedupPolicy {
    pub const DEFAULT_CAPACITY: usize = 5;
    pub const DEFAULT_SUPPRESSION: Duration = Duration::from_millis(5000);
    pub const SINGLE_SLOT_SUPPRESSION: Duration = Duration::from_millis(2000);
    pub const SPURIOUS_FIRE_THRESHOLD: Duration = Duration::from_millis(1000);

    /// Bounded queue variant: 5 entries, 5000 ms.
    pub fn queue() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            suppression: Self::DEFAULT_SUPPRESSION,
            spurious_fire_threshold: Self::SPURIOUS_FIRE_THRESHOLD,
        }
    }

    /// Legacy single-slot variant: 1 entry, 2000 ms.
    pub fn single_slot() -> Self {
        Self {
            capacity: 1,
            suppression: Self::SINGLE_SLOT_SUPPRESSION,
            spurious_fire_threshold: Self::SPURIOUS_FIRE_THRESHOLD,
        }
    }

    pub fn with_suppression(mut self, suppression: Duration) -> Self {
        self.suppression = suppression;
        self
    }
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self::queue()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DedupWindowEntry {
    task_id: TaskId,
    fired_at: DateTime<Utc>,
}

/// Bounded recency window over accepted firings (newest last).
pub struct DedupGuard {
    policy: DedupPolicy,
    clock: Arc<dyn Clock>,
    window: Mutex<VecDeque<DedupWindowEntry>>,
}

impl DedupGuard {
    pub fn new(policy: DedupPolicy, clock: Arc<dyn Clock>) -> Self {
        let capacity = policy.capacity.max(1);
        Self {
            policy: DedupPolicy { capacity, ..policy },
            clock,
            window: Mutex::new(VecDeque::with_capacity(capacity + 1)),
        }
    }

    /// Decide whether a fired event should run.
    ///
    /// Too-soon events are rejected without touching the window. Accepted events
    /// replace any older entry of the same task and are appended at the back.
    pub fn accept(&self, task_id: &TaskId, scheduled_at: DateTime<Utc>) -> DedupVerdict {
        let now = self.clock.now();

        let since_scheduled = (now - scheduled_at).num_milliseconds();
        if since_scheduled < millis(self.policy.spurious_fire_threshold) {
            tracing::debug!(
                task_id = %task_id,
                since_scheduled_ms = since_scheduled,
                "ignoring fire issued right after scheduling"
            );
            return DedupVerdict::RejectTooSoonAfterSchedule;
        }

        let mut window = self.lock();

        let duplicate = window.iter().any(|entry| {
            entry.task_id.matches(task_id)
                && (now - entry.fired_at).num_milliseconds() < millis(self.policy.suppression)
        });
        if duplicate {
            tracing::debug!(task_id = %task_id, "caught duplicate delivery");
            return DedupVerdict::RejectDuplicate;
        }

        window.retain(|entry| !entry.task_id.matches(task_id));
        window.push_back(DedupWindowEntry {
            task_id: task_id.clone(),
            fired_at: now,
        });
        while window.len() > self.policy.capacity {
            window.pop_front();
        }

        DedupVerdict::Accept
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Window contents, oldest first.
    pub fn entries(&self) -> Vec<(TaskId, DateTime<Utc>)> {
        self.lock()
            .iter()
            .map(|entry| (entry.task_id.clone(), entry.fired_at))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DedupWindowEntry>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::TimeZone;
    use rstest::rstest;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn guard(policy: DedupPolicy) -> (Arc<FixedClock>, DedupGuard) {
        let clock = Arc::new(FixedClock::new(start()));
        let guard = DedupGuard::new(policy, clock.clone());
        (clock, guard)
    }

    fn id(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    /// A schedule time comfortably in the past.
    fn long_ago() -> DateTime<Utc> {
        start() - chrono::Duration::minutes(15)
    }

    #[test]
    fn first_fire_is_accepted_and_recorded() {
        let (_clock, guard) = guard(DedupPolicy::default());

        assert_eq!(guard.accept(&id("a"), long_ago()), DedupVerdict::Accept);
        assert_eq!(guard.entries(), vec![(id("a"), start())]);
    }

    #[rstest]
    #[case::immediate(0)]
    #[case::just_under(999)]
    fn fire_right_after_scheduling_is_rejected_without_recording(#[case] age_ms: i64) {
        let (_clock, guard) = guard(DedupPolicy::default());
        let scheduled_at = start() - chrono::Duration::milliseconds(age_ms);

        assert_eq!(
            guard.accept(&id("a"), scheduled_at),
            DedupVerdict::RejectTooSoonAfterSchedule
        );
        assert!(guard.is_empty());
    }

    #[test]
    fn too_soon_wins_over_window_state() {
        let (clock, guard) = guard(DedupPolicy::default());
        guard.accept(&id("a"), long_ago());
        clock.advance(Duration::from_secs(60));

        let verdict = guard.accept(&id("a"), clock.now());
        assert_eq!(verdict, DedupVerdict::RejectTooSoonAfterSchedule);
    }

    #[test]
    fn refire_within_suppression_is_a_duplicate() {
        let (clock, guard) = guard(DedupPolicy::default());
        guard.accept(&id("a"), long_ago());

        clock.advance(Duration::from_millis(4000));
        assert_eq!(
            guard.accept(&id("a"), long_ago()),
            DedupVerdict::RejectDuplicate
        );
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn refire_after_suppression_is_accepted_and_refreshes_entry() {
        let (clock, guard) = guard(DedupPolicy::default());
        guard.accept(&id("a"), long_ago());

        clock.advance(Duration::from_millis(5000));
        assert_eq!(guard.accept(&id("a"), long_ago()), DedupVerdict::Accept);
        assert_eq!(guard.entries(), vec![(id("a"), clock.now())]);
    }

    #[test]
    fn other_tasks_are_not_duplicates() {
        let (_clock, guard) = guard(DedupPolicy::default());
        assert!(guard.accept(&id("a"), long_ago()).is_accept());
        assert!(guard.accept(&id("b"), long_ago()).is_accept());
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn ids_differing_only_in_case_are_duplicates() {
        let (clock, guard) = guard(DedupPolicy::default());
        guard.accept(&id("Sync"), long_ago());

        clock.advance(Duration::from_millis(100));
        assert_eq!(
            guard.accept(&id("sync"), long_ago()),
            DedupVerdict::RejectDuplicate
        );
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn window_is_bounded_and_evicts_the_oldest() {
        let (clock, guard) = guard(DedupPolicy::default());
        for name in ["t1", "t2", "t3", "t4", "t5", "t6"] {
            assert!(guard.accept(&id(name), long_ago()).is_accept());
            assert!(guard.len() <= DedupPolicy::DEFAULT_CAPACITY);
            clock.advance(Duration::from_millis(10));
        }

        let ids: Vec<_> = guard.entries().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![id("t2"), id("t3"), id("t4"), id("t5"), id("t6")]);
    }

    #[test]
    fn evicted_task_can_fire_again_inside_suppression() {
        let (_clock, guard) = guard(DedupPolicy::default());
        for name in ["t1", "t2", "t3", "t4", "t5", "t6"] {
            guard.accept(&id(name), long_ago());
        }
        assert!(guard.accept(&id("t1"), long_ago()).is_accept());
    }

    #[test]
    fn single_slot_variant_uses_two_second_threshold() {
        let (clock, guard) = guard(DedupPolicy::single_slot());
        guard.accept(&id("a"), long_ago());

        clock.advance(Duration::from_millis(1999));
        assert_eq!(
            guard.accept(&id("a"), long_ago()),
            DedupVerdict::RejectDuplicate
        );

        clock.advance(Duration::from_millis(1));
        assert!(guard.accept(&id("a"), long_ago()).is_accept());

        guard.accept(&id("b"), long_ago());
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn concurrent_duplicates_admit_exactly_one() {
        let (_clock, guard) = guard(DedupPolicy::default());
        let guard = Arc::new(guard);

        let accepted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let guard = guard.clone();
                    s.spawn(move || guard.accept(&id("a"), long_ago()).is_accept())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum()
        });

        assert_eq!(accepted, 1);
    }
}
