use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::models::TestStatus;

/// Source of wall-clock readings. Read only when an event arrives.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Cell<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

/// Point-in-time view of a run's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: usize,
    pub completed: usize,
    pub passes: usize,
    pub failures: usize,
    pub pending: usize,
    pub percent: u8,
    pub elapsed_ms: u64,
    /// Set once the run has finished.
    pub duration_ms: Option<u64>,
}

impl StatsSnapshot {
    /// Elapsed (or final) time in seconds, two decimals.
    pub fn seconds_label(&self) -> String {
        let ms = self.duration_ms.unwrap_or(self.elapsed_ms);
        format!("{:.2}", ms as f64 / 1000.0)
    }
}

pub struct StatsTracker {
    clock: Rc<dyn Clock>,
    total: usize,
    completed: usize,
    passes: usize,
    failures: usize,
    pending: usize,
    percent: u8,
    elapsed_ms: u64,
    start: Option<Instant>,
    end: Option<Instant>,
}

impl StatsTracker {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            total: 0,
            completed: 0,
            passes: 0,
            failures: 0,
            pending: 0,
            percent: 0,
            elapsed_ms: 0,
            start: None,
            end: None,
        }
    }

    /// `pre:all`: reset counters and start timing against a fixed total.
    pub fn start(&mut self, total: usize) {
        self.total = total;
        self.completed = 0;
        self.passes = 0;
        self.failures = 0;
        self.pending = 0;
        self.percent = 0;
        self.elapsed_ms = 0;
        self.start = Some(self.clock.now());
        self.end = None;
    }

    /// `post:test`: count one finished test.
    pub fn record(&mut self, status: TestStatus) {
        let now = self.clock.now();
        let start = *self.start.get_or_insert(now);

        self.completed += 1;
        match status {
            TestStatus::Passed => self.passes += 1,
            TestStatus::Failed => self.failures += 1,
            TestStatus::Pending | TestStatus::Skipped => self.pending += 1,
        }

        if self.completed > self.total {
            tracing::debug!(
                completed = self.completed,
                planned = self.total,
                "more tests finished than planned"
            );
            self.total = self.completed;
        }

        self.percent = percent(self.completed, self.total);
        self.elapsed_ms = millis(now.saturating_duration_since(start));
    }

    /// `post:all`: freeze the duration.
    pub fn finish(&mut self) {
        let now = self.clock.now();
        let start = *self.start.get_or_insert(now);
        self.end = Some(now);
        self.elapsed_ms = millis(now.saturating_duration_since(start));
    }

    pub fn is_finished(&self) -> bool {
        self.end.is_some()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total,
            completed: self.completed,
            passes: self.passes,
            failures: self.failures,
            pending: self.pending,
            percent: self.percent,
            elapsed_ms: self.elapsed_ms,
            duration_ms: match (self.start, self.end) {
                (Some(start), Some(end)) => Some(millis(end.saturating_duration_since(start))),
                _ => None,
            },
        }
    }
}

fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (completed.saturating_mul(100) / total).min(100) as u8
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn tracker() -> (Rc<ManualClock>, StatsTracker) {
        let clock = Rc::new(ManualClock::new());
        let tracker = StatsTracker::new(clock.clone());
        (clock, tracker)
    }

    #[test]
    fn buckets_statuses_and_derives_percent() {
        let (clock, mut stats) = tracker();
        stats.start(4);
        clock.advance(Duration::from_millis(120));
        stats.record(TestStatus::Passed);
        stats.record(TestStatus::Failed);
        stats.record(TestStatus::Skipped);

        let snap = stats.snapshot();
        assert_eq!(snap.passes, 1);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.pending, 1);
        assert_eq!(snap.completed, 3);
        assert_eq!(snap.percent, 75);
        assert_eq!(snap.elapsed_ms, 120);
        assert_eq!(snap.duration_ms, None);
    }

    #[test]
    fn zero_total_means_zero_percent() {
        let (_, mut stats) = tracker();
        stats.start(0);
        assert_eq!(stats.snapshot().percent, 0);
    }

    #[test]
    fn percent_floors() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(3, 3), 100);
    }

    #[test]
    fn overflowing_total_is_raised() {
        let (_, mut stats) = tracker();
        stats.start(1);
        stats.record(TestStatus::Passed);
        stats.record(TestStatus::Passed);
        let snap = stats.snapshot();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.percent, 100);
    }

    #[test]
    fn finish_records_duration() {
        let (clock, mut stats) = tracker();
        stats.start(1);
        clock.advance(Duration::from_millis(1500));
        stats.record(TestStatus::Passed);
        clock.advance(Duration::from_millis(10));
        stats.finish();

        let snap = stats.snapshot();
        assert!(stats.is_finished());
        assert_eq!(snap.duration_ms, Some(1510));
        assert_eq!(snap.seconds_label(), "1.51");
    }

    #[test]
    fn restart_resets_counters() {
        let (_, mut stats) = tracker();
        stats.start(2);
        stats.record(TestStatus::Failed);
        stats.finish();
        stats.start(5);

        let snap = stats.snapshot();
        assert_eq!(snap.completed, 0);
        assert_eq!(snap.failures, 0);
        assert_eq!(snap.total, 5);
        assert_eq!(snap.duration_ms, None);
    }

    #[test]
    fn records_before_start_are_tolerated() {
        let (_, mut stats) = tracker();
        stats.record(TestStatus::Passed);
        let snap = stats.snapshot();
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.total, 1);
    }

    fn status() -> impl Strategy<Value = TestStatus> {
        prop_oneof![
            Just(TestStatus::Passed),
            Just(TestStatus::Failed),
            Just(TestStatus::Pending),
            Just(TestStatus::Skipped),
        ]
    }

    proptest! {
        #[test]
        fn counters_stay_consistent(total in 0usize..50, statuses in prop::collection::vec(status(), 0..80)) {
            let (_, mut stats) = tracker();
            stats.start(total);
            for status in statuses {
                stats.record(status);
                let snap = stats.snapshot();
                prop_assert_eq!(snap.passes + snap.failures + snap.pending, snap.completed);
                prop_assert!(snap.completed <= snap.total);
                prop_assert!(snap.percent <= 100);
            }
        }
    }
}
