//! Daily token budget
//!
//! One tracker is shared by every agent in the process. Usage accumulates in
//! a one-day window that restarts on the first access after it expires.
//! Admission for model calls goes through [`TokenBudgetTracker::try_reserve`],
//! which checks and reserves under the same lock so concurrent requests cannot
//! jointly overshoot the limit.

use super::clock::{Clock, SystemClock};
use super::estimator::TokenEstimator;
use crate::error::{InsightError, Result};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Default daily token limit.
pub const DEFAULT_DAILY_LIMIT: u64 = 10_000;

/// Snapshot of the budget window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    pub daily_limit: u64,
    /// Tokens recorded since `window_start`.
    pub used_today: u64,
    /// Estimated tokens held by in-flight calls.
    pub reserved: u64,
    pub per_category_usage: BTreeMap<String, u64>,
    pub window_start: DateTime<Utc>,
}

impl TokenBudget {
    fn new(daily_limit: u64, window_start: DateTime<Utc>) -> Self {
        Self {
            daily_limit,
            used_today: 0,
            reserved: 0,
            per_category_usage: BTreeMap::new(),
            window_start,
        }
    }

    /// Tokens that can still be admitted in this window.
    pub fn remaining(&self) -> u64 {
        self.daily_limit
            .saturating_sub(self.used_today.saturating_add(self.reserved))
    }
}

#[derive(Debug)]
struct BudgetState {
    budget: TokenBudget,
    // Bumped on every window reset so stale reservations do not release
    // tokens from the new window.
    generation: u64,
}

impl BudgetState {
    fn roll_window(&mut self, now: DateTime<Utc>) {
        if now - self.budget.window_start < Duration::days(1) {
            return;
        }

        info!(
            previous_usage = self.budget.used_today,
            previous_window = %self.budget.window_start,
            "Token budget window expired, resetting usage"
        );

        self.budget.used_today = 0;
        self.budget.reserved = 0;
        self.budget.per_category_usage.clear();
        self.budget.window_start = now;
        self.generation += 1;
    }

    fn admits(&self, estimated: u64) -> bool {
        self.budget
            .used_today
            .saturating_add(self.budget.reserved)
            .saturating_add(estimated)
            <= self.budget.daily_limit
    }

    fn add_usage(&mut self, category: &str, actual: u64) {
        self.budget.used_today = self.budget.used_today.saturating_add(actual);
        let entry = self
            .budget
            .per_category_usage
            .entry(category.to_string())
            .or_insert(0);
        *entry = entry.saturating_add(actual);
    }

    fn release(&mut self, generation: u64, amount: u64) {
        if self.generation == generation {
            self.budget.reserved = self.budget.reserved.saturating_sub(amount);
        }
    }
}

/// Shared handle to the process-wide token budget.
///
/// Cloning is cheap; all clones observe the same window.
#[derive(Debug, Clone)]
pub struct TokenBudgetTracker {
    state: Arc<Mutex<BudgetState>>,
    estimator: TokenEstimator,
    clock: Arc<dyn Clock>,
}

impl TokenBudgetTracker {
    /// Tracker on the wall clock, window starting now.
    pub fn new(daily_limit: u64) -> Self {
        Self::with_clock(daily_limit, Arc::new(SystemClock))
    }

    /// Tracker on a custom clock, window starting at the clock's current time.
    pub fn with_clock(daily_limit: u64, clock: Arc<dyn Clock>) -> Self {
        let window_start = clock.now();
        Self {
            state: Arc::new(Mutex::new(BudgetState {
                budget: TokenBudget::new(daily_limit, window_start),
                generation: 0,
            })),
            estimator: TokenEstimator::default(),
            clock,
        }
    }

    pub fn estimator(&self) -> TokenEstimator {
        self.estimator
    }

    /// Estimated token count for `text`.
    pub fn estimate(&self, text: &str) -> u64 {
        self.estimator.estimate(text)
    }

    pub fn daily_limit(&self) -> u64 {
        self.state.lock().budget.daily_limit
    }

    /// Whether `estimated` more tokens fit in today's window.
    ///
    /// Rolls the window forward first if it has expired. Tokens held by
    /// outstanding reservations count as used.
    pub fn can_proceed(&self, estimated: u64) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.roll_window(now);
        state.admits(estimated)
    }

    /// Add `actual` tokens to today's usage under `category`.
    pub fn record(&self, category: &str, actual: u64) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.roll_window(now);
        state.add_usage(category, actual);

        debug!(
            category,
            tokens = actual,
            used_today = state.budget.used_today,
            "Recorded token usage"
        );
    }

    /// Snapshot of the current window.
    pub fn stats(&self) -> TokenBudget {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.roll_window(now);
        state.budget.clone()
    }

    /// Atomically check that `estimated` tokens fit and hold them until the
    /// returned reservation is committed or dropped.
    pub fn try_reserve(&self, category: &str, estimated: u64) -> Result<Reservation> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.roll_window(now);

        if !state.admits(estimated) {
            let remaining = state.budget.remaining();
            debug!(category, estimated, remaining, "Token reservation refused");
            return Err(InsightError::QuotaExceeded {
                requested: estimated,
                remaining,
            });
        }

        state.budget.reserved = state.budget.reserved.saturating_add(estimated);

        Ok(Reservation {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            category: category.to_string(),
            amount: estimated,
            generation: state.generation,
            settled: false,
        })
    }
}

/// Tokens held against the budget for one in-flight call.
///
/// Dropping a reservation without committing returns the tokens.
#[must_use = "a reservation is released as soon as it is dropped"]
#[derive(Debug)]
pub struct Reservation {
    state: Arc<Mutex<BudgetState>>,
    clock: Arc<dyn Clock>,
    category: String,
    amount: u64,
    generation: u64,
    settled: bool,
}

impl Reservation {
    /// Estimated tokens held.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Release the hold and record the real usage in one step.
    pub fn commit(mut self, actual: u64) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.release(self.generation, self.amount);
        state.roll_window(now);
        state.add_usage(&self.category, actual);
        self.settled = true;

        debug!(
            category = %self.category,
            reserved = self.amount,
            tokens = actual,
            used_today = state.budget.used_today,
            "Committed token reservation"
        );
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.settled {
            self.state.lock().release(self.generation, self.amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::clock::ManualClock;

    fn manual_tracker(limit: u64) -> (TokenBudgetTracker, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let tracker = TokenBudgetTracker::with_clock(limit, Arc::new(clock.clone()));
        (tracker, clock)
    }

    #[test]
    fn test_can_proceed_boundary() {
        let (tracker, _) = manual_tracker(100);
        tracker.record("data_analyst", 60);

        assert!(tracker.can_proceed(40));
        assert!(!tracker.can_proceed(41));
    }

    #[test]
    fn test_record_accumulates_per_category() {
        let (tracker, _) = manual_tracker(10_000);
        tracker.record("data_analyst", 120);
        tracker.record("narrator", 300);
        tracker.record("data_analyst", 80);

        let stats = tracker.stats();
        assert_eq!(stats.used_today, 500);
        assert_eq!(stats.per_category_usage["data_analyst"], 200);
        assert_eq!(stats.per_category_usage["narrator"], 300);
        assert_eq!(stats.remaining(), 9_500);
    }

    #[test]
    fn test_window_resets_after_a_day() {
        let (tracker, clock) = manual_tracker(1_000);
        tracker.record("qa_reviewer", 900);
        assert!(!tracker.can_proceed(200));

        clock.advance(Duration::hours(25));
        assert!(tracker.can_proceed(1_000));

        let stats = tracker.stats();
        assert_eq!(stats.used_today, 0);
        assert!(stats.per_category_usage.is_empty());
        assert_eq!(stats.window_start, clock.now());
    }

    #[test]
    fn test_window_resets_exactly_at_boundary() {
        let (tracker, clock) = manual_tracker(1_000);
        tracker.record("visualizer", 10);

        clock.advance(Duration::hours(23));
        tracker.record("visualizer", 10);
        assert_eq!(tracker.stats().used_today, 20);

        clock.advance(Duration::hours(1));
        tracker.record("visualizer", 5);
        assert_eq!(tracker.stats().used_today, 5);
    }

    #[test]
    fn test_reservation_blocks_concurrent_admission() {
        let (tracker, _) = manual_tracker(100);

        let first = tracker.try_reserve("narrator", 60).unwrap();
        assert!(!tracker.can_proceed(60));

        let refused = tracker.try_reserve("narrator", 60);
        match refused {
            Err(InsightError::QuotaExceeded { requested, remaining }) => {
                assert_eq!(requested, 60);
                assert_eq!(remaining, 40);
            }
            other => panic!("expected quota error, got {:?}", other),
        }

        drop(first);
        assert!(tracker.try_reserve("narrator", 60).is_ok());
    }

    #[test]
    fn test_commit_records_actual_usage() {
        let (tracker, _) = manual_tracker(1_000);

        let reservation = tracker.try_reserve("data_analyst", 200).unwrap();
        assert_eq!(tracker.stats().reserved, 200);

        reservation.commit(150);
        let stats = tracker.stats();
        assert_eq!(stats.reserved, 0);
        assert_eq!(stats.used_today, 150);
        assert_eq!(stats.per_category_usage["data_analyst"], 150);
    }

    #[test]
    fn test_commit_after_window_reset_counts_in_new_window() {
        let (tracker, clock) = manual_tracker(1_000);
        tracker.record("narrator", 700);

        let reservation = tracker.try_reserve("narrator", 200).unwrap();
        clock.advance(Duration::days(2));
        tracker.record("qa_reviewer", 10);

        reservation.commit(250);
        let stats = tracker.stats();
        assert_eq!(stats.used_today, 260);
        assert_eq!(stats.reserved, 0);
    }

    #[test]
    fn test_concurrent_reservations_never_overshoot() {
        let tracker = TokenBudgetTracker::new(100);

        let granted: Vec<Reservation> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..10)
                .map(|_| {
                    let tracker = tracker.clone();
                    scope.spawn(move || tracker.try_reserve("data_analyst", 20).ok())
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|h| h.join().unwrap())
                .collect()
        });

        assert_eq!(granted.len(), 5);
        assert_eq!(tracker.stats().reserved, 100);
        drop(granted);
        assert_eq!(tracker.stats().reserved, 0);
    }
}
