//! Balance calculation over a time-ordered event sequence.
//!
//! A single left-to-right scan applies each event to its subject:
//!
//! | Event | Effect on `current` | Effect on `all_time` |
//! |-------|---------------------|----------------------|
//! | Award | `+1` | `+1` |
//! | Redemption, floor on, balance at 0 | none | none |
//! | Redemption otherwise | `-1` | none |
//!
//! Events whose subject is not tracked are skipped. All arithmetic
//! saturates; balances never wrap.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use tracing::debug;

use turf_types::{Category, Event};

use crate::trajectory::{BalanceTrajectory, TimelineEntry, TrajectoryBuilder};

/// Apply one event to a current balance.
pub const fn apply_current(balance: i64, category: Category, floor_at_zero: bool) -> i64 {
    match category {
        Category::Award => balance.saturating_add(1),
        Category::Redemption => {
            if floor_at_zero && balance <= 0 {
                balance
            } else {
                balance.saturating_sub(1)
            }
        }
    }
}

/// Apply one event to an all-time balance (awards only).
pub const fn apply_all_time(balance: u64, category: Category) -> u64 {
    match category {
        Category::Award => balance.saturating_add(1),
        Category::Redemption => balance,
    }
}

/// Options shaping a trajectory computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrajectoryOptions {
    /// Configured origin of the ledger. The trajectory starts at the earlier
    /// of this and the first event.
    pub anchor: Option<NaiveDateTime>,
    /// End boundary of the trajectory, raised to the last event when that
    /// is later.
    pub now: NaiveDateTime,
    /// Canonical reason keys; anything else is tallied as "Other".
    pub recognized_reasons: BTreeSet<String>,
    /// Maximum number of distinct reasons per tally, "Other" included.
    pub max_reasons: usize,
}

impl TrajectoryOptions {
    /// Options with no anchor, no recognized reasons and no reason cap.
    pub const fn ending_at(now: NaiveDateTime) -> Self {
        Self {
            anchor: None,
            now,
            recognized_reasons: BTreeSet::new(),
            max_reasons: usize::MAX,
        }
    }
}

/// Everything one calculator pass produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    /// Final current balance per tracked member.
    pub final_balances: BTreeMap<String, i64>,
    /// Final all-time (awards only) balance per tracked member.
    pub all_time: BTreeMap<String, u64>,
    /// Balance-over-time series.
    pub trajectory: BalanceTrajectory,
    /// Each tracked event with its subject's balance right after it.
    pub timeline: Vec<TimelineEntry>,
}

/// Computes balances under a fixed redemption rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCalculator {
    floor_at_zero: bool,
}

impl BalanceCalculator {
    /// Create a calculator. With `floor_at_zero`, redemptions never take a
    /// balance below zero.
    pub const fn new(floor_at_zero: bool) -> Self {
        Self { floor_at_zero }
    }

    /// Whether redemptions are floored at zero.
    pub const fn floor_at_zero(&self) -> bool {
        self.floor_at_zero
    }

    /// Final current balance per member.
    pub fn balances(&self, events: &[Event], members: &[String]) -> BTreeMap<String, i64> {
        let mut balances: BTreeMap<String, i64> =
            members.iter().map(|m| (m.clone(), 0)).collect();
        for event in events {
            if let Some(balance) = balances.get_mut(&event.subject) {
                *balance = apply_current(*balance, event.category, self.floor_at_zero);
            }
        }
        balances
    }

    /// Final all-time balance per member: redemptions are ignored.
    pub fn all_time_balances(&self, events: &[Event], members: &[String]) -> BTreeMap<String, u64> {
        let mut balances: BTreeMap<String, u64> =
            members.iter().map(|m| (m.clone(), 0)).collect();
        for event in events {
            if let Some(balance) = balances.get_mut(&event.subject) {
                *balance = apply_all_time(*balance, event.category);
            }
        }
        balances
    }

    /// Full pass: final balances, trajectory and enriched timeline.
    ///
    /// `events` must already be in chronological order.
    pub fn compute(
        &self,
        events: &[Event],
        members: &[String],
        options: &TrajectoryOptions,
    ) -> BalanceReport {
        let start = match (events.first(), options.anchor) {
            (Some(first), Some(anchor)) => first.timestamp.min(anchor),
            (Some(first), None) => first.timestamp,
            (None, Some(anchor)) => anchor,
            (None, None) => options.now,
        };

        let mut builder = TrajectoryBuilder::new(members, start, options);
        let mut timeline = Vec::new();
        let mut skipped = 0_usize;

        for event in events {
            match builder.apply(event, self.floor_at_zero) {
                Some(entry) => timeline.push(entry),
                None => skipped = skipped.saturating_add(1),
            }
        }

        // Events may be stamped after `now` (solidarity looks one cycle
        // ahead); the closing row never precedes them.
        let end = events
            .last()
            .map_or(options.now, |last| last.timestamp.max(options.now));
        let trajectory = builder.finish(end);
        let final_balances = trajectory.final_current();
        let all_time = trajectory.final_all_time();

        debug!(
            events = events.len(),
            tracked = timeline.len(),
            skipped,
            members = members.len(),
            floor_at_zero = self.floor_at_zero,
            "Balance pass complete"
        );

        BalanceReport {
            final_balances,
            all_time,
            trajectory,
            timeline,
        }
    }
}
