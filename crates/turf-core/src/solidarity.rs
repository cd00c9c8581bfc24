//! The solidarity rule: periodic redistribution towards a lonely minimum.
//!
//! Once per week, at a configured weekday and time of day, the engine looks
//! at the activity of the past seven days. If exactly one member is alone at
//! the bottom of the standings, that member receives synthetic awards until
//! they draw level with the second-lowest member.
//!
//! # Clock
//!
//! A synthetic clock `timetrack` starts at the configured anchor. After the
//! first evaluation it advances by [`SolidaritySchedule::first_offset`] to
//! the first configured moment after the anchor, and by exactly seven days
//! from then on. Evaluation continues until `timetrack` passes `now + 7d`.
//!
//! # Window
//!
//! Each evaluation folds the events in `(timetrack - 7d, timetrack]` into a
//! scratch balance map that persists across evaluations. The lower bound is
//! clipped to the previous evaluation moment, so an event is folded at most
//! once even when the first step is shorter than a week. Synthetic awards
//! are stamped at `timetrack` and counted directly, so they never reappear
//! in a later window.
//!
//! Nothing is injected when the window has no tracked activity, when fewer
//! than two members are tracked, or when the minimum is shared.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime, NaiveTime, TimeDelta, Weekday};
use tracing::{debug, trace};

use turf_ledger::EventStore;
use turf_ledger::balance::apply_current;
use turf_types::Event;

/// Length of one solidarity window.
const fn week() -> TimeDelta {
    TimeDelta::days(7)
}

/// When the solidarity rule is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidaritySchedule {
    /// First evaluation moment and origin of the schedule.
    pub anchor: NaiveDateTime,
    /// Weekday of every later evaluation.
    pub weekday: Weekday,
    /// Time of day of every later evaluation.
    pub time_of_day: NaiveTime,
}

impl SolidaritySchedule {
    /// Offset from the anchor to the first configured weekday and time of
    /// day after it. Always in `(0, 7d]`: a zero or negative raw offset has
    /// one week added.
    pub fn first_offset(&self) -> TimeDelta {
        let anchor_day = i64::from(self.anchor.weekday().num_days_from_monday());
        let target_day = i64::from(self.weekday.num_days_from_monday());
        let days = target_day.saturating_sub(anchor_day).rem_euclid(7);

        let time_shift = self.time_of_day.signed_duration_since(self.anchor.time());
        let raw = TimeDelta::days(days)
            .checked_add(&time_shift)
            .unwrap_or_else(TimeDelta::zero);

        if raw <= TimeDelta::zero() {
            raw.checked_add(&week()).unwrap_or_else(week)
        } else {
            raw
        }
    }

    /// Every evaluation moment up to and including `until`.
    pub fn moments_until(&self, until: NaiveDateTime) -> Vec<NaiveDateTime> {
        let mut moments = Vec::new();
        let mut timetrack = self.anchor;
        let mut step = self.first_offset();
        while timetrack <= until {
            moments.push(timetrack);
            match timetrack.checked_add_signed(step) {
                Some(next) => timetrack = next,
                None => break,
            }
            step = week();
        }
        moments
    }
}

/// One batch of synthetic awards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    /// Evaluation moment the awards are stamped with.
    pub timestamp: NaiveDateTime,
    /// Member who was alone at the minimum.
    pub member: String,
    /// Number of synthetic awards.
    pub amount: u64,
    /// The member's window balance before the injection.
    pub lowest: i64,
    /// The second-lowest window balance, reached after the injection.
    pub second_lowest: i64,
}

/// Result of one solidarity pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolidarityOutcome {
    /// The input events plus every synthetic award, in order.
    pub store: EventStore,
    /// Post-solidarity balance per tracked member.
    pub balances: BTreeMap<String, i64>,
    /// Every injection, in evaluation order.
    pub injections: Vec<Injection>,
    /// Number of evaluation moments visited.
    pub evaluations: usize,
}

/// Applies the solidarity rule over an event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidarityEngine {
    schedule: SolidaritySchedule,
    floor_at_zero: bool,
}

impl SolidarityEngine {
    /// Create an engine for a schedule and redemption rule.
    pub const fn new(schedule: SolidaritySchedule, floor_at_zero: bool) -> Self {
        Self {
            schedule,
            floor_at_zero,
        }
    }

    /// The evaluation schedule.
    pub const fn schedule(&self) -> &SolidaritySchedule {
        &self.schedule
    }

    /// Run the rule from the anchor until one week past `now`.
    ///
    /// The store is taken by value and returned with the synthetic awards
    /// inserted. Each call starts from a fresh scratch map, so repeated
    /// runs over the same events give identical results.
    pub fn run(&self, mut store: EventStore, members: &[String], now: NaiveDateTime) -> SolidarityOutcome {
        let horizon = now.checked_add_signed(week()).unwrap_or(now);
        let mut scratch: BTreeMap<String, i64> = members.iter().map(|m| (m.clone(), 0)).collect();
        let mut injections = Vec::new();
        let mut evaluations = 0_usize;

        let mut timetrack = self.schedule.anchor;
        let mut previous: Option<NaiveDateTime> = None;
        let mut step = self.schedule.first_offset();

        while timetrack <= horizon {
            evaluations = evaluations.saturating_add(1);

            let after = match (timetrack.checked_sub_signed(week()), previous) {
                (Some(lower), Some(prev)) => Some(lower.max(prev)),
                (lower, prev) => lower.or(prev),
            };

            let folded = self.fold_window(store.window(after, timetrack), &mut scratch);
            trace!(%timetrack, folded, "Solidarity window folded");

            if folded > 0 {
                if let Some(injection) = lonely_minimum(&scratch, timetrack) {
                    for _ in 0..injection.amount {
                        store.insert(Event::solidarity(injection.member.clone(), timetrack));
                    }
                    if let Some(balance) = scratch.get_mut(&injection.member) {
                        *balance = injection.second_lowest;
                    }
                    debug!(
                        member = injection.member,
                        amount = injection.amount,
                        %timetrack,
                        "Solidarity injected"
                    );
                    injections.push(injection);
                }
            }

            previous = Some(timetrack);
            match timetrack.checked_add_signed(step) {
                Some(next) => timetrack = next,
                None => break,
            }
            step = week();
        }

        SolidarityOutcome {
            store,
            balances: scratch,
            injections,
            evaluations,
        }
    }

    /// Fold window events into the scratch map. Returns how many events
    /// belonged to tracked members.
    fn fold_window(&self, window: &[Event], scratch: &mut BTreeMap<String, i64>) -> usize {
        let mut folded = 0_usize;
        for event in window {
            if let Some(balance) = scratch.get_mut(&event.subject) {
                *balance = apply_current(*balance, event.category, self.floor_at_zero);
                folded = folded.saturating_add(1);
            }
        }
        folded
    }
}

/// The injection needed when exactly one member holds the minimum.
fn lonely_minimum(scratch: &BTreeMap<String, i64>, timestamp: NaiveDateTime) -> Option<Injection> {
    let lowest = scratch.values().copied().min()?;
    let mut at_minimum = scratch.iter().filter(|(_, balance)| **balance == lowest);
    let (member, _) = at_minimum.next()?;
    if at_minimum.next().is_some() {
        return None;
    }

    let second_lowest = scratch
        .iter()
        .filter(|(name, _)| *name != member)
        .map(|(_, balance)| *balance)
        .min()?;
    let amount = u64::try_from(second_lowest.saturating_sub(lowest)).ok()?;

    Some(Injection {
        timestamp,
        member: member.clone(),
        amount,
        lowest,
        second_lowest,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap_or_default()
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| (*n).to_owned()).collect()
    }

    // 2024-01-01 is a Monday.
    fn monday_schedule() -> SolidaritySchedule {
        SolidaritySchedule {
            anchor: at(1, 1, 12, 0),
            weekday: Weekday::Mon,
            time_of_day: time(20, 0),
        }
    }

    #[test]
    fn first_offset_same_day_later_time() {
        assert_eq!(monday_schedule().first_offset(), TimeDelta::hours(8));
    }

    #[test]
    fn first_offset_later_weekday() {
        let schedule = SolidaritySchedule {
            weekday: Weekday::Wed,
            ..monday_schedule()
        };
        assert_eq!(
            schedule.first_offset(),
            TimeDelta::days(2).checked_add(&TimeDelta::hours(8)).unwrap_or_default()
        );
    }

    #[test]
    fn first_offset_earlier_time_wraps_to_next_week() {
        let schedule = SolidaritySchedule {
            time_of_day: time(9, 0),
            ..monday_schedule()
        };
        assert_eq!(
            schedule.first_offset(),
            TimeDelta::days(6).checked_add(&TimeDelta::hours(21)).unwrap_or_default()
        );
    }

    #[test]
    fn first_offset_exact_match_is_a_full_week() {
        let schedule = SolidaritySchedule {
            time_of_day: time(12, 0),
            ..monday_schedule()
        };
        assert_eq!(schedule.first_offset(), TimeDelta::days(7));
    }

    #[test]
    fn moments_align_to_weekday_and_time() {
        let moments = monday_schedule().moments_until(at(1, 20, 0, 0));
        assert_eq!(
            moments,
            [at(1, 1, 12, 0), at(1, 1, 20, 0), at(1, 8, 20, 0), at(1, 15, 20, 0)]
        );
    }

    #[test]
    fn lonely_minimum_is_lifted_to_second_lowest() {
        let events = [
            Event::award("A", at(1, 1, 14, 0), "Beer"),
            Event::award("A", at(1, 1, 15, 0), "Beer"),
            Event::award("A", at(1, 1, 16, 0), "Beer"),
        ];
        let engine = SolidarityEngine::new(monday_schedule(), true);
        let outcome = engine.run(EventStore::from_unsorted(events), &names(&["A", "B"]), at(1, 1, 21, 0));

        assert_eq!(outcome.injections.len(), 1);
        let injection = outcome.injections.first().cloned();
        assert_eq!(injection.as_ref().map(|i| i.amount), Some(3));
        assert_eq!(injection.as_ref().map(|i| i.timestamp), Some(at(1, 1, 20, 0)));
        assert_eq!(outcome.balances.get("B"), Some(&3));
        assert_eq!(outcome.balances.get("A"), Some(&3));

        let synthetic: Vec<&Event> = outcome.store.iter().filter(|e| e.synthetic).collect();
        assert_eq!(synthetic.len(), 3);
        assert!(synthetic.iter().all(|e| e.subject == "B" && e.timestamp == at(1, 1, 20, 0)));
    }

    #[test]
    fn lonely_minimum_is_lifted_to_the_next_member_not_the_highest() {
        let mut events: Vec<Event> = (10..15)
            .map(|hour| Event::award("A", at(1, 2, hour, 0), "Beer"))
            .collect();
        events.push(Event::award("B", at(1, 3, 10, 0), "Beer"));
        events.push(Event::award("B", at(1, 3, 11, 0), "Beer"));
        let engine = SolidarityEngine::new(monday_schedule(), true);
        let outcome = engine.run(
            EventStore::from_unsorted(events),
            &names(&["A", "B", "C"]),
            at(1, 8, 21, 0),
        );

        assert_eq!(outcome.injections.len(), 1);
        let injection = outcome.injections.first().cloned();
        assert_eq!(injection.as_ref().map(|i| i.member.as_str()), Some("C"));
        assert_eq!(injection.as_ref().map(|i| i.amount), Some(2));
        assert_eq!(injection.as_ref().map(|i| (i.lowest, i.second_lowest)), Some((0, 2)));
        assert_eq!(outcome.balances.get("A"), Some(&5));
        assert_eq!(outcome.balances.get("B"), Some(&2));
        assert_eq!(outcome.balances.get("C"), Some(&2));
        assert_eq!(outcome.store.iter().filter(|e| e.synthetic).count(), 2);
    }

    #[test]
    fn shared_minimum_means_no_injection() {
        let events = [
            Event::award("A", at(1, 1, 14, 0), "Beer"),
            Event::award("A", at(1, 1, 15, 0), "Beer"),
        ];
        let engine = SolidarityEngine::new(monday_schedule(), true);
        let outcome = engine.run(
            EventStore::from_unsorted(events),
            &names(&["A", "B", "C"]),
            at(1, 1, 21, 0),
        );
        assert!(outcome.injections.is_empty());
        assert_eq!(outcome.store.len(), 2);
    }

    #[test]
    fn empty_window_means_no_injection() {
        let engine = SolidarityEngine::new(monday_schedule(), true);
        let outcome = engine.run(EventStore::new(), &names(&["A", "B"]), at(1, 20, 0, 0));
        assert!(outcome.injections.is_empty());
        assert!(outcome.evaluations > 0);
    }

    #[test]
    fn single_member_never_receives_solidarity() {
        let events = [Event::redemption("A", at(1, 1, 14, 0), "Anytimer")];
        let engine = SolidarityEngine::new(monday_schedule(), false);
        let outcome = engine.run(EventStore::from_unsorted(events), &names(&["A"]), at(1, 2, 0, 0));
        assert!(outcome.injections.is_empty());
        assert_eq!(outcome.balances.get("A"), Some(&-1));
    }

    #[test]
    fn events_are_not_folded_twice_across_the_short_first_step() {
        // Anchor 12:00, first evaluation step 8h; week windows overlap.
        let events = [
            Event::award("A", at(1, 1, 10, 0), "Beer"),
            Event::award("B", at(1, 1, 11, 0), "Beer"),
            Event::award("B", at(1, 1, 16, 0), "Beer"),
        ];
        let engine = SolidarityEngine::new(monday_schedule(), true);
        let outcome = engine.run(EventStore::from_unsorted(events), &names(&["A", "B"]), at(1, 2, 0, 0));
        // At 12:00: A=1, B=1 tied. At 20:00: B=2, A=1 lonely, lifted by 1.
        assert_eq!(outcome.balances.get("A"), Some(&2));
        assert_eq!(outcome.balances.get("B"), Some(&2));
        assert_eq!(outcome.injections.len(), 1);
    }

    #[test]
    fn future_cycle_is_evaluated() {
        // The last event falls after the most recent configured moment;
        // the cycle one week past now still evaluates it.
        let events = [
            Event::award("A", at(1, 9, 10, 0), "Beer"),
            Event::award("A", at(1, 9, 11, 0), "Beer"),
        ];
        let engine = SolidarityEngine::new(monday_schedule(), true);
        let outcome = engine.run(EventStore::from_unsorted(events), &names(&["A", "B"]), at(1, 10, 0, 0));
        let injection = outcome.injections.first().cloned();
        assert_eq!(injection.map(|i| (i.timestamp, i.amount)), Some((at(1, 15, 20, 0), 2)));
    }

    #[test]
    fn floored_redemptions_in_window() {
        let events = [
            Event::redemption("B", at(1, 1, 13, 0), "Anytimer"),
            Event::award("A", at(1, 1, 14, 0), "Beer"),
        ];
        let engine = SolidarityEngine::new(monday_schedule(), true);
        let outcome = engine.run(EventStore::from_unsorted(events), &names(&["A", "B"]), at(1, 1, 21, 0));
        // B stays at 0 rather than -1, so one award closes the gap.
        assert_eq!(outcome.injections.first().map(|i| i.amount), Some(1));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let events = vec![
            Event::award("A", at(1, 2, 14, 0), "Beer"),
            Event::award("A", at(1, 3, 15, 0), "Beer"),
            Event::redemption("A", at(1, 10, 15, 0), "Anytimer"),
            Event::award("C", at(1, 11, 15, 0), "Beer"),
        ];
        let engine = SolidarityEngine::new(monday_schedule(), true);
        let members = names(&["A", "B", "C"]);
        let first = engine.run(EventStore::from_unsorted(events.clone()), &members, at(1, 20, 0, 0));
        let second = engine.run(EventStore::from_unsorted(events), &members, at(1, 20, 0, 0));
        assert_eq!(first, second);
    }
}
