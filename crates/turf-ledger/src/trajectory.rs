//! Balance-over-time series.
//!
//! A [`BalanceTrajectory`] is a table with one row per processed event plus
//! two boundary rows: a zero row at the trajectory start and a closing row
//! at "now" repeating the final values. Every row holds a [`Sample`] for
//! every tracked member, so members unaffected by an event repeat their
//! previous value and the series can be drawn as a step function.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use turf_types::{Event, OTHER_REASON, SOLIDARITY_REASON};

use crate::balance::{TrajectoryOptions, apply_all_time, apply_current};
use crate::reasons::ReasonCounts;

/// One member's balances at one trajectory row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Awards received so far. Never decreases.
    pub all_time: u64,
    /// Current balance after redemptions.
    pub current: i64,
}

/// Row metadata shared by all members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    /// Time of the row.
    pub timestamp: NaiveDateTime,
    /// The event that produced the row; `None` for boundary rows.
    pub event: Option<Event>,
    /// Award tally per reason as of this row, capped.
    pub reason_counts: ReasonCounts,
}

/// A tracked event annotated with its subject's running balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// The event, real or synthetic.
    pub event: Event,
    /// Subject's current balance right after the event.
    pub balance: i64,
    /// Subject's all-time balance right after the event.
    pub all_time: u64,
}

/// Balance series for a set of tracked members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceTrajectory {
    members: Vec<String>,
    rows: Vec<TrajectoryRow>,
    series: BTreeMap<String, Vec<Sample>>,
    folded_reasons: BTreeSet<String>,
}

impl BalanceTrajectory {
    /// Tracked members, in the order they were requested.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Number of rows, boundaries included.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the trajectory has no rows. Never true for a finished
    /// trajectory, which always holds both boundary rows.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row metadata.
    pub fn rows(&self) -> &[TrajectoryRow] {
        &self.rows
    }

    /// Row timestamps.
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    /// Series for one member.
    pub fn series(&self, member: &str) -> Option<&[Sample]> {
        self.series.get(member).map(Vec::as_slice)
    }

    /// Raw reasons that were tallied as "Other" because they are not
    /// configured reason keys.
    pub const fn folded_reasons(&self) -> &BTreeSet<String> {
        &self.folded_reasons
    }

    /// Index of the row in effect at `moment`.
    ///
    /// That is the row just before the first row at or after `moment`,
    /// or the last row when `moment` is past the end. Moments at or before
    /// the start map to the first row.
    pub fn sample_index_at(&self, moment: NaiveDateTime) -> usize {
        let first_not_before = self.rows.partition_point(|r| r.timestamp < moment);
        if first_not_before >= self.rows.len() {
            self.rows.len().saturating_sub(1)
        } else {
            first_not_before.saturating_sub(1)
        }
    }

    /// Every member's sample at `moment`.
    pub fn balances_at(&self, moment: NaiveDateTime) -> BTreeMap<String, Sample> {
        let index = self.sample_index_at(moment);
        self.series
            .iter()
            .map(|(member, samples)| {
                let sample = samples.get(index).copied().unwrap_or_default();
                (member.clone(), sample)
            })
            .collect()
    }

    /// Reason tally at `moment`.
    pub fn reason_counts_at(&self, moment: NaiveDateTime) -> Option<&ReasonCounts> {
        self.rows
            .get(self.sample_index_at(moment))
            .map(|r| &r.reason_counts)
    }

    /// Final current balance per member.
    pub fn final_current(&self) -> BTreeMap<String, i64> {
        self.series
            .iter()
            .map(|(m, s)| (m.clone(), s.last().map_or(0, |x| x.current)))
            .collect()
    }

    /// Final all-time balance per member.
    pub fn final_all_time(&self) -> BTreeMap<String, u64> {
        self.series
            .iter()
            .map(|(m, s)| (m.clone(), s.last().map_or(0, |x| x.all_time)))
            .collect()
    }
}

/// Incremental builder used by the balance calculator.
pub(crate) struct TrajectoryBuilder<'a> {
    options: &'a TrajectoryOptions,
    members: Vec<String>,
    rows: Vec<TrajectoryRow>,
    series: BTreeMap<String, Vec<Sample>>,
    latest: BTreeMap<String, Sample>,
    counts: ReasonCounts,
    folded_reasons: BTreeSet<String>,
}

impl<'a> TrajectoryBuilder<'a> {
    /// Start a trajectory with a zero row at `start`.
    pub(crate) fn new(members: &[String], start: NaiveDateTime, options: &'a TrajectoryOptions) -> Self {
        let mut builder = Self {
            options,
            members: members.to_vec(),
            rows: Vec::new(),
            series: members.iter().map(|m| (m.clone(), Vec::new())).collect(),
            latest: members.iter().map(|m| (m.clone(), Sample::default())).collect(),
            counts: ReasonCounts::new(),
            folded_reasons: BTreeSet::new(),
        };
        builder.push_row(start, None);
        builder
    }

    /// Apply one event. Returns `None` when its subject is not tracked.
    pub(crate) fn apply(&mut self, event: &Event, floor_at_zero: bool) -> Option<TimelineEntry> {
        let sample = self.latest.get_mut(&event.subject)?;
        sample.current = apply_current(sample.current, event.category, floor_at_zero);
        sample.all_time = apply_all_time(sample.all_time, event.category);
        let updated = *sample;

        let reason = self.display_reason(&event.reason);
        if event.category.is_award() {
            self.counts.increment(&reason);
        }

        self.push_row(event.timestamp, Some(event.clone()));

        Some(TimelineEntry {
            event: event.clone(),
            balance: updated.current,
            all_time: updated.all_time,
        })
    }

    /// Close the trajectory with a row at `now`.
    pub(crate) fn finish(mut self, now: NaiveDateTime) -> BalanceTrajectory {
        self.push_row(now, None);
        BalanceTrajectory {
            members: self.members,
            rows: self.rows,
            series: self.series,
            folded_reasons: self.folded_reasons,
        }
    }

    fn display_reason(&mut self, raw: &str) -> String {
        if raw == SOLIDARITY_REASON || self.options.recognized_reasons.contains(raw) {
            raw.to_owned()
        } else {
            self.folded_reasons.insert(raw.to_owned());
            OTHER_REASON.to_owned()
        }
    }

    fn push_row(&mut self, timestamp: NaiveDateTime, event: Option<Event>) {
        for (member, samples) in &mut self.series {
            let sample = self.latest.get(member).copied().unwrap_or_default();
            samples.push(sample);
        }
        self.rows.push(TrajectoryRow {
            timestamp,
            event,
            reason_counts: self.counts.capped(self.options.max_reasons),
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::balance::BalanceCalculator;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .and_then(|d| d.and_hms_opt(18, 30, 0))
            .unwrap_or_default()
    }

    fn options(now: NaiveDateTime, reasons: &[&str], max: usize) -> TrajectoryOptions {
        TrajectoryOptions {
            anchor: None,
            now,
            recognized_reasons: reasons.iter().map(|r| (*r).to_owned()).collect(),
            max_reasons: max,
        }
    }

    fn trajectory(events: &[Event], members: &[&str], opts: &TrajectoryOptions) -> BalanceTrajectory {
        let members: Vec<String> = members.iter().map(|m| (*m).to_owned()).collect();
        BalanceCalculator::new(true)
            .compute(events, &members, opts)
            .trajectory
    }

    #[test]
    fn single_member_has_event_count_plus_two_samples() {
        let events = [
            Event::award("A", at(1), "Beer"),
            Event::redemption("A", at(2), "Anytimer"),
            Event::award("A", at(3), "Beer"),
        ];
        let t = trajectory(&events, &["A"], &options(at(4), &[], usize::MAX));
        assert_eq!(t.series("A").map(<[Sample]>::len), Some(5));
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn unaffected_members_repeat_previous_value() {
        let events = [
            Event::award("A", at(1), "Beer"),
            Event::award("B", at(2), "Beer"),
            Event::award("A", at(3), "Beer"),
        ];
        let t = trajectory(&events, &["A", "B"], &options(at(4), &[], usize::MAX));
        let b: Vec<i64> = t.series("B").unwrap_or_default().iter().map(|s| s.current).collect();
        assert_eq!(b, [0, 0, 1, 1, 1]);
    }

    #[test]
    fn all_time_is_monotonic() {
        let events = [
            Event::award("A", at(1), "Beer"),
            Event::redemption("A", at(2), "Anytimer"),
            Event::redemption("A", at(3), "Anytimer"),
            Event::award("A", at(4), "Beer"),
        ];
        let t = trajectory(&events, &["A"], &options(at(5), &[], usize::MAX));
        let series = t.series("A").unwrap_or_default();
        assert!(series.windows(2).all(|w| match w {
            [a, b] => a.all_time <= b.all_time,
            _ => true,
        }));
        assert_eq!(series.last().map(|s| s.all_time), Some(2));
    }

    #[test]
    fn unknown_reasons_are_tallied_as_other() {
        let events = [
            Event::award("A", at(1), "Beer"),
            Event::award("A", at(2), "Singing off-key"),
            Event::redemption("A", at(3), "Paid up"),
        ];
        let t = trajectory(&events, &["A"], &options(at(4), &["Beer"], usize::MAX));
        let last = t.rows().last().map(|r| r.reason_counts.clone()).unwrap_or_default();
        assert_eq!(last.get("Beer"), 1);
        assert_eq!(last.get("Other"), 1);
        // Redemptions are not tallied but their unknown reasons are reported.
        assert!(t.folded_reasons().contains("Singing off-key"));
        assert!(t.folded_reasons().contains("Paid up"));
    }

    #[test]
    fn balances_at_follows_step_semantics() {
        let events = [
            Event::award("A", at(2), "Beer"),
            Event::award("A", at(4), "Beer"),
        ];
        let mut opts = options(at(6), &[], usize::MAX);
        opts.anchor = Some(at(1));
        let t = trajectory(&events, &["A"], &opts);

        let current = |day| t.balances_at(at(day)).get("A").map(|s| s.current);
        assert_eq!(current(1), Some(0));
        assert_eq!(current(3), Some(1));
        assert_eq!(current(5), Some(2));
        assert_eq!(current(30), Some(2));
    }

    #[test]
    fn reason_cap_applies_per_row() {
        let events = [
            Event::award("A", at(1), "Beer"),
            Event::award("A", at(2), "Late"),
            Event::award("A", at(3), "Beer"),
            Event::award("A", at(4), "Noise"),
        ];
        let t = trajectory(&events, &["A"], &options(at(5), &["Beer", "Late", "Noise"], 2));
        let last = t.rows().last().map(|r| r.reason_counts.clone()).unwrap_or_default();
        let pairs: Vec<(&str, u64)> = last.iter().collect();
        assert_eq!(pairs, [("Other", 2), ("Beer", 2)]);
    }
}
