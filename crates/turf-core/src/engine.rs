//! The ledger engine: one evaluation pass from raw events to standings.
//!
//! [`LedgerEngine::evaluate`] is the single entry point the rest of the
//! system needs. It owns no events; every call sorts the input into a fresh
//! [`EventStore`], optionally runs the solidarity rule over it, and computes
//! balances, the trajectory, the enriched timeline and the reason summary.
//! Synthetic solidarity awards are derived on every call and never leak
//! back into the caller's events.
//!
//! # Scope
//!
//! Two member sets take part in a pass:
//!
//! - the *population*, whose balances are computed and among whom the
//!   solidarity rule redistributes;
//! - the *scope*, the reporting subset the trajectory and timeline track.
//!
//! [`LedgerEngine::evaluate`] uses the full roster for both.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use turf_ledger::{
    BalanceCalculator, BalanceTrajectory, EventStore, ReasonCounts, Sample, TimelineEntry,
    TrajectoryOptions,
};
use turf_types::{Event, EventRecord};

use crate::config::{ConfigError, TurfConfig};
use crate::error::EngineError;
use crate::identity::{IdentityError, Resolution};
use crate::solidarity::{Injection, SolidarityEngine};

/// Everything one evaluation pass produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Effective end of the pass: the later of the requested moment and the
    /// latest event.
    pub now: NaiveDateTime,
    /// Final current balance per population member.
    pub balances: BTreeMap<String, i64>,
    /// Final all-time (awards only) balance per population member.
    pub all_time: BTreeMap<String, u64>,
    /// Balance series for the scope.
    pub trajectory: BalanceTrajectory,
    /// Scope events with their subject's running balance.
    pub timeline: Vec<TimelineEntry>,
    /// Award counts per reason over the scope, capped.
    pub reason_summary: ReasonCounts,
    /// Raw reasons that were tallied as "Other".
    pub folded_reasons: BTreeSet<String>,
    /// Solidarity injections, in evaluation order.
    pub injections: Vec<Injection>,
    /// Every event of the pass, synthetic ones included, in order.
    pub events: Vec<Event>,
}

impl Evaluation {
    /// Index of the trajectory row in effect at `moment`.
    pub fn sample_index_at(&self, moment: NaiveDateTime) -> usize {
        self.trajectory.sample_index_at(moment)
    }

    /// Scope balances as of `moment`.
    pub fn balances_at(&self, moment: NaiveDateTime) -> BTreeMap<String, Sample> {
        self.trajectory.balances_at(moment)
    }

    /// Members whose current balance reaches `threshold`, highest first.
    pub fn anytimers(&self, threshold: i64) -> Vec<(&str, i64)> {
        let mut owing: Vec<(&str, i64)> = self
            .balances
            .iter()
            .filter(|(_, balance)| **balance >= threshold)
            .map(|(member, balance)| (member.as_str(), *balance))
            .collect();
        owing.sort_by(|a, b| b.1.cmp(&a.1));
        owing
    }

    /// Number of synthetic awards injected by the solidarity rule.
    pub fn solidarity_awards(&self) -> u64 {
        self.injections
            .iter()
            .fold(0_u64, |total, i| total.saturating_add(i.amount))
    }
}

/// Evaluates ledgers under one validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEngine {
    config: TurfConfig,
    calculator: BalanceCalculator,
    solidarity: Option<SolidarityEngine>,
}

impl LedgerEngine {
    /// Create an engine from validated configuration.
    pub fn new(config: TurfConfig) -> Self {
        let floor_at_zero = config.rules.floor_at_zero;
        let solidarity = config
            .rules
            .solidarity
            .map(|schedule| SolidarityEngine::new(schedule, floor_at_zero));
        Self {
            config,
            calculator: BalanceCalculator::new(floor_at_zero),
            solidarity,
        }
    }

    /// Create an engine from a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        TurfConfig::parse(yaml).map(Self::new)
    }

    /// The configuration.
    pub const fn config(&self) -> &TurfConfig {
        &self.config
    }

    /// Roster names in roster order.
    pub fn members(&self) -> Vec<String> {
        self.config.roster.names()
    }

    /// Resolve free text to a roster member.
    pub fn resolve_member(&self, text: &str) -> Resolution {
        self.config.roster.resolve(text)
    }

    /// Resolve a reporting scope.
    ///
    /// Empty text selects every member. A group name or alias selects that
    /// group. Anything else is read as a comma-separated member list.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UnknownMembers`] listing every name in the
    /// list that does not resolve to a member.
    pub fn resolve_scope(&self, text: &str) -> Result<Vec<String>, IdentityError> {
        self.resolve_scope_accepting(text, &BTreeSet::new())
    }

    /// As [`Self::resolve_scope`], but names in `accepted` stand as
    /// themselves instead of being rejected.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UnknownMembers`] listing every name that is
    /// neither a member nor in `accepted`.
    pub fn resolve_scope_accepting(
        &self,
        text: &str,
        accepted: &BTreeSet<String>,
    ) -> Result<Vec<String>, IdentityError> {
        if text.trim().is_empty() {
            return Ok(self.members());
        }
        if let Some((group, members)) = self.config.groups.lookup(text) {
            debug!(group, members = members.len(), "Scope resolved to group");
            return Ok(members.to_vec());
        }

        let mut scope = Vec::new();
        let mut unknown = Vec::new();
        for resolution in self.config.roster.resolve_list(text) {
            match resolution {
                Resolution::Unknown(name) if !accepted.contains(&name) => unknown.push(name),
                resolved => {
                    let name = resolved.into_identity();
                    if !scope.contains(&name) {
                        scope.push(name);
                    }
                }
            }
        }
        if unknown.is_empty() {
            Ok(scope)
        } else {
            Err(IdentityError::UnknownMembers { names: unknown })
        }
    }

    /// Evaluate `raw` for the whole roster.
    pub fn evaluate<I>(&self, raw: I, now: NaiveDateTime) -> Evaluation
    where
        I: IntoIterator<Item = Event>,
    {
        let members = self.members();
        self.evaluate_scoped(raw, &members, &members, now)
    }

    /// Evaluate `raw` for the whole roster, tracking only `scope` in the
    /// trajectory and timeline.
    pub fn evaluate_for<I>(&self, raw: I, scope: &[String], now: NaiveDateTime) -> Evaluation
    where
        I: IntoIterator<Item = Event>,
    {
        let members = self.members();
        self.evaluate_scoped(raw, &members, scope, now)
    }

    /// Parse persisted records and evaluate them for the whole roster.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Record`] for the first malformed record; no
    /// partial evaluation is produced.
    pub fn evaluate_records(
        &self,
        records: &[EventRecord],
        now: NaiveDateTime,
    ) -> Result<Evaluation, EngineError> {
        let events = records
            .iter()
            .map(EventRecord::to_event)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.evaluate(events, now))
    }

    /// Evaluate `raw` with explicit population and scope.
    pub fn evaluate_scoped<I>(
        &self,
        raw: I,
        population: &[String],
        scope: &[String],
        now: NaiveDateTime,
    ) -> Evaluation
    where
        I: IntoIterator<Item = Event>,
    {
        let store = EventStore::from_unsorted(raw.into_iter().filter(|e| !e.synthetic));
        let now = store.latest_timestamp().map_or(now, |latest| latest.max(now));

        let untracked = store
            .iter()
            .filter(|e| !population.contains(&e.subject))
            .count();
        if untracked > 0 {
            warn!(untracked, "Events attributed to subjects outside the population");
        }

        let (store, solidarity_balances, injections) = match &self.solidarity {
            Some(engine) => {
                let outcome = engine.run(store, population, now);
                debug!(
                    evaluations = outcome.evaluations,
                    injections = outcome.injections.len(),
                    "Solidarity pass complete"
                );
                (outcome.store, Some(outcome.balances), outcome.injections)
            }
            None => (store, None, Vec::new()),
        };

        let events = store.into_events();
        let balances = solidarity_balances
            .unwrap_or_else(|| self.calculator.balances(&events, population));
        let all_time = self.calculator.all_time_balances(&events, population);

        let options = TrajectoryOptions {
            anchor: self.config.rules.anchor,
            now,
            recognized_reasons: self.config.recognized_reasons(),
            max_reasons: self.config.rules.max_reasons,
        };
        let report = self.calculator.compute(&events, scope, &options);

        let reason_summary = report
            .trajectory
            .rows()
            .last()
            .map(|row| row.reason_counts.clone())
            .unwrap_or_default();
        let folded_reasons = report.trajectory.folded_reasons().clone();

        info!(
            events = events.len(),
            population = population.len(),
            scope = scope.len(),
            injections = injections.len(),
            %now,
            "Evaluation complete"
        );

        Evaluation {
            now,
            balances,
            all_time,
            trajectory: report.trajectory,
            timeline: report.timeline,
            reason_summary,
            folded_reasons,
            injections,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const CONFIG: &str = r#"
names:
  a: Anna
  b: Bob
  c: Carla
aliases:
  b: [Bobby]
groups:
  Kitchen: [Anna, Carla]
turfreasons:
  Beer: { aliases: [b] }
turfrules:
  forcenonegative: true
plotsettings:
  day0: "12:00 1 Jan 2024"
  maxreasons: 4
"#;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap_or_default()
    }

    fn engine() -> Option<LedgerEngine> {
        LedgerEngine::from_yaml(CONFIG).ok()
    }

    #[test]
    fn plain_balances_without_solidarity() {
        let Some(engine) = engine() else { return };
        let events = vec![
            Event::award("Anna", at(2, 10), "Beer"),
            Event::award("Anna", at(3, 10), "Beer"),
            Event::award("Bob", at(4, 10), "Beer"),
            Event::redemption("Carla", at(5, 10), "Anytimer"),
        ];
        let evaluation = engine.evaluate(events, at(6, 0));
        assert_eq!(evaluation.balances.get("Anna"), Some(&2));
        assert_eq!(evaluation.balances.get("Bob"), Some(&1));
        assert_eq!(evaluation.balances.get("Carla"), Some(&0));
        assert!(evaluation.injections.is_empty());
    }

    #[test]
    fn now_is_raised_to_latest_event() {
        let Some(engine) = engine() else { return };
        let evaluation = engine.evaluate(vec![Event::award("Anna", at(9, 10), "Beer")], at(2, 0));
        assert_eq!(evaluation.now, at(9, 10));
        assert_eq!(evaluation.trajectory.rows().last().map(|r| r.timestamp), Some(at(9, 10)));
    }

    #[test]
    fn scope_limits_trajectory_but_not_balances() {
        let Some(engine) = engine() else { return };
        let events = vec![
            Event::award("Anna", at(2, 10), "Beer"),
            Event::award("Bob", at(3, 10), "Beer"),
        ];
        let scope = vec!["Bob".to_owned()];
        let evaluation = engine.evaluate_for(events, &scope, at(6, 0));
        assert_eq!(evaluation.balances.len(), 3);
        assert_eq!(evaluation.timeline.len(), 1);
        assert!(evaluation.trajectory.series("Anna").is_none());
    }

    #[test]
    fn scope_resolution() {
        let Some(engine) = engine() else { return };
        assert_eq!(engine.resolve_scope("").ok().map(|s| s.len()), Some(3));
        assert_eq!(engine.resolve_scope("kitchen").ok(), Some(vec!["Anna".to_owned(), "Carla".to_owned()]));
        assert_eq!(engine.resolve_scope("bobby, anna, Bob").ok(), Some(vec!["Bob".to_owned(), "Anna".to_owned()]));
        assert!(matches!(
            engine.resolve_scope("Anna, Zebedeus"),
            Err(IdentityError::UnknownMembers { ref names }) if names == &["Zebedeus".to_owned()]
        ));
    }

    #[test]
    fn unknown_reasons_are_summarized_as_other() {
        let Some(engine) = engine() else { return };
        let events = vec![
            Event::award("Anna", at(2, 10), "Beer"),
            Event::award("Anna", at(2, 11), "Juggling"),
        ];
        let evaluation = engine.evaluate(events, at(6, 0));
        assert_eq!(evaluation.reason_summary.get("Beer"), 1);
        assert_eq!(evaluation.reason_summary.get("Other"), 1);
        assert!(evaluation.folded_reasons.contains("Juggling"));
    }

    #[test]
    fn malformed_record_aborts_evaluation() {
        let Some(engine) = engine() else { return };
        let record = EventRecord {
            category: "turf".to_owned(),
            subject: "Anna".to_owned(),
            time: "99:99".to_owned(),
            day: "1".to_owned(),
            month: "Jan".to_owned(),
            year: "2024".to_owned(),
            reason: "Beer".to_owned(),
        };
        let result = engine.evaluate_records(&[record], at(6, 0));
        assert!(matches!(result, Err(EngineError::Record { .. })));
    }

    #[test]
    fn anytimers_reach_threshold() {
        let Some(engine) = engine() else { return };
        let events: Vec<Event> = (1..=3)
            .map(|hour| Event::award("Bob", at(2, hour), "Beer"))
            .chain([Event::award("Anna", at(2, 5), "Beer")])
            .collect();
        let evaluation = engine.evaluate(events, at(6, 0));
        assert_eq!(evaluation.anytimers(2), [("Bob", 3)]);
        assert!(evaluation.anytimers(4).is_empty());
    }

    #[test]
    fn synthetic_input_events_are_discarded() {
        let Some(engine) = engine() else { return };
        let events = vec![Event::solidarity("Anna", at(2, 10))];
        let evaluation = engine.evaluate(events, at(6, 0));
        assert_eq!(evaluation.balances.get("Anna"), Some(&0));
        assert!(evaluation.events.is_empty());
    }
}
