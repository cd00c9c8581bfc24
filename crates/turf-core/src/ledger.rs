//! Append-only ledger of real events with two-phase entry.
//!
//! New entries are first *prepared*: targets and reason are resolved and
//! the entry is expanded into one event per target per point. A prepared
//! entry lists any targets that did not resolve to a known identity. It is
//! then *committed*, which refuses unknown targets unless the caller has
//! confirmed them. Confirmed literal identities are tracked alongside the
//! roster from then on.
//!
//! The ledger stores only real events. Synthetic solidarity awards are
//! derived on every [`Ledger::evaluate`] and never stored.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use turf_types::{Category, Event, EventRecord, OTHER_REASON};

use crate::engine::{Evaluation, LedgerEngine};
use crate::identity::{IdentityError, Resolution};

/// Errors raised while entering events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    /// The target text named nobody.
    #[error("no targets given")]
    NoTargets,

    /// The entry has a zero amount.
    #[error("amount must be at least 1")]
    ZeroAmount,

    /// Some targets are unknown and were not confirmed.
    #[error("not recognized: {}", names.join(", "))]
    UnconfirmedIdentities {
        /// The unknown targets, as typed.
        names: Vec<String>,
    },
}

/// Whether unknown targets may be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Refuse entries with unknown targets.
    Required,
    /// Accept unknown targets as new literal identities.
    AcceptUnknown,
}

/// An entry as typed by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    /// Award or redemption.
    pub category: Category,
    /// Comma-separated names or aliases.
    pub targets: String,
    /// Reason key, alias or free text. Empty means "Other".
    pub reason: String,
    /// Points per target; the reason's default value when `None`.
    pub amount: Option<u32>,
    /// Moment of the entry.
    pub timestamp: NaiveDateTime,
}

/// A resolved entry awaiting commit.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEntry {
    /// Award or redemption.
    pub category: Category,
    /// Resolved targets in input order, duplicates removed.
    pub targets: Vec<String>,
    /// Targets that are neither members nor accepted literals.
    pub unknown: Vec<String>,
    /// Resolution of the reason text.
    pub reason: Resolution,
    /// Points per target.
    pub amount: u32,
    /// Moment of the entry.
    pub timestamp: NaiveDateTime,
}

impl PreparedEntry {
    /// Whether committing needs [`Confirmation::AcceptUnknown`].
    pub const fn needs_confirmation(&self) -> bool {
        !self.unknown.is_empty()
    }

    /// The events this entry expands into: one per target per point.
    pub fn events(&self) -> Vec<Event> {
        let reason = self.reason.identity();
        self.targets
            .iter()
            .flat_map(|target| {
                (0..self.amount).map(move |_| match self.category {
                    Category::Award => Event::award(target.as_str(), self.timestamp, reason),
                    Category::Redemption => Event::redemption(target.as_str(), self.timestamp, reason),
                })
            })
            .collect()
    }
}

/// Real events for one roster, plus identities accepted outside it.
#[derive(Debug, Clone)]
pub struct Ledger {
    engine: LedgerEngine,
    events: Vec<Event>,
    literals: BTreeSet<String>,
}

impl Ledger {
    /// An empty ledger.
    pub const fn new(engine: LedgerEngine) -> Self {
        Self {
            engine,
            events: Vec::new(),
            literals: BTreeSet::new(),
        }
    }

    /// A ledger holding previously persisted events.
    ///
    /// Subjects outside the roster are registered as accepted literals.
    pub fn with_events<I>(engine: LedgerEngine, events: I) -> Self
    where
        I: IntoIterator<Item = Event>,
    {
        let mut ledger = Self::new(engine);
        ledger.ingest(events);
        ledger
    }

    /// Append already-resolved events, registering unknown subjects as
    /// literals. Synthetic events are dropped.
    pub fn ingest<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = Event>,
    {
        for event in events.into_iter().filter(|e| !e.synthetic) {
            if !self.engine.config().roster.contains(&event.subject)
                && self.literals.insert(event.subject.clone())
            {
                warn!(subject = event.subject, "Ledger holds events for a subject outside the roster");
            }
            self.events.push(event);
        }
    }

    /// The engine.
    pub const fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Stored events in entry order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of stored events.
    pub const fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the ledger is empty.
    pub const fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Accepted identities outside the roster.
    pub const fn literals(&self) -> &BTreeSet<String> {
        &self.literals
    }

    /// Roster members followed by accepted literals.
    pub fn population(&self) -> Vec<String> {
        let mut population = self.engine.members();
        population.extend(self.literals.iter().cloned());
        population
    }

    /// Resolve and expand an entry without storing it.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::NoTargets`] when the target text names nobody
    /// and [`EntryError::ZeroAmount`] for an explicit zero amount.
    pub fn prepare(&self, request: &EntryRequest) -> Result<PreparedEntry, EntryError> {
        let config = self.engine.config();

        let mut targets: Vec<String> = Vec::new();
        let mut unknown = Vec::new();
        for resolution in config.roster.resolve_list(&request.targets) {
            let known = resolution.is_known() || self.literals.contains(resolution.identity());
            let name = resolution.into_identity();
            if targets.contains(&name) {
                continue;
            }
            if !known {
                unknown.push(name.clone());
            }
            targets.push(name);
        }
        if targets.is_empty() {
            return Err(EntryError::NoTargets);
        }

        let reasons = match request.category {
            Category::Award => &config.turf_reasons,
            Category::Redemption => &config.inning_reasons,
        };
        let reason_text = request.reason.trim();
        let reason = if reason_text.is_empty() {
            Resolution::Unknown(OTHER_REASON.to_owned())
        } else {
            reasons.resolve(reason_text)
        };

        let amount = request
            .amount
            .unwrap_or_else(|| reasons.default_value(reason.identity()));
        if amount == 0 {
            return Err(EntryError::ZeroAmount);
        }

        debug!(
            category = %request.category,
            targets = targets.len(),
            unknown = unknown.len(),
            reason = reason.identity(),
            amount,
            "Entry prepared"
        );

        Ok(PreparedEntry {
            category: request.category,
            targets,
            unknown,
            reason,
            amount,
            timestamp: request.timestamp,
        })
    }

    /// Store a prepared entry. Returns the number of events added.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::UnconfirmedIdentities`] when the entry has
    /// unknown targets and `confirmation` is [`Confirmation::Required`].
    pub fn commit(
        &mut self,
        prepared: &PreparedEntry,
        confirmation: Confirmation,
    ) -> Result<usize, EntryError> {
        if prepared.needs_confirmation() {
            if confirmation == Confirmation::Required {
                return Err(EntryError::UnconfirmedIdentities {
                    names: prepared.unknown.clone(),
                });
            }
            warn!(names = ?prepared.unknown, "Accepting identities outside the roster");
            self.literals.extend(prepared.unknown.iter().cloned());
        }

        let events = prepared.events();
        let added = events.len();
        self.events.extend(events);
        Ok(added)
    }

    /// Persistable records for every stored event, in entry order.
    pub fn records(&self) -> Vec<EventRecord> {
        self.events.iter().map(EventRecord::from_event).collect()
    }

    /// Evaluate the stored events for the roster and accepted literals.
    pub fn evaluate(&self, now: NaiveDateTime) -> Evaluation {
        let population = self.population();
        self.engine
            .evaluate_scoped(self.events.iter().cloned(), &population, &population, now)
    }

    /// Evaluate the stored events, tracking only the scope `text` selects.
    ///
    /// Accepted literals may be named in the scope; empty text selects the
    /// whole population.
    ///
    /// # Errors
    ///
    /// As [`LedgerEngine::resolve_scope_accepting`].
    pub fn evaluate_scope(&self, text: &str, now: NaiveDateTime) -> Result<Evaluation, IdentityError> {
        let population = self.population();
        let scope = if text.trim().is_empty() {
            population.clone()
        } else {
            self.engine.resolve_scope_accepting(text, &self.literals)?
        };
        Ok(self
            .engine
            .evaluate_scoped(self.events.iter().cloned(), &population, &scope, now))
    }
}
