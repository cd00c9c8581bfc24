//! In-memory, chronologically ordered collection of ledger events.
//!
//! The [`EventStore`] keeps events sorted by timestamp at all times.
//! There is no deletion: corrections are recorded as counter-events.
//!
//! # Ordering
//!
//! - [`EventStore::from_unsorted`] performs a stable sort, so events
//!   sharing a timestamp keep the order they were supplied in.
//! - [`EventStore::insert`] places a new event at the first position whose
//!   timestamp is greater than or equal to its own, i.e. *before* any
//!   existing events with the same timestamp.

use chrono::NaiveDateTime;

use turf_types::Event;

/// Time-sorted, append-only event collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Build a store from events in arbitrary order.
    pub fn from_unsorted(events: impl IntoIterator<Item = Event>) -> Self {
        let mut events: Vec<Event> = events.into_iter().collect();
        // `sort_by_key` is stable.
        events.sort_by_key(|e| e.timestamp);
        Self { events }
    }

    /// Number of stored events.
    pub const fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the store holds no events.
    pub const fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index of the first event whose timestamp is `>= timestamp`, or the
    /// store length if there is none.
    pub fn position_for(&self, timestamp: NaiveDateTime) -> usize {
        self.events.partition_point(|e| e.timestamp < timestamp)
    }

    /// Insert an event in timestamp order. Returns the index it landed at.
    pub fn insert(&mut self, event: Event) -> usize {
        let index = self.position_for(event.timestamp);
        self.events.insert(index, event);
        index
    }

    /// All events strictly before `timestamp`, in order.
    pub fn range_before(&self, timestamp: NaiveDateTime) -> &[Event] {
        let end = self.position_for(timestamp);
        self.events.get(..end).unwrap_or_default()
    }

    /// Events with `after < timestamp <= until`, in order.
    ///
    /// A `None` lower bound means "from the beginning".
    pub fn window(&self, after: Option<NaiveDateTime>, until: NaiveDateTime) -> &[Event] {
        let start = after.map_or(0, |after| self.events.partition_point(|e| e.timestamp <= after));
        let end = self.events.partition_point(|e| e.timestamp <= until);
        if start >= end {
            return &[];
        }
        self.events.get(start..end).unwrap_or_default()
    }

    /// Timestamp of the earliest event.
    pub fn earliest_timestamp(&self) -> Option<NaiveDateTime> {
        self.events.first().map(|e| e.timestamp)
    }

    /// Timestamp of the latest event.
    pub fn latest_timestamp(&self) -> Option<NaiveDateTime> {
        self.events.last().map(|e| e.timestamp)
    }

    /// All events, in order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Iterate over the events in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Consume the store, returning the ordered events.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl<'a> IntoIterator for &'a EventStore {
    type Item = &'a Event;
    type IntoIter = core::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl FromIterator<Event> for EventStore {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self::from_unsorted(iter)
    }
}
