//! Award counts per reason, with the "Other" bucket and a display cap.
//!
//! Reasons that are not configured canonical keys are counted under
//! [`OTHER_REASON`]. When more distinct reasons exist than the display cap
//! allows, the least frequent ones are folded into [`OTHER_REASON`] too.

use serde::{Deserialize, Serialize};

use turf_types::OTHER_REASON;

/// Ordered reason tally.
///
/// Entries keep the order in which each reason was first counted, which
/// makes the cap deterministic when two reasons have equal counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCounts {
    entries: Vec<(String, u64)>,
}

impl ReasonCounts {
    /// Create an empty tally.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add one to the count for `reason`.
    pub fn increment(&mut self, reason: &str) {
        self.add(reason, 1);
    }

    /// Add `amount` to the count for `reason`.
    pub fn add(&mut self, reason: &str, amount: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|(r, _)| r == reason) {
            entry.1 = entry.1.saturating_add(amount);
        } else {
            self.entries.push((reason.to_owned(), amount));
        }
    }

    /// Count for `reason`, zero if absent.
    pub fn get(&self, reason: &str) -> u64 {
        self.entries
            .iter()
            .find(|(r, _)| r == reason)
            .map_or(0, |(_, count)| *count)
    }

    /// Number of distinct reasons.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been counted.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries
            .iter()
            .fold(0_u64, |acc, (_, count)| acc.saturating_add(*count))
    }

    /// Iterate over `(reason, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(r, c)| (r.as_str(), *c))
    }

    /// Collapse the tally to at most `max_reasons` entries.
    ///
    /// The result starts with [`OTHER_REASON`] and is followed by the most
    /// frequent named reasons until `max_reasons` entries exist; every other
    /// count is added to [`OTHER_REASON`]. A tally already within the cap is
    /// returned unchanged.
    #[must_use]
    pub fn capped(&self, max_reasons: usize) -> Self {
        if self.entries.len() <= max_reasons {
            return self.clone();
        }

        let mut sorted: Vec<&(String, u64)> = self.entries.iter().collect();
        // Stable: equal counts keep first-counted order.
        sorted.sort_by(|a, b| b.1.cmp(&a.1));

        let mut other = 0_u64;
        let mut named: Vec<(String, u64)> = Vec::new();
        for (reason, count) in sorted {
            if reason == OTHER_REASON {
                other = other.saturating_add(*count);
            } else if named.len().saturating_add(1) < max_reasons {
                named.push((reason.clone(), *count));
            } else {
                other = other.saturating_add(*count);
            }
        }

        let mut entries = Vec::with_capacity(named.len().saturating_add(1));
        entries.push((OTHER_REASON.to_owned(), other));
        entries.extend(named);
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(pairs: &[(&str, u64)]) -> ReasonCounts {
        let mut counts = ReasonCounts::new();
        for (reason, amount) in pairs {
            counts.add(reason, *amount);
        }
        counts
    }

    #[test]
    fn increment_accumulates_per_reason() {
        let mut counts = ReasonCounts::new();
        counts.increment("Beer");
        counts.increment("Late");
        counts.increment("Beer");
        assert_eq!(counts.get("Beer"), 2);
        assert_eq!(counts.get("Late"), 1);
        assert_eq!(counts.get("Missing"), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn within_cap_is_unchanged() {
        let counts = tally(&[("Beer", 3), ("Late", 1)]);
        assert_eq!(counts.capped(2), counts);
    }

    #[test]
    fn cap_keeps_most_frequent_and_folds_rest_into_other() {
        let counts = tally(&[("Late", 1), ("Beer", 5), ("Other", 2), ("Noise", 3), ("Rain", 1)]);
        let capped = counts.capped(3);

        let pairs: Vec<(&str, u64)> = capped.iter().collect();
        // Other: its own 2 plus Late(1) and Rain(1).
        assert_eq!(pairs, [("Other", 4), ("Beer", 5), ("Noise", 3)]);
        assert_eq!(capped.total(), counts.total());
    }

    #[test]
    fn cap_of_one_folds_everything() {
        let counts = tally(&[("Beer", 5), ("Late", 1)]);
        let capped = counts.capped(1);
        let pairs: Vec<(&str, u64)> = capped.iter().collect();
        assert_eq!(pairs, [("Other", 6)]);
    }

    #[test]
    fn equal_counts_keep_first_counted_order() {
        let counts = tally(&[("A", 2), ("B", 2), ("C", 2)]);
        let capped = counts.capped(2);
        let pairs: Vec<(&str, u64)> = capped.iter().collect();
        assert_eq!(pairs, [("Other", 4), ("A", 2)]);
    }
}
