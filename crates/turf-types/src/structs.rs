//! Core entity structs: ledger events and roster members.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::enums::Category;

/// Reason attached to events injected by the solidarity rule.
pub const SOLIDARITY_REASON: &str = "Solidarity";

/// Bucket used for reasons that are not configured or fall beyond the
/// display cap.
pub const OTHER_REASON: &str = "Other";

/// A single ledger event.
///
/// Events are immutable once ingested. The engine reorders them and may
/// layer synthetic events around them, but never rewrites a real event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// Award or redemption.
    pub category: Category,
    /// Canonical member identity the event is attributed to.
    pub subject: String,
    /// Moment the event happened, minute precision.
    pub timestamp: NaiveDateTime,
    /// Free text or canonical reason key.
    pub reason: String,
    /// `true` only for events injected by the solidarity rule.
    #[serde(default)]
    pub synthetic: bool,
}

impl Event {
    /// Create a real award event.
    pub fn award(subject: impl Into<String>, timestamp: NaiveDateTime, reason: impl Into<String>) -> Self {
        Self {
            category: Category::Award,
            subject: subject.into(),
            timestamp,
            reason: reason.into(),
            synthetic: false,
        }
    }

    /// Create a real redemption event.
    pub fn redemption(
        subject: impl Into<String>,
        timestamp: NaiveDateTime,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            category: Category::Redemption,
            subject: subject.into(),
            timestamp,
            reason: reason.into(),
            synthetic: false,
        }
    }

    /// Create a synthetic solidarity award.
    pub fn solidarity(subject: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            category: Category::Award,
            subject: subject.into(),
            timestamp,
            reason: SOLIDARITY_REASON.to_owned(),
            synthetic: true,
        }
    }
}

/// A roster member: a canonical name plus the aliases that resolve to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Canonical display name, the identity stored on events.
    pub name: String,
    /// Alternative spellings, matched case-insensitively.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Member {
    /// Create a member without aliases.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    /// Attach aliases to this member.
    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }
}
