//! Enumeration types for the turf ledger.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::record::RecordError;

/// The two kinds of ledger event.
///
/// The persisted form uses the historical column values: `"turf"` for an
/// award and `"minus"` for a redemption (an "inning").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// A point credited to a member.
    #[serde(rename = "turf")]
    Award,
    /// A point debited from a member.
    #[serde(rename = "minus")]
    Redemption,
}

impl Category {
    /// The persisted column value for this category.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Award => "turf",
            Self::Redemption => "minus",
        }
    }

    /// Returns `true` for [`Category::Award`].
    pub const fn is_award(self) -> bool {
        matches!(self, Self::Award)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RecordError;

    /// Parse a persisted category column. Matching is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("turf") {
            Ok(Self::Award)
        } else if trimmed.eq_ignore_ascii_case("minus") {
            Ok(Self::Redemption)
        } else {
            Err(RecordError::UnknownCategory {
                value: trimmed.to_owned(),
            })
        }
    }
}
