//! The persisted event row and its conversion to and from [`Event`].
//!
//! One record per event, seven columns in fixed order:
//!
//! | Column | Example | Notes |
//! |--------|---------|-------|
//! | `Category` | `turf` | `turf` or `minus` |
//! | `Name` | `Wouter` | canonical member name |
//! | `Time` | `20:15` | `HH:MM` |
//! | `Day` | `3` | no leading zero |
//! | `Month` | `Sep` | three-letter abbreviation |
//! | `Year` | `2023` | four digits |
//! | `Reason` | `Beer` | free text or canonical reason key |
//!
//! Reading and writing the rows is left to the persistence layer; this
//! module only rebuilds a sortable timestamp from the split date fields.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::enums::Category;
use crate::structs::Event;

/// Header row naming the seven persisted columns.
pub const RECORD_HEADER: [&str; 7] = ["Category", "Name", "Time", "Day", "Month", "Year", "Reason"];

/// Format used to rebuild a timestamp from the joined date fields.
const TIMESTAMP_FORMAT: &str = "%H:%M %d %b %Y";

/// Errors raised while turning a persisted row into an [`Event`].
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The category column is neither `turf` nor `minus`.
    #[error("unknown event category {value:?}, expected \"turf\" or \"minus\"")]
    UnknownCategory {
        /// The offending column value.
        value: String,
    },

    /// The time and date columns do not form a valid timestamp.
    #[error("unparseable timestamp \"{time} {day} {month} {year}\": {source}")]
    InvalidTimestamp {
        /// The `Time` column.
        time: String,
        /// The `Day` column.
        day: String,
        /// The `Month` column.
        month: String,
        /// The `Year` column.
        year: String,
        /// The underlying chrono parse error.
        source: chrono::ParseError,
    },
}

/// A persisted event row, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// `turf` or `minus`.
    #[serde(rename = "Category")]
    pub category: String,
    /// Canonical member name.
    #[serde(rename = "Name")]
    pub subject: String,
    /// `HH:MM`.
    #[serde(rename = "Time")]
    pub time: String,
    /// Day of month without leading zero.
    #[serde(rename = "Day")]
    pub day: String,
    /// Three-letter month abbreviation.
    #[serde(rename = "Month")]
    pub month: String,
    /// Four-digit year.
    #[serde(rename = "Year")]
    pub year: String,
    /// Free text or canonical reason key.
    #[serde(rename = "Reason")]
    pub reason: String,
}

impl EventRecord {
    /// Rebuild the timestamp from the time and date columns.
    pub fn timestamp(&self) -> Result<NaiveDateTime, RecordError> {
        let joined = format!(
            "{} {} {} {}",
            self.time.trim(),
            self.day.trim(),
            self.month.trim(),
            self.year.trim()
        );
        NaiveDateTime::parse_from_str(&joined, TIMESTAMP_FORMAT).map_err(|source| {
            RecordError::InvalidTimestamp {
                time: self.time.clone(),
                day: self.day.clone(),
                month: self.month.clone(),
                year: self.year.clone(),
                source,
            }
        })
    }

    /// Convert this row into a real (non-synthetic) [`Event`].
    pub fn to_event(&self) -> Result<Event, RecordError> {
        let category = self.category.parse::<Category>()?;
        let timestamp = self.timestamp()?;
        Ok(Event {
            category,
            subject: self.subject.clone(),
            timestamp,
            reason: self.reason.clone(),
            synthetic: false,
        })
    }

    /// Build the persisted row for an event.
    pub fn from_event(event: &Event) -> Self {
        Self {
            category: event.category.as_str().to_owned(),
            subject: event.subject.clone(),
            time: event.timestamp.format("%H:%M").to_string(),
            day: event.timestamp.format("%-d").to_string(),
            month: event.timestamp.format("%b").to_string(),
            year: event.timestamp.format("%Y").to_string(),
            reason: event.reason.clone(),
        }
    }

    /// The row as an ordered list of column values.
    pub fn fields(&self) -> [&str; 7] {
        [
            self.category.as_str(),
            self.subject.as_str(),
            self.time.as_str(),
            self.day.as_str(),
            self.month.as_str(),
            self.year.as_str(),
            self.reason.as_str(),
        ]
    }
}
