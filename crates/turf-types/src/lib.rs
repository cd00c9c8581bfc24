//! Shared type definitions for the turf ledger.
//!
//! This crate is the single source of truth for the data that flows between
//! the ledger, the engine and the reporting layer.
//!
//! # Modules
//!
//! - [`enums`] -- The event [`Category`] (award or redemption)
//! - [`structs`] -- [`Event`] and [`Member`]
//! - [`record`] -- The persisted seven-column [`EventRecord`] row

pub mod enums;
pub mod record;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::Category;
pub use record::{EventRecord, RECORD_HEADER, RecordError};
pub use structs::{Event, Member, OTHER_REASON, SOLIDARITY_REASON};
