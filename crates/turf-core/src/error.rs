//! Error types for the ledger engine.
//!
//! [`EngineError`] wraps every failure mode a caller of `turf-core` can hit,
//! providing a single error type that callers can propagate with `?`.

use turf_types::RecordError;

use crate::config::ConfigError;
use crate::identity::IdentityError;
use crate::ledger::EntryError;

/// Top-level error for the ledger engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A name or scope could not be resolved.
    #[error("identity error: {source}")]
    Identity {
        /// The underlying identity error.
        #[from]
        source: IdentityError,
    },

    /// A persisted record is malformed.
    #[error("record error: {source}")]
    Record {
        /// The underlying record error.
        #[from]
        source: RecordError,
    },

    /// A ledger entry was refused.
    #[error("entry error: {source}")]
    Entry {
        /// The underlying entry error.
        #[from]
        source: EntryError,
    },
}
