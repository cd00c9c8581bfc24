//! Configuration, identity resolution, the solidarity rule and the ledger
//! engine for the turf ledger.
//!
//! This crate turns a validated configuration and a batch of raw events
//! into standings. Each evaluation is a pure, synchronous batch pass over a
//! fresh event store.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration loading into strongly-typed structs,
//!   validated eagerly.
//! - [`identity`] -- [`AliasTable`] and free-text [`Resolution`].
//! - [`roster`] -- The member [`Roster`], reporting [`GroupTable`] and
//!   [`ReasonTable`].
//! - [`solidarity`] -- The weekly [`SolidarityEngine`].
//! - [`engine`] -- The [`LedgerEngine`] facade and its [`Evaluation`].
//! - [`ledger`] -- The append-only [`Ledger`] with two-phase entry.
//! - [`error`] -- [`EngineError`], wrapping every failure above.
//!
//! [`AliasTable`]: identity::AliasTable
//! [`Resolution`]: identity::Resolution
//! [`Roster`]: roster::Roster
//! [`GroupTable`]: roster::GroupTable
//! [`ReasonTable`]: roster::ReasonTable
//! [`SolidarityEngine`]: solidarity::SolidarityEngine
//! [`LedgerEngine`]: engine::LedgerEngine
//! [`Evaluation`]: engine::Evaluation
//! [`Ledger`]: ledger::Ledger
//! [`EngineError`]: error::EngineError

pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod roster;
pub mod solidarity;

pub use config::{ConfigError, TurfConfig};
pub use engine::{Evaluation, LedgerEngine};
pub use error::EngineError;
pub use identity::{AliasTable, IdentityError, Resolution};
pub use ledger::{Confirmation, EntryError, EntryRequest, Ledger, PreparedEntry};
pub use roster::{GroupTable, ReasonTable, Roster};
pub use solidarity::{Injection, SolidarityEngine, SolidarityOutcome, SolidaritySchedule};
