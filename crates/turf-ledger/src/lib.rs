//! Event store and balance computation for the turf ledger.
//!
//! Every award and redemption flows through this crate. Nothing here knows
//! about rosters, aliases or the solidarity rule; those live in
//! `turf-core`, which drives these building blocks.
//!
//! # Modules
//!
//! - [`store`] -- The [`EventStore`]: time-sorted, append-only
//!   event collection with range queries.
//! - [`balance`] -- The [`BalanceCalculator`]: left-to-right balance scan
//!   with the floor-at-zero rule.
//! - [`trajectory`] -- [`BalanceTrajectory`]: per-member balance series
//!   with boundary rows.
//! - [`reasons`] -- [`ReasonCounts`]: award tallies per reason with the
//!   "Other" bucket.
//!
//! # Usage
//!
//! ```
//! use chrono::NaiveDate;
//! use turf_ledger::{BalanceCalculator, EventStore};
//! use turf_types::Event;
//!
//! let noon = |day| NaiveDate::from_ymd_opt(2024, 1, day).and_then(|d| d.and_hms_opt(12, 0, 0));
//! let (Some(d1), Some(d2)) = (noon(1), noon(2)) else { return };
//!
//! let store = EventStore::from_unsorted([
//!     Event::redemption("A", d2, "Anytimer"),
//!     Event::award("A", d1, "Beer"),
//! ]);
//! let members = vec!["A".to_owned()];
//! let balances = BalanceCalculator::new(true).balances(store.events(), &members);
//! assert_eq!(balances.get("A"), Some(&0));
//! ```

pub mod balance;
pub mod reasons;
pub mod store;
pub mod trajectory;

// Re-export primary types at crate root.
pub use balance::{BalanceCalculator, BalanceReport, TrajectoryOptions};
pub use reasons::ReasonCounts;
pub use store::EventStore;
pub use trajectory::{BalanceTrajectory, Sample, TimelineEntry, TrajectoryRow};
