//! Day-log domain model.
//!
//! # Responsibility
//! - Define the records shared by materialization, editing, ordering and sweep.
//! - Keep pure lifecycle, scoring, ordering and summary rules free of storage.
//!
//! # Invariants
//! - Lifecycle and sweep logic consume `DateKey` values, never raw instants.
//! - Everything in this module is deterministic for fixed inputs.

pub mod date_key;
pub mod day;
pub mod lifecycle;
pub mod ordering;
pub mod policy;
pub mod score;
pub mod summary;
pub mod todo;
