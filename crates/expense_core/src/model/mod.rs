//! Expense domain model and calendar helpers.
//!
//! # Responsibility
//! - Define the persisted `Expense` record and its write-side draft.
//! - Define view tabs, range derivation and the synthesized aggregate rows.
//!
//! # Invariants
//! - `Expense::id` is assigned by the store only.
//! - Dates are stored as UTC epoch milliseconds; calendar math is local time.

pub mod bucket;
pub mod expense;
pub mod period;
