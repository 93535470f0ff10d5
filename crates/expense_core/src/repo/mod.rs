//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define expense data-access contracts.
//! - Keep SQL and row decoding out of the service and store layers.
//!
//! # Invariants
//! - Write paths call `ExpenseDraft::validate()` before SQL mutations.
//! - Repositories only bind to connections whose schema is current.

pub mod expense_repo;
