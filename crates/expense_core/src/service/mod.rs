//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the app-facing expense use-cases.
//! - Keep callers decoupled from SQL and row decoding.

pub mod expense_service;
