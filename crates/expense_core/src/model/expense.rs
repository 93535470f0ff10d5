//! Expense domain model.
//!
//! # Invariants
//! - `id` is unique, store-assigned and immutable.
//! - `entry_date` is epoch milliseconds and is the key for every range query.
//! - `amount` is always a finite number.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Store-assigned row identifier (SQLite `AUTOINCREMENT`).
pub type ExpenseId = i64;

/// Persisted expense row.
///
/// Serialized field names follow the app wire shape (`entryDate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    /// User label; may be empty.
    pub title: String,
    pub amount: f64,
    /// Free text; usually one of [`Category`] but never validated.
    pub category: String,
    pub description: Option<String>,
    /// Epoch milliseconds (UTC instant).
    pub entry_date: i64,
}

impl Expense {
    /// Returns the write-side shape of this row, keeping its own date.
    pub fn to_draft(&self) -> ExpenseDraft {
        ExpenseDraft {
            title: self.title.clone(),
            amount: self.amount,
            category: self.category.clone(),
            description: self.description.clone(),
            entry_date: Some(self.entry_date),
        }
    }
}

/// Caller-supplied expense content for create, update and restore.
///
/// Carries no id: the store assigns ids on insert and update addresses a row
/// by an explicit id argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Epoch milliseconds. `None` means "now" on update and restore.
    #[serde(default)]
    pub entry_date: Option<i64>,
}

impl ExpenseDraft {
    pub fn new(title: impl Into<String>, amount: f64, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            amount,
            category: category.into(),
            description: None,
            entry_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_entry_date(mut self, entry_date: i64) -> Self {
        self.entry_date = Some(entry_date);
        self
    }

    /// Validates invariants that SQLite itself would not reject.
    ///
    /// Non-finite amounts would be stored as `NULL` (NaN) or poison every
    /// aggregate (infinity), so they are refused before any SQL runs.
    pub fn validate(&self) -> Result<(), ExpenseValidationError> {
        if !self.amount.is_finite() {
            return Err(ExpenseValidationError::NonFiniteAmount(self.amount));
        }
        Ok(())
    }

    /// Resolves the stored date: own date when set, otherwise `fallback`.
    pub fn entry_date_or(&self, fallback: i64) -> i64 {
        self.entry_date.unwrap_or(fallback)
    }
}

/// Validation failure for expense write payloads.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpenseValidationError {
    #[error("amount must be a finite number, got {0}")]
    NonFiniteAmount(f64),
}

/// Categories offered by the entry form.
///
/// The store persists category as plain text, so values outside this set
/// remain valid rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Food,
        Category::Transport,
        Category::Shopping,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Shopping => "Shopping",
            Self::Other => "Other",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownCategory(value.to_string()))
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);
