//! Typed change notifications for expense writes.
//!
//! Screens that need to refresh after another screen writes subscribe here
//! when the store is built, instead of sharing mutable callback slots.

use crate::model::expense::{Expense, ExpenseId};
use serde::{Deserialize, Serialize};

/// One committed change to the `expenses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpenseEvent {
    Created { expense: Expense },
    Updated { id: ExpenseId },
    Deleted { id: ExpenseId },
    /// The whole table was replaced by `count` rows.
    Restored { count: usize },
}

/// Receiver of committed expense changes.
///
/// Called after the connection lock is released, so listeners may read
/// from the store again.
pub trait ExpenseListener: Send + Sync {
    fn on_expense_event(&self, event: &ExpenseEvent);
}

impl<F> ExpenseListener for F
where
    F: Fn(&ExpenseEvent) + Send + Sync,
{
    fn on_expense_event(&self, event: &ExpenseEvent) {
        self(event)
    }
}
