//! Expense use-case service.
//!
//! # Responsibility
//! - Provide create/read/update/delete/restore entry points over a repository.
//! - Turn grouped totals into labelled aggregate buckets per view tab.
//! - Log every failed write at the service boundary before returning it.
//!
//! # Invariants
//! - Create dates the row with the caller's target date, ignoring the draft's
//!   own `entry_date`.
//! - Update and restore use the draft's own `entry_date`, falling back to the
//!   service clock ("now") when absent.
//! - Service layer remains storage-agnostic.

use crate::model::bucket::{day_buckets, month_buckets, AggregateBucket, RangeView};
use crate::model::expense::{Expense, ExpenseDraft, ExpenseId};
use crate::model::period::{date_range, now_epoch_ms, DateRange, ViewTab};
use crate::repo::expense_repo::{ExpenseRepository, Grouping, RepoError, RepoResult};
use chrono::NaiveDate;
use log::{error, info};

/// Use-case service wrapper for expense operations.
pub struct ExpenseService<R: ExpenseRepository> {
    repo: R,
    clock: fn() -> i64,
}

impl<R: ExpenseRepository> ExpenseService<R> {
    /// Creates a service using the provided repository and the system clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, now_epoch_ms)
    }

    /// Creates a service whose "now" comes from `clock` (epoch milliseconds).
    pub fn with_clock(repo: R, clock: fn() -> i64) -> Self {
        Self { repo, clock }
    }

    /// Inserts one expense dated `target_date` and returns the stored row.
    ///
    /// # Contract
    /// - `target_date` wins over `draft.entry_date`.
    /// - The returned row is read back by its new id.
    pub fn create_expense(&self, draft: &ExpenseDraft, target_date: i64) -> RepoResult<Expense> {
        let created = self.repo.insert_expense(draft, target_date).and_then(|id| {
            self.repo
                .get_expense(id)?
                .ok_or(RepoError::MissingAfterInsert(id))
        });
        log_write("expense_create", created, |expense| expense.id)
    }

    /// Point lookup by id.
    pub fn get_expense(&self, id: ExpenseId) -> RepoResult<Option<Expense>> {
        self.repo.get_expense(id)
    }

    /// Individual rows of the local day containing `anchor`.
    pub fn expenses_for_day(&self, anchor: NaiveDate) -> RepoResult<Vec<Expense>> {
        self.repo.list_expenses(date_range(anchor, ViewTab::Daily))
    }

    /// One bucket per day with entries in the month containing `anchor`.
    pub fn month_buckets(&self, anchor: NaiveDate) -> RepoResult<Vec<AggregateBucket>> {
        let totals = self
            .repo
            .period_totals(date_range(anchor, ViewTab::Monthly), Grouping::Day)?;
        Ok(day_buckets(totals))
    }

    /// One bucket per month with entries in the year containing `anchor`.
    pub fn year_buckets(&self, anchor: NaiveDate) -> RepoResult<Vec<AggregateBucket>> {
        let totals = self
            .repo
            .period_totals(date_range(anchor, ViewTab::Yearly), Grouping::Month)?;
        Ok(month_buckets(totals))
    }

    /// Dispatches a range read by tab; an empty period yields an empty view.
    pub fn read_range(&self, anchor: NaiveDate, tab: ViewTab) -> RepoResult<RangeView> {
        match tab {
            ViewTab::Daily => self.expenses_for_day(anchor).map(RangeView::Entries),
            ViewTab::Monthly => self.month_buckets(anchor).map(RangeView::Buckets),
            ViewTab::Yearly => self.year_buckets(anchor).map(RangeView::Buckets),
        }
    }

    /// Every stored row, ascending by entry date (export source).
    pub fn list_all_expenses(&self) -> RepoResult<Vec<Expense>> {
        self.repo.list_expenses(DateRange::UNBOUNDED)
    }

    /// Replaces every column of row `id` with `draft`.
    ///
    /// Returns the affected row count; `0` means no row had that id.
    pub fn update_expense(&self, id: ExpenseId, draft: &ExpenseDraft) -> RepoResult<usize> {
        let entry_date = draft.entry_date_or((self.clock)());
        let changed = self.repo.update_expense(id, draft, entry_date);
        log_write("expense_update", changed, |_| id)
    }

    /// Deletes row `id`; unknown ids affect zero rows and are not an error.
    pub fn delete_expense(&self, id: ExpenseId) -> RepoResult<usize> {
        let changed = self.repo.delete_expense(id);
        log_write("expense_delete", changed, |_| id)
    }

    /// Atomically replaces all stored expenses with `drafts`.
    ///
    /// On failure the table keeps its previous contents and the original
    /// error is returned.
    pub fn restore_expenses(&self, drafts: &[ExpenseDraft]) -> RepoResult<usize> {
        info!(
            "event=expense_restore module=service status=start records={}",
            drafts.len()
        );
        let restored = self.repo.replace_all(drafts, (self.clock)());
        match &restored {
            Ok(count) => info!("event=expense_restore module=service status=ok records={count}"),
            Err(err) => error!(
                "event=expense_restore module=service status=error error_code=rolled_back error={err}"
            ),
        }
        restored
    }
}

fn log_write<T>(
    event: &str,
    result: RepoResult<T>,
    expense_id: impl FnOnce(&T) -> ExpenseId,
) -> RepoResult<T> {
    match &result {
        Ok(value) => info!(
            "event={event} module=service status=ok expense_id={}",
            expense_id(value)
        ),
        Err(err) => error!("event={event} module=service status=error error={err}"),
    }
    result
}
