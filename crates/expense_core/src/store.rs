//! Process-level expense store.
//!
//! # Responsibility
//! - Own the single SQLite connection for the app's lifetime.
//! - Open it lazily on first use; concurrent first calls open it once.
//! - Serialize every statement through one mutex, so a restore transaction
//!   never interleaves with another write.
//! - Fan out committed changes to injected listeners.
//!
//! # Invariants
//! - The connection is never closed or replaced once opened.
//! - Unknown tab names fail before the connection is touched.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult, DB_FILE_NAME};
use crate::events::{ExpenseEvent, ExpenseListener};
use crate::model::bucket::RangeView;
use crate::model::expense::{Expense, ExpenseDraft, ExpenseId};
use crate::model::period::{now_epoch_ms, UnsupportedTabError, ViewTab};
use crate::repo::expense_repo::{RepoError, RepoResult, SqliteExpenseRepository};
use crate::service::expense_service::ExpenseService;
use chrono::NaiveDate;
use log::{error, info};
use once_cell::sync::OnceCell;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Open(#[from] DbError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    UnsupportedTab(#[from] UnsupportedTabError),
    #[error("expense database connection lock is poisoned")]
    ConnectionPoisoned,
}

/// Where the store keeps its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    Memory,
}

/// Builder for [`ExpenseStore`]; nothing is opened until first use.
pub struct ExpenseStoreBuilder {
    location: DbLocation,
    listeners: Vec<Box<dyn ExpenseListener>>,
    clock: fn() -> i64,
}

impl ExpenseStoreBuilder {
    /// Registers a listener for committed changes.
    pub fn listener(mut self, listener: impl ExpenseListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Overrides the "now" source used for undated update/restore drafts.
    pub fn clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> ExpenseStore {
        ExpenseStore {
            location: self.location,
            conn: OnceCell::new(),
            listeners: self.listeners,
            clock: self.clock,
        }
    }
}

/// Explicitly owned handle to the expense database.
pub struct ExpenseStore {
    location: DbLocation,
    conn: OnceCell<Mutex<Connection>>,
    listeners: Vec<Box<dyn ExpenseListener>>,
    clock: fn() -> i64,
}

impl ExpenseStore {
    pub fn builder(location: DbLocation) -> ExpenseStoreBuilder {
        ExpenseStoreBuilder {
            location,
            listeners: Vec::new(),
            clock: now_epoch_ms,
        }
    }

    /// Store backed by `<data_dir>/expenses.db`.
    pub fn open_in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::builder(DbLocation::File(data_dir.as_ref().join(DB_FILE_NAME))).build()
    }

    pub fn in_memory() -> Self {
        Self::builder(DbLocation::Memory).build()
    }

    pub fn location(&self) -> &DbLocation {
        &self.location
    }

    /// Whether the connection has been opened yet.
    pub fn is_connected(&self) -> bool {
        self.conn.get().is_some()
    }

    /// Returns the shared connection, opening and migrating it on first call.
    ///
    /// The guard holds the store-wide statement lock until dropped.
    pub fn acquire_connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        let conn = self
            .conn
            .get_or_try_init(|| self.open_connection().map(Mutex::new))?;
        conn.lock().map_err(|_| {
            error!("event=db_acquire module=store status=error error_code=lock_poisoned");
            StoreError::ConnectionPoisoned
        })
    }

    pub fn create_expense(&self, draft: &ExpenseDraft, target_date: i64) -> StoreResult<Expense> {
        let created = self.with_service(|service| service.create_expense(draft, target_date))?;
        self.emit(&ExpenseEvent::Created {
            expense: created.clone(),
        });
        Ok(created)
    }

    pub fn get_expense(&self, id: ExpenseId) -> StoreResult<Option<Expense>> {
        self.with_service(|service| service.get_expense(id))
    }

    pub fn read_range(&self, anchor: NaiveDate, tab: ViewTab) -> StoreResult<RangeView> {
        self.with_service(|service| service.read_range(anchor, tab))
    }

    /// Range read keyed by tab name (`Daily|Monthly|Yearly`).
    ///
    /// Any other name fails with `UnsupportedTab` and runs no query.
    pub fn read_range_by_name(&self, anchor: NaiveDate, tab: &str) -> StoreResult<RangeView> {
        let tab: ViewTab = tab.parse()?;
        self.read_range(anchor, tab)
    }

    pub fn list_all_expenses(&self) -> StoreResult<Vec<Expense>> {
        self.with_service(|service| service.list_all_expenses())
    }

    /// Full-row update; listeners hear about it only when a row changed.
    pub fn update_expense(&self, id: ExpenseId, draft: &ExpenseDraft) -> StoreResult<usize> {
        let changed = self.with_service(|service| service.update_expense(id, draft))?;
        if changed > 0 {
            self.emit(&ExpenseEvent::Updated { id });
        }
        Ok(changed)
    }

    pub fn delete_expense(&self, id: ExpenseId) -> StoreResult<usize> {
        let changed = self.with_service(|service| service.delete_expense(id))?;
        if changed > 0 {
            self.emit(&ExpenseEvent::Deleted { id });
        }
        Ok(changed)
    }

    /// Atomically replaces every expense with `drafts`.
    pub fn restore_expenses(&self, drafts: &[ExpenseDraft]) -> StoreResult<usize> {
        let count = self.with_service(|service| service.restore_expenses(drafts))?;
        self.emit(&ExpenseEvent::Restored { count });
        Ok(count)
    }

    /// Best-effort create: failures are logged and reported as `None`.
    pub fn create_expense_or_log(&self, draft: &ExpenseDraft, target_date: i64) -> Option<Expense> {
        self.create_expense(draft, target_date).ok()
    }

    /// Best-effort update: failures are logged and reported as `None`.
    pub fn update_expense_or_log(&self, id: ExpenseId, draft: &ExpenseDraft) -> Option<usize> {
        self.update_expense(id, draft).ok()
    }

    /// Best-effort delete: failures are logged and reported as `None`.
    pub fn delete_expense_or_log(&self, id: ExpenseId) -> Option<usize> {
        self.delete_expense(id).ok()
    }

    fn with_service<T>(
        &self,
        op: impl FnOnce(&ExpenseService<SqliteExpenseRepository<'_>>) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let conn = self.acquire_connection()?;
        let repo = SqliteExpenseRepository::try_new(&conn)?;
        let service = ExpenseService::with_clock(repo, self.clock);
        Ok(op(&service)?)
    }

    fn open_connection(&self) -> DbResult<Connection> {
        info!("event=db_acquire module=store status=start");
        match &self.location {
            DbLocation::File(path) => open_db(path),
            DbLocation::Memory => open_db_in_memory(),
        }
    }

    fn emit(&self, event: &ExpenseEvent) {
        for listener in &self.listeners {
            listener.on_expense_event(event);
        }
    }
}
