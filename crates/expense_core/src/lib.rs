//! Local persistence and aggregation core for the expense tracker.
//!
//! Owns the embedded SQLite store, CRUD over expense rows, day/month/year
//! range reads and the transactional spreadsheet restore.

pub mod db;
pub mod events;
pub mod interchange;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use events::{ExpenseEvent, ExpenseListener};
pub use interchange::{
    export_to_csv, read_sheet_csv, restore_from_csv, rows_to_drafts, write_sheet_csv,
    InterchangeError, SheetRow, SheetValue,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::bucket::{AggregateBucket, PeriodTotal, RangeView};
pub use model::expense::{Category, Expense, ExpenseDraft, ExpenseId, ExpenseValidationError};
pub use model::period::{
    date_range, date_range_for_tab, format_display_date, local_date, local_epoch_ms,
    local_midnight_ms, now_epoch_ms, parse_display_date, period_title, DateRange,
    UnsupportedTabError, ViewTab,
};
pub use repo::expense_repo::{
    ExpenseRepository, Grouping, RepoError, RepoResult, SqliteExpenseRepository,
};
pub use service::expense_service::ExpenseService;
pub use store::{DbLocation, ExpenseStore, ExpenseStoreBuilder, StoreError, StoreResult};
