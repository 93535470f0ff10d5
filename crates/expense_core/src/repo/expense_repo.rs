//! Expense repository contract and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over the `expenses` table.
//! - Range reads and per-day/per-month grouping on local calendar time.
//! - Atomic replace-all used by spreadsheet restore.
//!
//! # Invariants
//! - Range bounds are inclusive (`BETWEEN`), results ascend by entry date.
//! - `replace_all` leaves the table either untouched or fully replaced.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::bucket::PeriodTotal;
use crate::model::expense::{Expense, ExpenseDraft, ExpenseId, ExpenseValidationError};
use crate::model::period::DateRange;
use chrono::NaiveDate;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Statement, Transaction, TransactionBehavior};
use thiserror::Error;

const EXPENSE_SELECT_SQL: &str = "SELECT
    id,
    title,
    amount,
    category,
    description,
    entryDate
FROM expenses";

const EXPENSE_INSERT_SQL: &str = "INSERT INTO expenses (
    title,
    amount,
    category,
    description,
    entryDate
) VALUES (?1, ?2, ?3, ?4, ?5);";

const REQUIRED_EXPENSE_COLUMNS: [&str; 6] = [
    "id",
    "title",
    "amount",
    "category",
    "description",
    "entryDate",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for expense persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ExpenseValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid persisted expense data: {0}")]
    InvalidData(String),
    #[error("connection schema version {actual_version} does not match expected {expected_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
    #[error("required column `{table}.{column}` is missing")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("inserted expense {0} not found in read-back")]
    MissingAfterInsert(ExpenseId),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Grouping granularity for aggregate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Day,
    Month,
}

impl Grouping {
    fn period_key_sql(self) -> &'static str {
        match self {
            Self::Day => "strftime('%Y-%m-%d', entryDate / 1000.0, 'unixepoch', 'localtime')",
            Self::Month => "strftime('%Y-%m-01', entryDate / 1000.0, 'unixepoch', 'localtime')",
        }
    }
}

/// Repository interface for expense operations.
pub trait ExpenseRepository {
    /// Inserts one row dated `entry_date` and returns the assigned id.
    fn insert_expense(&self, draft: &ExpenseDraft, entry_date: i64) -> RepoResult<ExpenseId>;
    fn get_expense(&self, id: ExpenseId) -> RepoResult<Option<Expense>>;
    /// Rows with `entryDate` inside `range`, ascending by date then id.
    fn list_expenses(&self, range: DateRange) -> RepoResult<Vec<Expense>>;
    /// Sum and count per local day or month inside `range`, ascending.
    fn period_totals(&self, range: DateRange, grouping: Grouping) -> RepoResult<Vec<PeriodTotal>>;
    /// Full-row update; returns affected row count (0 when `id` is unknown).
    fn update_expense(
        &self,
        id: ExpenseId,
        draft: &ExpenseDraft,
        entry_date: i64,
    ) -> RepoResult<usize>;
    /// Physical delete; returns affected row count (0 when `id` is unknown).
    fn delete_expense(&self, id: ExpenseId) -> RepoResult<usize>;
    /// Deletes every row and inserts `drafts` in one transaction.
    ///
    /// Drafts without a date are stored at `default_entry_date`.
    fn replace_all(&self, drafts: &[ExpenseDraft], default_entry_date: i64) -> RepoResult<usize>;
}

/// SQLite-backed expense repository.
pub struct SqliteExpenseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteExpenseRepository<'conn> {
    /// Binds to a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ExpenseRepository for SqliteExpenseRepository<'_> {
    fn insert_expense(&self, draft: &ExpenseDraft, entry_date: i64) -> RepoResult<ExpenseId> {
        draft.validate()?;
        let mut stmt = self.conn.prepare_cached(EXPENSE_INSERT_SQL)?;
        insert_with(&mut stmt, draft, entry_date)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_expense(&self, id: ExpenseId) -> RepoResult<Option<Expense>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{EXPENSE_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt.query_row([id], |row| Ok(parse_expense_row(row))).optional()?;
        row.transpose()
    }

    fn list_expenses(&self, range: DateRange) -> RepoResult<Vec<Expense>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{EXPENSE_SELECT_SQL}
             WHERE entryDate BETWEEN ?1 AND ?2
             ORDER BY entryDate ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![range.start, range.end])?;
        let mut expenses = Vec::new();
        while let Some(row) = rows.next()? {
            expenses.push(parse_expense_row(row)?);
        }
        Ok(expenses)
    }

    fn period_totals(&self, range: DateRange, grouping: Grouping) -> RepoResult<Vec<PeriodTotal>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT
                {} AS period_key,
                COALESCE(SUM(amount), 0) AS total_amount,
                COUNT(*) AS entry_count
             FROM expenses
             WHERE entryDate BETWEEN ?1 AND ?2
             GROUP BY period_key
             ORDER BY period_key ASC;",
            grouping.period_key_sql()
        ))?;
        let mut rows = stmt.query(params![range.start, range.end])?;
        let mut totals = Vec::new();
        while let Some(row) = rows.next()? {
            let key: Option<String> = row.get("period_key")?;
            let key = key.ok_or_else(|| {
                RepoError::InvalidData("entryDate outside calendar range".to_string())
            })?;
            let period_start = NaiveDate::parse_from_str(&key, "%Y-%m-%d").map_err(|_| {
                RepoError::InvalidData(format!("invalid period key `{key}` from entryDate"))
            })?;
            totals.push(PeriodTotal {
                period_start,
                total_amount: row.get("total_amount")?,
                count: row.get("entry_count")?,
            });
        }
        Ok(totals)
    }

    fn update_expense(
        &self,
        id: ExpenseId,
        draft: &ExpenseDraft,
        entry_date: i64,
    ) -> RepoResult<usize> {
        draft.validate()?;
        let changed = self.conn.execute(
            "UPDATE expenses
             SET
                title = ?1,
                amount = ?2,
                category = ?3,
                description = ?4,
                entryDate = ?5
             WHERE id = ?6;",
            params![
                draft.title.as_str(),
                draft.amount,
                draft.category.as_str(),
                draft.description.as_deref(),
                entry_date,
                id,
            ],
        )?;
        Ok(changed)
    }

    fn delete_expense(&self, id: ExpenseId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM expenses WHERE id = ?1;", [id])?;
        Ok(changed)
    }

    fn replace_all(&self, drafts: &[ExpenseDraft], default_entry_date: i64) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        match replace_all_in_tx(&tx, drafts, default_entry_date) {
            Ok(inserted) => {
                tx.commit()?;
                Ok(inserted)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=expense_restore module=repo status=error error_code=rollback_failed error={rollback_err}"
                    );
                }
                Err(err)
            }
        }
    }
}

fn replace_all_in_tx(
    tx: &Transaction<'_>,
    drafts: &[ExpenseDraft],
    default_entry_date: i64,
) -> RepoResult<usize> {
    let removed = tx.execute("DELETE FROM expenses;", [])?;
    debug!("event=expense_restore module=repo status=cleared removed={removed}");

    let mut stmt = tx.prepare(EXPENSE_INSERT_SQL)?;
    for (index, draft) in drafts.iter().enumerate() {
        draft.validate().map_err(|err| {
            debug!("event=expense_restore module=repo status=invalid record_index={index}");
            err
        })?;
        insert_with(&mut stmt, draft, draft.entry_date_or(default_entry_date))?;
    }
    Ok(drafts.len())
}

fn insert_with(stmt: &mut Statement<'_>, draft: &ExpenseDraft, entry_date: i64) -> RepoResult<()> {
    stmt.execute(params![
        draft.title.as_str(),
        draft.amount,
        draft.category.as_str(),
        draft.description.as_deref(),
        entry_date,
    ])?;
    Ok(())
}

fn parse_expense_row(row: &Row<'_>) -> RepoResult<Expense> {
    Ok(Expense {
        id: row.get("id")?,
        title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
        amount: row.get::<_, Option<f64>>("amount")?.unwrap_or(0.0),
        category: row.get::<_, Option<String>>("category")?.unwrap_or_default(),
        description: row.get("description")?,
        entry_date: row.get("entryDate")?,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "expenses")? {
        return Err(RepoError::MissingRequiredTable("expenses"));
    }

    for column in REQUIRED_EXPENSE_COLUMNS {
        if !table_has_column(conn, "expenses", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "expenses",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
