//! Spreadsheet row interchange for backup and restore.
//!
//! # Responsibility
//! - Map sheet rows (`Title, Amount, Category, Description, Entry Time`) to
//!   restore drafts and stored expenses back to sheet rows.
//! - Read and write those rows as CSV, the plain-text form of the backup sheet.
//!
//! # Invariants
//! - Export renders dates as `DD/MM/YYYY` local dates; time of day is dropped.
//! - A single malformed row rejects the whole import before any write.

use crate::model::expense::{Expense, ExpenseDraft};
use crate::model::period::{format_display_date, parse_display_date};
use crate::store::{ExpenseStore, StoreError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("row {row}: invalid amount `{value}`")]
    InvalidAmount { row: usize, value: String },
    #[error("row {row}: invalid entry time `{value}`")]
    InvalidEntryTime { row: usize, value: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sheet cell that may arrive as a number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetValue {
    Number(f64),
    Text(String),
}

impl Default for SheetValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl SheetValue {
    fn describe(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }
}

/// One data row of the backup sheet; field names match the sheet headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Amount", default)]
    pub amount: SheetValue,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Entry Time", default)]
    pub entry_time: SheetValue,
}

impl SheetRow {
    pub fn from_expense(expense: &Expense) -> Self {
        Self {
            title: expense.title.clone(),
            amount: SheetValue::Number(expense.amount),
            category: expense.category.clone(),
            description: expense.description.clone().unwrap_or_default(),
            entry_time: SheetValue::Text(
                format_display_date(expense.entry_date).unwrap_or_default(),
            ),
        }
    }

    /// Converts to a restore draft; `row` is the 1-based data row for errors.
    ///
    /// An empty amount becomes `0`; an empty entry time stays unset and is
    /// stored as "now" by the restore.
    pub fn to_draft(&self, row: usize) -> Result<ExpenseDraft, InterchangeError> {
        Ok(ExpenseDraft {
            title: self.title.clone(),
            amount: parse_amount(&self.amount).ok_or_else(|| InterchangeError::InvalidAmount {
                row,
                value: self.amount.describe(),
            })?,
            category: self.category.clone(),
            description: Some(self.description.clone()).filter(|value| !value.is_empty()),
            entry_date: parse_entry_time(&self.entry_time).map_err(|()| {
                InterchangeError::InvalidEntryTime {
                    row,
                    value: self.entry_time.describe(),
                }
            })?,
        })
    }
}

/// Maps sheet rows to drafts, failing on the first malformed row.
pub fn rows_to_drafts(rows: &[SheetRow]) -> Result<Vec<ExpenseDraft>, InterchangeError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| row.to_draft(index + 1))
        .collect()
}

pub fn expenses_to_rows(expenses: &[Expense]) -> Vec<SheetRow> {
    expenses.iter().map(SheetRow::from_expense).collect()
}

/// Reads a headered CSV sheet into restore drafts.
pub fn read_sheet_csv(reader: impl Read) -> Result<Vec<ExpenseDraft>, InterchangeError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let rows = csv_reader
        .deserialize::<SheetRow>()
        .collect::<Result<Vec<_>, _>>()?;
    rows_to_drafts(&rows)
}

/// Writes expenses as a headered CSV sheet and returns the row count.
pub fn write_sheet_csv(writer: impl Write, expenses: &[Expense]) -> Result<usize, InterchangeError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in expenses_to_rows(expenses) {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(expenses.len())
}

/// Exports every stored expense as a CSV sheet.
pub fn export_to_csv(store: &ExpenseStore, writer: impl Write) -> Result<usize, InterchangeError> {
    let expenses = store.list_all_expenses()?;
    let written = write_sheet_csv(writer, &expenses)?;
    info!("event=expense_export module=interchange status=ok records={written}");
    Ok(written)
}

/// Replaces every stored expense with the rows of a CSV sheet.
///
/// Parsing happens before the restore transaction starts, so a bad sheet
/// leaves the store untouched.
pub fn restore_from_csv(store: &ExpenseStore, reader: impl Read) -> Result<usize, InterchangeError> {
    let drafts = read_sheet_csv(reader).map_err(|err| {
        warn!("event=expense_import module=interchange status=error error={err}");
        err
    })?;
    Ok(store.restore_expenses(&drafts)?)
}

fn parse_amount(value: &SheetValue) -> Option<f64> {
    let amount = match value {
        SheetValue::Number(number) => *number,
        SheetValue::Text(text) if text.trim().is_empty() => 0.0,
        SheetValue::Text(text) => text.trim().parse::<f64>().ok()?,
    };
    amount.is_finite().then_some(amount)
}

fn parse_entry_time(value: &SheetValue) -> Result<Option<i64>, ()> {
    match value {
        SheetValue::Number(number) if number.is_finite() && number.fract() == 0.0 => {
            Ok(Some(*number as i64))
        }
        SheetValue::Number(_) => Err(()),
        SheetValue::Text(text) if text.trim().is_empty() => Ok(None),
        SheetValue::Text(text) => parse_display_date(text)
            .or_else(|| text.trim().parse::<i64>().ok())
            .map(Some)
            .ok_or(()),
    }
}
