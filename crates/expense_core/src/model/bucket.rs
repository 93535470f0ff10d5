//! Synthesized aggregate rows for Monthly and Yearly views.
//!
//! # Invariants
//! - Buckets are never persisted; ids are a 1-based index over one result set
//!   and carry no identity across queries.
//! - Buckets keep the ascending period order produced by the query.

use crate::model::expense::Expense;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw grouped total for one calendar day or month, as read from SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotal {
    /// First local day of the group (the day itself, or day 1 of the month).
    pub period_start: NaiveDate,
    pub total_amount: f64,
    pub count: i64,
}

/// Summary row rendered by Monthly/Yearly views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBucket {
    /// Position in this result set, starting at 1.
    pub id: i64,
    pub label: String,
    pub total_amount: f64,
    pub count: i64,
    pub period_start: NaiveDate,
}

/// Output of a range read; shape depends on the tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum RangeView {
    /// Daily tab: individual rows, ascending by entry date.
    Entries(Vec<Expense>),
    /// Monthly/Yearly tabs: one bucket per day or month.
    Buckets(Vec<AggregateBucket>),
}

impl RangeView {
    pub fn len(&self) -> usize {
        match self {
            Self::Entries(items) => items.len(),
            Self::Buckets(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of every amount covered by the view.
    pub fn total_amount(&self) -> f64 {
        match self {
            Self::Entries(items) => items.iter().map(|item| item.amount).sum(),
            Self::Buckets(items) => items.iter().map(|item| item.total_amount).sum(),
        }
    }
}

/// Labels day totals as `"<day> <weekday> (<count>)"`, e.g. `"5 Tuesday (2)"`.
pub fn day_buckets(totals: Vec<PeriodTotal>) -> Vec<AggregateBucket> {
    into_buckets(totals, |total| {
        format!(
            "{} ({})",
            total.period_start.format("%-d %A"),
            total.count
        )
    })
}

/// Labels month totals as `"<month-number> <month-name>"`, e.g. `"3 March"`.
pub fn month_buckets(totals: Vec<PeriodTotal>) -> Vec<AggregateBucket> {
    into_buckets(totals, |total| total.period_start.format("%-m %B").to_string())
}

fn into_buckets(
    totals: Vec<PeriodTotal>,
    label: impl Fn(&PeriodTotal) -> String,
) -> Vec<AggregateBucket> {
    totals
        .into_iter()
        .zip(1_i64..)
        .map(|(total, id)| AggregateBucket {
            id,
            label: label(&total),
            total_amount: total.total_amount,
            count: total.count,
            period_start: total.period_start,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{day_buckets, month_buckets, PeriodTotal};
    use chrono::NaiveDate;

    fn total(year: i32, month: u32, day: u32, amount: f64, count: i64) -> PeriodTotal {
        PeriodTotal {
            period_start: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
            total_amount: amount,
            count,
        }
    }

    #[test]
    fn day_labels_carry_weekday_and_count() {
        let buckets = day_buckets(vec![total(2024, 3, 5, 30.0, 2), total(2024, 3, 6, 5.0, 1)]);
        assert_eq!(buckets[0].label, "5 Tuesday (2)");
        assert_eq!(buckets[1].label, "6 Wednesday (1)");
        assert_eq!(buckets[0].id, 1);
        assert_eq!(buckets[1].id, 2);
    }

    #[test]
    fn month_labels_carry_number_and_name() {
        let buckets = month_buckets(vec![total(2024, 1, 1, 12.5, 3), total(2024, 11, 1, 1.0, 1)]);
        assert_eq!(buckets[0].label, "1 January");
        assert_eq!(buckets[1].label, "11 November");
        assert_eq!(buckets[1].id, 2);
    }
}
