//! View tabs, range derivation and local-calendar helpers.
//!
//! # Responsibility
//! - Map an anchor date and a view tab to inclusive epoch-millisecond bounds.
//! - Convert between stored epoch milliseconds and the `DD/MM/YYYY` display
//!   format used by spreadsheet interchange.
//!
//! # Invariants
//! - Bounds are inclusive: `end` is the last millisecond before the next
//!   period starts in local time, so adjacent periods never overlap.
//! - Calendar boundaries are local midnights; stored values stay UTC.

use chrono::{
    DateTime, Datelike, Local, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeDelta, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

static DISPLAY_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})\s*$").expect("valid display date regex")
});

/// Expense list view granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewTab {
    Daily,
    Monthly,
    Yearly,
}

impl ViewTab {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }
}

impl Display for ViewTab {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewTab {
    type Err = UnsupportedTabError;

    /// Accepts exactly the three tab names shown by the app.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Daily" => Ok(Self::Daily),
            "Monthly" => Ok(Self::Monthly),
            "Yearly" => Ok(Self::Yearly),
            other => Err(UnsupportedTabError(other.to_string())),
        }
    }
}

/// Raised for any tab name outside `Daily|Monthly|Yearly`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported tab: {0}")]
pub struct UnsupportedTabError(pub String);

/// Inclusive epoch-millisecond bounds of one view period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    /// Range covering every representable entry date (export reads).
    pub const UNBOUNDED: DateRange = DateRange {
        start: i64::MIN,
        end: i64::MAX,
    };

    pub fn contains(&self, epoch_ms: i64) -> bool {
        self.start <= epoch_ms && epoch_ms <= self.end
    }
}

/// Derives the local-time period containing `anchor` for the given tab.
pub fn date_range(anchor: NaiveDate, tab: ViewTab) -> DateRange {
    let (first, next) = match tab {
        ViewTab::Daily => (anchor, anchor.succ_opt()),
        ViewTab::Monthly => {
            let first = anchor.with_day(1).unwrap_or(anchor);
            (first, first.checked_add_months(Months::new(1)))
        }
        ViewTab::Yearly => {
            let first = anchor.with_ordinal(1).unwrap_or(anchor);
            (first, first.checked_add_months(Months::new(12)))
        }
    };

    DateRange {
        start: local_midnight_ms(first),
        end: next.map_or(i64::MAX, |next| local_midnight_ms(next) - 1),
    }
}

/// Parses a tab name and derives its range; unknown names never reach SQL.
pub fn date_range_for_tab(anchor: NaiveDate, tab: &str) -> Result<DateRange, UnsupportedTabError> {
    Ok(date_range(anchor, tab.parse()?))
}

/// Current instant in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Epoch milliseconds of local midnight starting `date`.
pub fn local_midnight_ms(date: NaiveDate) -> i64 {
    local_epoch_ms(date.and_time(NaiveTime::MIN))
}

/// Epoch milliseconds of a local wall-clock time.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times
/// skipped by a DST jump keep the offset in effect before the jump.
pub fn local_epoch_ms(at: NaiveDateTime) -> i64 {
    match Local.from_local_datetime(&at) {
        LocalResult::Single(value) => value.timestamp_millis(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
        LocalResult::None => Local
            .from_local_datetime(&(at + TimeDelta::hours(1)))
            .earliest()
            .map_or_else(|| at.and_utc().timestamp_millis(), |value| {
                value.timestamp_millis() - TimeDelta::hours(1).num_milliseconds()
            }),
    }
}

/// Local calendar date of an epoch-millisecond instant.
pub fn local_date(epoch_ms: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|value| value.with_timezone(&Local).date_naive())
}

/// Renders an entry date as `DD/MM/YYYY` in local time.
pub fn format_display_date(epoch_ms: i64) -> Option<String> {
    local_date(epoch_ms).map(|date| date.format("%d/%m/%Y").to_string())
}

/// Parses `DD/MM/YYYY` (also `-` or `.` separated) to local midnight.
pub fn parse_display_date(value: &str) -> Option<i64> {
    let captures = DISPLAY_DATE_RE.captures(value)?;
    let day = captures[1].parse::<u32>().ok()?;
    let month = captures[2].parse::<u32>().ok()?;
    let year = captures[3].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(local_midnight_ms)
}

/// Header title for the period containing `anchor`.
pub fn period_title(tab: ViewTab, anchor: NaiveDate) -> String {
    let pattern = match tab {
        ViewTab::Daily => "%-d %B %Y",
        ViewTab::Monthly => "%B %Y",
        ViewTab::Yearly => "%Y",
    };
    anchor.format(pattern).to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        date_range, date_range_for_tab, format_display_date, local_date, local_epoch_ms,
        local_midnight_ms, parse_display_date, period_title, UnsupportedTabError, ViewTab,
    };
    use chrono::NaiveDate;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn daily_range_spans_one_local_day() {
        let range = date_range(ymd(2024, 3, 5), ViewTab::Daily);
        assert_eq!(range.start, local_midnight_ms(ymd(2024, 3, 5)));
        assert_eq!(range.end, local_midnight_ms(ymd(2024, 3, 6)) - 1);
        let last_ms = ymd(2024, 3, 5).and_hms_milli_opt(23, 59, 59, 999).unwrap();
        assert_eq!(range.end, local_epoch_ms(last_ms));
    }

    #[test]
    fn monthly_range_handles_leap_february() {
        let range = date_range(ymd(2024, 2, 17), ViewTab::Monthly);
        assert_eq!(range.start, local_midnight_ms(ymd(2024, 2, 1)));
        assert_eq!(range.end, local_midnight_ms(ymd(2024, 3, 1)) - 1);
        assert_eq!(local_date(range.end), Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn yearly_range_runs_jan_to_dec() {
        let range = date_range(ymd(2023, 7, 9), ViewTab::Yearly);
        assert_eq!(range.start, local_midnight_ms(ymd(2023, 1, 1)));
        assert_eq!(local_date(range.end), Some(ymd(2023, 12, 31)));
        assert!(!range.contains(local_midnight_ms(ymd(2024, 1, 1))));
    }

    #[test]
    fn unknown_tab_name_is_rejected() {
        let err = date_range_for_tab(ymd(2024, 1, 1), "Weekly").unwrap_err();
        assert_eq!(err, UnsupportedTabError("Weekly".to_string()));
        assert_eq!(err.to_string(), "unsupported tab: Weekly");
        assert!("daily".parse::<ViewTab>().is_err());
    }

    #[test]
    fn display_date_parses_and_formats_local_midnight() {
        let parsed = parse_display_date("05/03/2024").unwrap();
        assert_eq!(parsed, local_midnight_ms(ymd(2024, 3, 5)));
        assert_eq!(format_display_date(parsed).as_deref(), Some("05/03/2024"));
        assert_eq!(parse_display_date("5-3-2024"), Some(parsed));
        assert_eq!(parse_display_date("31/02/2024"), None);
        assert_eq!(parse_display_date("2024-03-05"), None);
    }

    #[test]
    fn period_title_matches_tab() {
        let anchor = ymd(2024, 3, 5);
        assert_eq!(period_title(ViewTab::Daily, anchor), "5 March 2024");
        assert_eq!(period_title(ViewTab::Monthly, anchor), "March 2024");
        assert_eq!(period_title(ViewTab::Yearly, anchor), "2024");
    }
}
