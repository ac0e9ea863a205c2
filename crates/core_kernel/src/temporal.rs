//! Calendar handling for ledger documents
//!
//! Policies carry plain calendar dates. "Today" is always evaluated in the
//! ledger's configured timezone so that every peer agrees on which day a
//! claim was made.

use chrono::{DateTime, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Date format used by the ledger's callers (day/month/year)
pub const LEDGER_DATE_FORMAT: &str = "%d/%m/%Y";

/// ISO-8601 calendar date, also accepted on input
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a caller-supplied date in `dd/mm/yyyy` or `yyyy-mm-dd` form
pub fn parse_ledger_date(value: &str) -> Result<NaiveDate, CoreError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, LEDGER_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT))
        .map_err(|_| CoreError::InvalidDate {
            value: value.to_string(),
        })
}

/// Formats a date the way ledger callers write it
pub fn format_ledger_date(date: NaiveDate) -> String {
    date.format(LEDGER_DATE_FORMAT).to_string()
}

/// Timezone wrapper for the ledger's notion of "today"
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s.trim())
            .map(Timezone)
            .map_err(|_| CoreError::Configuration(format!("Invalid timezone: {}", s)))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// The calendar date of `now` in this timezone
    pub fn date_of(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.0).date_naive()
    }

    /// Today's calendar date in this timezone
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

/// An inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day of the window (inclusive)
    pub start: NaiveDate,
    /// Last day of the window (inclusive)
    pub end: NaiveDate,
}

impl DateWindow {
    /// Creates a window, rejecting an end before the start
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::validation(format!(
                "window end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// The window `[center - months, center + months]`
    ///
    /// Month arithmetic clamps to the last day of the target month
    /// (31 March minus one month is 29 February in a leap year). A bound
    /// falling outside chrono's calendar saturates to the calendar limit.
    pub fn around(center: NaiveDate, months: u32) -> Self {
        let span = Months::new(months);
        Self {
            start: center.checked_sub_months(span).unwrap_or(NaiveDate::MIN),
            end: center.checked_add_months(span).unwrap_or(NaiveDate::MAX),
        }
    }

    /// Returns true if the date lies inside the window, bounds included
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]",
            format_ledger_date(self.start),
            format_ledger_date(self.end)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_day_month_year() {
        assert_eq!(parse_ledger_date("27/04/2017").unwrap(), date(2017, 4, 27));
    }

    #[test]
    fn test_parse_iso() {
        assert_eq!(parse_ledger_date(" 2017-04-27 ").unwrap(), date(2017, 4, 27));
    }

    #[test]
    fn test_parse_rejects_impossible_date() {
        assert!(parse_ledger_date("31/02/2017").is_err());
        assert!(parse_ledger_date("04/27/2017").is_err());
        assert!(parse_ledger_date("").is_err());
    }

    #[test]
    fn test_window_around_is_inclusive() {
        let window = DateWindow::around(date(2024, 6, 15), 2);
        assert_eq!(window.start, date(2024, 4, 15));
        assert_eq!(window.end, date(2024, 8, 15));
        assert!(window.contains(date(2024, 4, 15)));
        assert!(window.contains(date(2024, 8, 15)));
        assert!(!window.contains(date(2024, 4, 14)));
        assert!(!window.contains(date(2024, 8, 16)));
    }

    #[test]
    fn test_window_clamps_to_month_end() {
        let window = DateWindow::around(date(2024, 4, 30), 2);
        assert_eq!(window.start, date(2024, 2, 29));
        assert_eq!(window.end, date(2024, 6, 30));
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(DateWindow::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_timezone_round_trip() {
        let tz: Timezone = "Asia/Kolkata".parse().unwrap();
        let json = serde_json::to_string(&tz).unwrap();
        assert_eq!(json, "\"Asia/Kolkata\"");
        assert!("Mars/Olympus".parse::<Timezone>().is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_window_contains_its_center(days in 0i64..200_000, months in 0u32..48) {
            let center = date(1900, 1, 1) + chrono::Duration::days(days);
            let window = DateWindow::around(center, months);
            proptest::prop_assert!(window.start <= center);
            proptest::prop_assert!(window.end >= center);
            proptest::prop_assert!(window.contains(center));
        }
    }

    #[test]
    fn test_date_of_respects_timezone() {
        let tz: Timezone = "Asia/Kolkata".parse().unwrap();
        let late_utc = DateTime::parse_from_rfc3339("2024-03-01T20:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(tz.date_of(late_utc), date(2024, 3, 2));
        assert_eq!(Timezone::default().date_of(late_utc), date(2024, 3, 1));
    }
}
