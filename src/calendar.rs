//! Holiday calendar and rate-type resolution

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::types::RateType;

/// Holidays keyed by date, with their display names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    holidays: BTreeMap<NaiveDate, String>,
}

/// Parse a form date: `2025-05-03` or `2025/05/03`
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    let date_str = date_str.trim();
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_str, "%Y/%m/%d"))
        .ok()
}

impl HolidayCalendar {
    /// Load a holiday file of `date = name` entries
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read holiday file: {}", path.display()))?;
        Self::from_conl(&content)
            .with_context(|| format!("Failed to parse holiday file: {}", path.display()))
    }

    /// Like `load_from_path`, but a missing file yields an empty calendar
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "holiday file not found, every non-weekend day is priced as a weekday"
            );
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }

    pub fn from_conl(content: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_conl::from_str(content)?;

        let holidays = entries
            .into_iter()
            .filter_map(|(date_str, name)| match parse_date(&date_str) {
                Some(date) => Some((date, name)),
                None => {
                    tracing::warn!(entry = %date_str, "skipping holiday with unparseable date");
                    None
                }
            })
            .collect();

        Ok(Self { holidays })
    }

    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: dates.into_iter().map(|d| (d, String::new())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains_key(&date)
    }

    /// Display name of a holiday; `None` for ordinary days and unnamed holidays
    pub fn holiday_name(&self, date: NaiveDate) -> Option<&str> {
        self.holidays
            .get(&date)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// First and last day of the run of consecutive holidays containing `date`
    fn holiday_run(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        let mut first = date;
        while let Some(prev) = first.pred_opt().filter(|d| self.is_holiday(*d)) {
            first = prev;
        }
        let mut last = date;
        while let Some(next) = last.succ_opt().filter(|d| self.is_holiday(*d)) {
            last = next;
        }
        (first, last)
    }

    /// Billing tier for a date.
    ///
    /// A block of consecutive holidays is billed like a weekend: every day
    /// but the last at the Saturday rate, the last at the Sunday rate. A lone
    /// holiday is a Sunday unless it falls on a Friday, where it opens a long
    /// weekend. A Sunday followed by a holiday is billed as a Saturday.
    pub fn rate_type(&self, date: NaiveDate) -> RateType {
        if !self.is_holiday(date) {
            return match date.weekday() {
                Weekday::Sat => RateType::Saturday,
                Weekday::Sun => match date.succ_opt() {
                    Some(next) if self.is_holiday(next) => RateType::Saturday,
                    _ => RateType::Sunday,
                },
                _ => RateType::Weekday,
            };
        }

        let (first, last) = self.holiday_run(date);
        if first == last {
            if date.weekday() == Weekday::Fri {
                RateType::Saturday
            } else {
                RateType::Sunday
            }
        } else if date == last {
            RateType::Sunday
        } else {
            RateType::Saturday
        }
    }

    /// Rate tier for a raw form value; empty or malformed dates are weekdays
    pub fn rate_type_str(&self, date_str: &str) -> RateType {
        resolve(parse_date(date_str), self)
    }
}

/// Resolve the rate tier of an optional booking date
pub fn resolve(date: Option<NaiveDate>, holidays: &HolidayCalendar) -> RateType {
    match date {
        Some(date) => holidays.rate_type(date),
        None => RateType::Weekday,
    }
}

/// Japanese single-character weekday, as printed after dates on quotes
pub fn weekday_ja(date: NaiveDate) -> &'static str {
    const NAMES: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];
    NAMES[date.weekday().num_days_from_monday() as usize]
}

/// `2025/05/03(土)`
pub fn format_date_ja(date: NaiveDate) -> String {
    format!("{}({})", date.format("%Y/%m/%d"), weekday_ja(date))
}
