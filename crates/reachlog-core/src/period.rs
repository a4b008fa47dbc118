use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Named reporting window, resolved relative to a caller-supplied "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Today,
    Yesterday,
    /// Last 7 days including today.
    Week,
    /// Last 30 days including today.
    Month,
}

impl ReportPeriod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportPeriod::Today => "today",
            ReportPeriod::Yesterday => "yesterday",
            ReportPeriod::Week => "week",
            ReportPeriod::Month => "month",
        }
    }

    #[must_use]
    pub fn resolve(self, today: NaiveDate) -> DateRange {
        let (start, end) = match self {
            ReportPeriod::Today => (today, today),
            ReportPeriod::Yesterday => {
                let yesterday = today - Duration::days(1);
                (yesterday, yesterday)
            }
            ReportPeriod::Week => (today - Duration::days(6), today),
            ReportPeriod::Month => (today - Duration::days(29), today),
        };
        DateRange { start, end }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportPeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(ReportPeriod::Today),
            "yesterday" => Ok(ReportPeriod::Yesterday),
            "week" => Ok(ReportPeriod::Week),
            "month" => Ok(ReportPeriod::Month),
            other => Err(CoreError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Inclusive date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDateRange`] if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Picks the report range from request inputs.
///
/// An explicit `start`/`end` pair wins over `period`. Returns `Ok(None)` when
/// neither is given; the caller decides what an unbounded report means.
///
/// # Errors
///
/// Returns [`CoreError::IncompleteDateRange`] when only one bound is supplied
/// and [`CoreError::InvalidDateRange`] when `start` is after `end`.
pub fn select_range(
    period: Option<ReportPeriod>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<Option<DateRange>, CoreError> {
    match (start, end) {
        (Some(start), Some(end)) => DateRange::new(start, end).map(Some),
        (None, None) => Ok(period.map(|p| p.resolve(today))),
        (Some(_), None) => Err(CoreError::IncompleteDateRange("end_date")),
        (None, Some(_)) => Err(CoreError::IncompleteDateRange("start_date")),
    }
}
