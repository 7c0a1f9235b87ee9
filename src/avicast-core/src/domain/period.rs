use crate::error::error::{InvalidMonthRangeSnafu, InvalidMonthSnafu};
use crate::Result;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::f64::consts::PI;
use std::fmt;

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        ensure!((1..=12).contains(&month), InvalidMonthSnafu { month });
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months elapsed since January of year 0.
    pub fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    pub fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn add_months(&self, months: u32) -> Self {
        Self::from_ordinal(self.ordinal() + months as i64)
    }

    /// `(sin, cos)` of the month angle, December and January end up adjacent.
    pub fn cyclical_encoding(&self) -> (f64, f64) {
        let angle = 2.0 * PI * self.month as f64 / 12.0;
        (angle.sin(), angle.cos())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Inclusive range of calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    start: YearMonth,
    end: YearMonth,
}

impl MonthRange {
    pub fn new(start: YearMonth, end: YearMonth) -> Result<Self> {
        ensure!(
            start <= end,
            InvalidMonthRangeSnafu {
                start: start.to_string(),
                end: end.to_string(),
            }
        );
        Ok(Self { start, end })
    }

    /// January of `start_year` through December of `end_year`.
    pub fn years(start_year: i32, end_year: i32) -> Result<Self> {
        Self::new(
            YearMonth::new(start_year, 1)?,
            YearMonth::new(end_year, 12)?,
        )
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn end(&self) -> YearMonth {
        self.end
    }

    pub fn contains(&self, period: &YearMonth) -> bool {
        self.start <= *period && *period <= self.end
    }

    pub fn len(&self) -> usize {
        (self.end.ordinal() - self.start.ordinal() + 1) as usize
    }
}
