use crate::ScientificName;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::YearMonth;

/// A single occurrence record as delivered by the ingestion side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub species: ScientificName,
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub count: u32,
}

impl Observation {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn period(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }
}
