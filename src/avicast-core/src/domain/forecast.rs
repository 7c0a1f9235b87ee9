use crate::{ScientificName, YearMonth};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionType {
    Future,
}

/// Range shift deltas in degrees per compass direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeShift {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// A forecasted month for one grid cell of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub species: ScientificName,
    pub period: YearMonth,
    /// Grid cell bucket in degrees.
    pub grid_latitude: f64,
    pub grid_longitude: f64,
    /// Mean position of the observations aggregated into the cell.
    pub latitude: f64,
    pub longitude: f64,
    pub count_prediction: f64,
    pub range_shift: RangeShift,
    pub months_ahead: u32,
    pub prediction_type: PredictionType,
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
}

/// Forecasts of one month averaged across all grid cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub year: i32,
    pub month: u32,
    pub count_prediction: f64,
    pub range_north: f64,
    pub range_south: f64,
    pub range_east: f64,
    pub range_west: f64,
}
