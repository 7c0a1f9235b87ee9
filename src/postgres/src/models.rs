use crate::error::PostgresError;
use crate::error::error::DataConversionSnafu;
use avicast_core::{PredictionType, RangeShift, ScientificName, YearMonth};
use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Observation {
    pub scientific_name: String,
    pub observed_on: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub observation_count: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Forecast {
    pub scientific_name: String,
    pub year: i32,
    pub month: i32,
    pub grid_latitude: f64,
    pub grid_longitude: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub count_prediction: f64,
    pub range_north: f64,
    pub range_south: f64,
    pub range_east: f64,
    pub range_west: f64,
    pub months_ahead: i32,
    pub prediction_type: String,
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
}

/// Column arrays for an `UNNEST` based batch insert.
#[derive(Debug, Default)]
pub struct NewForecasts {
    pub scientific_name: Vec<String>,
    pub year: Vec<i32>,
    pub month: Vec<i32>,
    pub grid_latitude: Vec<f64>,
    pub grid_longitude: Vec<f64>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub count_prediction: Vec<f64>,
    pub range_north: Vec<f64>,
    pub range_south: Vec<f64>,
    pub range_east: Vec<f64>,
    pub range_west: Vec<f64>,
    pub months_ahead: Vec<i32>,
    pub prediction_type: Vec<String>,
    pub model_version: Vec<String>,
    pub generated_at: Vec<DateTime<Utc>>,
}

impl TryFrom<Observation> for avicast_core::Observation {
    type Error = PostgresError;

    fn try_from(value: Observation) -> Result<Self, Self::Error> {
        let count = u32::try_from(value.observation_count).map_err(|_| {
            DataConversionSnafu {
                reason: format!("negative observation count '{}'", value.observation_count),
            }
            .build()
        })?;

        Ok(Self {
            species: ScientificName::new(value.scientific_name),
            date: value.observed_on,
            latitude: value.latitude,
            longitude: value.longitude,
            count,
        })
    }
}

impl TryFrom<Forecast> for avicast_core::Forecast {
    type Error = PostgresError;

    fn try_from(value: Forecast) -> Result<Self, Self::Error> {
        let month = u32::try_from(value.month).ok();
        let period = month
            .and_then(|m| YearMonth::new(value.year, m).ok())
            .ok_or_else(|| {
                DataConversionSnafu {
                    reason: format!("invalid forecast period '{}-{}'", value.year, value.month),
                }
                .build()
            })?;
        let months_ahead = u32::try_from(value.months_ahead).map_err(|_| {
            DataConversionSnafu {
                reason: format!("negative months ahead '{}'", value.months_ahead),
            }
            .build()
        })?;
        let prediction_type = PredictionType::from_str(&value.prediction_type).map_err(|_| {
            DataConversionSnafu {
                reason: format!("unknown prediction type '{}'", value.prediction_type),
            }
            .build()
        })?;

        Ok(Self {
            species: ScientificName::new(value.scientific_name),
            period,
            grid_latitude: value.grid_latitude,
            grid_longitude: value.grid_longitude,
            latitude: value.latitude,
            longitude: value.longitude,
            count_prediction: value.count_prediction,
            range_shift: RangeShift {
                north: value.range_north,
                south: value.range_south,
                east: value.range_east,
                west: value.range_west,
            },
            months_ahead,
            prediction_type,
            model_version: value.model_version,
            generated_at: value.generated_at,
        })
    }
}

impl From<Vec<avicast_core::Forecast>> for NewForecasts {
    fn from(forecasts: Vec<avicast_core::Forecast>) -> Self {
        let mut columns = NewForecasts::default();
        for f in forecasts {
            columns.scientific_name.push(f.species.as_str().to_string());
            columns.year.push(f.period.year());
            columns.month.push(f.period.month() as i32);
            columns.grid_latitude.push(f.grid_latitude);
            columns.grid_longitude.push(f.grid_longitude);
            columns.latitude.push(f.latitude);
            columns.longitude.push(f.longitude);
            columns.count_prediction.push(f.count_prediction);
            columns.range_north.push(f.range_shift.north);
            columns.range_south.push(f.range_shift.south);
            columns.range_east.push(f.range_shift.east);
            columns.range_west.push(f.range_shift.west);
            columns.months_ahead.push(f.months_ahead as i32);
            columns.prediction_type.push(f.prediction_type.as_ref().to_string());
            columns.model_version.push(f.model_version);
            columns.generated_at.push(f.generated_at);
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast_row() -> Forecast {
        Forecast {
            scientific_name: "Cardinalis cardinalis".into(),
            year: 2025,
            month: 7,
            grid_latitude: 35.0,
            grid_longitude: -81.0,
            latitude: 35.1,
            longitude: -80.9,
            count_prediction: 12.5,
            range_north: 0.1,
            range_south: -0.2,
            range_east: 0.3,
            range_west: -0.4,
            months_ahead: 7,
            prediction_type: "future".into(),
            model_version: "v1.0".into(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_forecast_row_converts_to_domain() {
        let forecast = avicast_core::Forecast::try_from(forecast_row()).unwrap();
        assert_eq!(forecast.period, YearMonth::new(2025, 7).unwrap());
        assert_eq!(forecast.prediction_type, PredictionType::Future);
        assert_eq!(forecast.range_shift.west, -0.4);
    }

    #[test]
    fn test_invalid_rows_are_rejected() {
        let mut row = forecast_row();
        row.month = 13;
        assert!(avicast_core::Forecast::try_from(row).is_err());

        let mut row = forecast_row();
        row.prediction_type = "past".into();
        assert!(avicast_core::Forecast::try_from(row).is_err());

        let observation = Observation {
            scientific_name: "Cardinalis cardinalis".into(),
            observed_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            latitude: 35.0,
            longitude: -81.0,
            observation_count: -1,
        };
        assert!(avicast_core::Observation::try_from(observation).is_err());
    }

    #[test]
    fn test_forecasts_are_split_into_columns() {
        let forecast = avicast_core::Forecast::try_from(forecast_row()).unwrap();
        let columns = NewForecasts::from(vec![forecast.clone(), forecast]);
        assert_eq!(columns.year, vec![2025, 2025]);
        assert_eq!(columns.prediction_type, vec!["future", "future"]);
        assert_eq!(columns.generated_at.len(), 2);
    }
}
