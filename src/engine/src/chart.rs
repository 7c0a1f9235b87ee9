use crate::error::error::{InvalidPeriodSnafu, StoreSnafu};
use crate::Result;
use avicast_core::{ChartPoint, Forecast, ForecastOutbound, MonthRange, ScientificName, YearMonth};
use snafu::ResultExt;
use std::collections::BTreeMap;

/// Per-month averages across grid cells of the stored forecasts within `range`.
pub async fn forecast_chart<S>(
    store: &S,
    species: &ScientificName,
    range: MonthRange,
) -> Result<Vec<ChartPoint>>
where
    S: ForecastOutbound + ?Sized,
{
    let forecasts = store
        .forecasts(species, Some(range))
        .await
        .context(StoreSnafu)?;
    Ok(chart_points(&forecasts))
}

/// January of `start_year` through December of `end_year`.
pub async fn forecast_chart_for_years<S>(
    store: &S,
    species: &ScientificName,
    start_year: i32,
    end_year: i32,
) -> Result<Vec<ChartPoint>>
where
    S: ForecastOutbound + ?Sized,
{
    let range = MonthRange::years(start_year, end_year).context(InvalidPeriodSnafu)?;
    forecast_chart(store, species, range).await
}

#[derive(Default)]
struct MonthTotals {
    count: f64,
    north: f64,
    south: f64,
    east: f64,
    west: f64,
    records: usize,
}

/// Groups by month and averages, counts rounded to 2 decimals and range shifts to 3.
pub fn chart_points(forecasts: &[Forecast]) -> Vec<ChartPoint> {
    let mut months: BTreeMap<YearMonth, MonthTotals> = BTreeMap::new();
    for f in forecasts {
        let totals = months.entry(f.period).or_default();
        totals.count += f.count_prediction;
        totals.north += f.range_shift.north;
        totals.south += f.range_shift.south;
        totals.east += f.range_shift.east;
        totals.west += f.range_shift.west;
        totals.records += 1;
    }

    months
        .into_iter()
        .map(|(period, totals)| {
            let n = totals.records as f64;
            ChartPoint {
                year: period.year(),
                month: period.month(),
                count_prediction: round_to(totals.count / n, 2),
                range_north: round_to(totals.north / n, 3),
                range_south: round_to(totals.south / n, 3),
                range_east: round_to(totals.east / n, 3),
                range_west: round_to(totals.west / n, 3),
            }
        })
        .collect()
}

/// Rounds half to even at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use avicast_core::RangeShift;

    fn forecast(year: i32, month: u32, count: f64, north: f64) -> Forecast {
        Forecast {
            species: "Cardinalis cardinalis".into(),
            period: YearMonth::new(year, month).unwrap(),
            grid_latitude: 35.0,
            grid_longitude: -81.0,
            latitude: 35.0,
            longitude: -81.0,
            count_prediction: count,
            range_shift: RangeShift {
                north,
                south: 0.0,
                east: 0.0,
                west: 0.0,
            },
            months_ahead: 1,
            prediction_type: avicast_core::PredictionType::Future,
            model_version: "v1.0".into(),
            generated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_months_are_averaged_and_sorted() {
        let forecasts = vec![
            forecast(2025, 2, 3.0, 0.1),
            forecast(2024, 12, 1.0, 0.2),
            forecast(2025, 2, 4.0, 0.2),
            forecast(2024, 12, 2.0, 0.3),
        ];

        let points = chart_points(&forecasts);
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].year, points[0].month), (2024, 12));
        assert_eq!((points[1].year, points[1].month), (2025, 2));
        assert_eq!(points[0].count_prediction, 1.5);
        assert_eq!(points[1].count_prediction, 3.5);
        assert_eq!(points[0].range_north, 0.25);
        assert_eq!(points[1].range_north, 0.15);
    }

    #[test]
    fn test_rounding_precision() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(-0.123456, 3), -0.123);
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(3.5, 0), 4.0);
    }

    #[test]
    fn test_no_forecasts_give_empty_chart() {
        assert!(chart_points(&[]).is_empty());
    }
}
