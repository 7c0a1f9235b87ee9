use crate::error::error::StoreSnafu;
use crate::{
    FEATURES, ForecastNetwork, MonthlyAggregate, RangeShiftEstimator, Result, feature_vector,
};
use avicast_core::{
    Forecast, ForecastInbound, Grid, GridCell, PredictionType, ScientificName, YearMonth,
};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use snafu::ResultExt;
use std::collections::{BTreeMap, VecDeque};
use tracing::{event, instrument, Level};

/// Rolls a trained network forward month by month for every grid cell with enough history.
#[derive(Debug, Clone)]
pub struct ForecastGenerator {
    grid: Grid,
    context_length: usize,
    months_ahead: u32,
    model_version: String,
}

impl ForecastGenerator {
    pub fn new(grid: Grid, context_length: usize, months_ahead: u32, model_version: String) -> Self {
        Self {
            grid,
            context_length,
            months_ahead,
            model_version,
        }
    }

    pub fn months_ahead(&self) -> u32 {
        self.months_ahead
    }

    /// The last `context_length` months of a cell seed the window. Each predicted month is
    /// appended to the window, dropping the oldest, before the next month is predicted.
    pub fn generate(
        &self,
        species: &ScientificName,
        network: &ForecastNetwork,
        rows: &[MonthlyAggregate],
        estimator: &mut dyn RangeShiftEstimator,
        generated_at: DateTime<Utc>,
    ) -> Vec<Forecast> {
        let mut cells: BTreeMap<GridCell, Vec<&MonthlyAggregate>> = BTreeMap::new();
        for row in rows {
            cells.entry(row.cell).or_default().push(row);
        }

        let mut forecasts = Vec::with_capacity(cells.len() * self.months_ahead as usize);

        for (cell, mut series) in cells {
            if self.context_length == 0 || series.len() < self.context_length {
                continue;
            }
            series.sort_by_key(|r| r.period);

            let n = series.len() as f64;
            let latitude = series.iter().map(|r| r.latitude).sum::<f64>() / n;
            let longitude = series.iter().map(|r| r.longitude).sum::<f64>() / n;
            let last_observed = series[series.len() - 1].period;

            let mut window = series[series.len() - self.context_length..]
                .iter()
                .map(|r| r.features())
                .collect::<VecDeque<_>>();

            for months_ahead in 1..=self.months_ahead {
                let period = last_observed.add_months(months_ahead);
                let sequence =
                    Array2::from_shape_fn((window.len(), FEATURES), |(t, f)| window[t][f]);
                let count_prediction = network.predict(sequence.view()).exp_m1().max(0.0);

                forecasts.push(Forecast {
                    species: species.clone(),
                    period,
                    grid_latitude: self.grid.latitude(&cell),
                    grid_longitude: self.grid.longitude(&cell),
                    latitude,
                    longitude,
                    count_prediction,
                    range_shift: estimator.estimate(&cell, period),
                    months_ahead,
                    prediction_type: PredictionType::Future,
                    model_version: self.model_version.clone(),
                    generated_at,
                });

                window.pop_front();
                window.push_back(synthetic_features(
                    count_prediction,
                    period,
                    latitude,
                    longitude,
                ));
            }
        }

        forecasts
    }
}

fn synthetic_features(
    count: f64,
    period: YearMonth,
    latitude: f64,
    longitude: f64,
) -> [f64; FEATURES] {
    let (month_sin, month_cos) = period.cyclical_encoding();
    feature_vector(count, month_sin, month_cos, latitude, longitude)
}

/// Replaces every stored forecast of the species with `forecasts` in a single store operation.
#[instrument(skip_all, fields(app.species = %species))]
pub async fn replace_forecasts<S>(
    store: &S,
    species: &ScientificName,
    forecasts: Vec<Forecast>,
) -> Result<usize>
where
    S: ForecastInbound + ?Sized,
{
    let inserted = forecasts.len();
    let removed = store
        .replace_forecasts(species, forecasts)
        .await
        .context(StoreSnafu)?;

    event!(Level::INFO, removed, inserted, "replaced stored forecasts");

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelConfig, SeasonalNoise};
    use rand::{rngs::StdRng, SeedableRng};

    fn rows(cell: GridCell, months: u32) -> Vec<MonthlyAggregate> {
        let start = YearMonth::new(2023, 1).unwrap();
        (0..months)
            .map(|offset| {
                let period = start.add_months(offset);
                let (month_sin, month_cos) = period.cyclical_encoding();
                MonthlyAggregate {
                    cell,
                    period,
                    count: 4.0,
                    count_original: 4.0,
                    latitude: 35.1,
                    longitude: -80.9,
                    month_sin,
                    month_cos,
                    observations: 1,
                }
            })
            .collect()
    }

    fn network(seed: u64) -> ForecastNetwork {
        ForecastNetwork::new(
            ModelConfig {
                hidden_size: 4,
                num_layers: 2,
                head_sizes: vec![3],
                ..Default::default()
            },
            &mut StdRng::seed_from_u64(seed),
        )
    }

    fn generator(months_ahead: u32) -> ForecastGenerator {
        ForecastGenerator::new(Grid::new(0.5).unwrap(), 12, months_ahead, "v1.0".into())
    }

    #[test]
    fn test_forecasts_cover_each_eligible_cell_and_month() {
        let eligible = GridCell {
            lat_index: 70,
            lon_index: -162,
        };
        let short = GridCell {
            lat_index: 90,
            lon_index: -150,
        };
        let mut all = rows(eligible, 14);
        all.extend(rows(short, 8));

        let forecasts = generator(24).generate(
            &"Cardinalis cardinalis".into(),
            &network(1),
            &all,
            &mut SeasonalNoise::new(Some(1)),
            Utc::now(),
        );

        assert_eq!(forecasts.len(), 24);
        assert_eq!(forecasts[0].period, YearMonth::new(2024, 3).unwrap());
        assert_eq!(forecasts[0].months_ahead, 1);
        assert_eq!(forecasts[23].period, YearMonth::new(2026, 2).unwrap());
        assert_eq!(forecasts[23].months_ahead, 24);
        assert!(forecasts.iter().all(|f| f.grid_latitude == 35.0));
        assert!(forecasts.iter().all(|f| f.grid_longitude == -81.0));
        assert!(forecasts.iter().all(|f| (f.latitude - 35.1).abs() < 1e-9));
        assert!(forecasts.iter().all(|f| f.model_version == "v1.0"));
    }

    #[test]
    fn test_predicted_counts_are_never_negative() {
        let cell = GridCell {
            lat_index: 70,
            lon_index: -162,
        };
        for seed in 0..20 {
            let mut network = network(seed);
            if let Some(output) = network.head.last_mut() {
                output.bias.fill(-25.0);
            }
            let forecasts = generator(6).generate(
                &"Cardinalis cardinalis".into(),
                &network,
                &rows(cell, 12),
                &mut SeasonalNoise::new(Some(seed)),
                Utc::now(),
            );
            assert_eq!(forecasts.len(), 6);
            assert!(forecasts.iter().all(|f| f.count_prediction >= 0.0));
        }
    }
}
