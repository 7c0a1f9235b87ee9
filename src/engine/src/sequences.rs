use crate::MonthlyAggregate;
use avicast_core::{GridCell, YearMonth};
use ndarray::Array2;
use std::collections::BTreeMap;

/// Width of the per-month feature vector.
pub const FEATURES: usize = 5;

/// `[log1p(count), month sin, month cos, latitude / 90, longitude / 180]`
pub fn feature_vector(
    count: f64,
    month_sin: f64,
    month_cos: f64,
    latitude: f64,
    longitude: f64,
) -> [f64; FEATURES] {
    [
        count.ln_1p(),
        month_sin,
        month_cos,
        latitude / 90.0,
        longitude / 180.0,
    ]
}

impl MonthlyAggregate {
    pub fn features(&self) -> [f64; FEATURES] {
        feature_vector(
            self.count,
            self.month_sin,
            self.month_cos,
            self.latitude,
            self.longitude,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExampleMeta {
    /// Position of the window's first month.
    pub latitude: f64,
    pub longitude: f64,
    pub target_period: YearMonth,
    pub cell: GridCell,
}

#[derive(Debug, Clone)]
pub struct SequenceExample {
    /// `(sequence length, FEATURES)`
    pub features: Array2<f64>,
    /// `log1p` of the target month's count.
    pub target: f64,
    pub meta: ExampleMeta,
}

#[derive(Debug, Clone, Copy)]
pub struct SequenceBuilder {
    sequence_length: usize,
    horizon: usize,
}

impl SequenceBuilder {
    pub fn new(sequence_length: usize, horizon: usize) -> Self {
        Self {
            sequence_length,
            horizon,
        }
    }

    /// Slides a window over each cell's months in chronological order. A cell with `M` rows
    /// yields `max(0, M - sequence_length - horizon + 1)` examples, missing months are not
    /// filled in.
    pub fn build(&self, rows: &[MonthlyAggregate]) -> Vec<SequenceExample> {
        let mut cells: BTreeMap<GridCell, Vec<&MonthlyAggregate>> = BTreeMap::new();
        for row in rows {
            cells.entry(row.cell).or_default().push(row);
        }

        let window = self.sequence_length + self.horizon;
        let mut examples = Vec::new();

        for (cell, mut series) in cells {
            series.sort_by_key(|r| r.period);
            if self.sequence_length == 0 || self.horizon == 0 || series.len() < window {
                continue;
            }

            let features = series.iter().map(|r| r.features()).collect::<Vec<_>>();
            for start in 0..=(series.len() - window) {
                let first = series[start];
                let target = series[start + window - 1];
                examples.push(SequenceExample {
                    features: Array2::from_shape_fn(
                        (self.sequence_length, FEATURES),
                        |(t, f)| features[start + t][f],
                    ),
                    target: target.count.ln_1p(),
                    meta: ExampleMeta {
                        latitude: first.latitude,
                        longitude: first.longitude,
                        target_period: target.period,
                        cell,
                    },
                });
            }
        }

        examples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(cell: GridCell, start: YearMonth, counts: &[f64]) -> Vec<MonthlyAggregate> {
        counts
            .iter()
            .enumerate()
            .map(|(offset, &count)| {
                let period = start.add_months(offset as u32);
                let (month_sin, month_cos) = period.cyclical_encoding();
                MonthlyAggregate {
                    cell,
                    period,
                    count,
                    count_original: count,
                    latitude: 35.0,
                    longitude: -81.0,
                    month_sin,
                    month_cos,
                    observations: 1,
                }
            })
            .collect()
    }

    fn cell(lat_index: i32) -> GridCell {
        GridCell {
            lat_index,
            lon_index: -162,
        }
    }

    #[test]
    fn test_example_count_per_cell() {
        let start = YearMonth::new(2022, 1).unwrap();
        for (months, horizon, expected) in [(11, 1, 0), (12, 1, 0), (13, 1, 1), (24, 1, 12), (24, 3, 10)] {
            let rows = rows(cell(70), start, &vec![5.0; months]);
            let examples = SequenceBuilder::new(12, horizon).build(&rows);
            assert_eq!(examples.len(), expected, "months {months}, horizon {horizon}");
        }
    }

    #[test]
    fn test_cells_are_windowed_independently() {
        let start = YearMonth::new(2022, 1).unwrap();
        let mut all = rows(cell(70), start, &[1.0; 14]);
        all.extend(rows(cell(80), start, &[2.0; 13]));

        let examples = SequenceBuilder::new(12, 1).build(&all);
        assert_eq!(examples.len(), 3);
        assert_eq!(examples.iter().filter(|e| e.meta.cell == cell(80)).count(), 1);
    }

    #[test]
    fn test_constant_series_yields_single_example_with_log_target() {
        let start = YearMonth::new(2023, 1).unwrap();
        let examples = SequenceBuilder::new(12, 1).build(&rows(cell(70), start, &[10.0; 13]));

        assert_eq!(examples.len(), 1);
        let example = &examples[0];
        assert!((example.target - 10f64.ln_1p()).abs() < 1e-12);
        assert_eq!(example.features.dim(), (12, FEATURES));
        assert_eq!(example.meta.target_period, YearMonth::new(2024, 1).unwrap());
        assert!((example.features[[0, 0]] - 10f64.ln_1p()).abs() < 1e-12);
        assert!((example.features[[0, 3]] - 35.0 / 90.0).abs() < 1e-12);
        assert!((example.features[[0, 4]] + 81.0 / 180.0).abs() < 1e-12);
    }

    #[test]
    fn test_target_uses_horizon_offset() {
        let start = YearMonth::new(2023, 1).unwrap();
        let counts = (0..15).map(|c| c as f64).collect::<Vec<_>>();
        let examples = SequenceBuilder::new(12, 3).build(&rows(cell(70), start, &counts));

        assert_eq!(examples.len(), 1);
        assert!((examples[0].target - 14f64.ln_1p()).abs() < 1e-12);
        assert_eq!(examples[0].features.nrows(), 12);
    }

    #[test]
    fn test_example_position_is_taken_from_window_start() {
        let start = YearMonth::new(2023, 1).unwrap();
        let mut series = rows(cell(70), start, &[3.0; 14]);
        for (offset, row) in series.iter_mut().enumerate() {
            row.latitude = 35.0 + offset as f64 * 0.01;
            row.longitude = -81.0 - offset as f64 * 0.01;
        }

        let examples = SequenceBuilder::new(12, 1).build(&series);

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].meta.latitude, series[0].latitude);
        assert_eq!(examples[1].meta.latitude, series[1].latitude);
        assert_eq!(examples[1].meta.longitude, series[1].longitude);
    }

    #[test]
    fn test_log_count_round_trips() {
        for value in [0.0, 1e-9, 0.5, 1.0, 10.0, 1234.5, 1e9] {
            let restored = f64::ln_1p(value).exp_m1();
            assert!((restored - value).abs() <= 1e-9 * value.max(1.0));
        }
    }
}
