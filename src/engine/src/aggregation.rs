use crate::error::error::NoObservationsSnafu;
use crate::Result;
use avicast_core::{Grid, GridCell, Observation, ScientificName, YearMonth};
use itertools::Itertools;
use snafu::ensure;
use std::collections::BTreeMap;
use tracing::{event, Level};

/// Observations of one grid cell during one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAggregate {
    pub cell: GridCell,
    pub period: YearMonth,
    /// Summed count, clipped at the species ceiling.
    pub count: f64,
    /// Summed count before clipping.
    pub count_original: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub month_sin: f64,
    pub month_cos: f64,
    pub observations: usize,
}

/// Distribution of the individual observation counts, before any grouping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountStatistics {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSummary {
    pub observations: usize,
    /// Number of `(cell, month)` groups before coverage filtering.
    pub groups: usize,
    pub cells_kept: usize,
    pub cells_dropped: usize,
    pub clip_ceiling: f64,
    pub statistics: CountStatistics,
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub rows: Vec<MonthlyAggregate>,
    pub summary: AggregationSummary,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    grid: Grid,
    clip_percentile: f64,
    min_coverage_months: usize,
    observation_years: Vec<i32>,
}

#[derive(Default)]
struct Accumulator {
    count: f64,
    latitude: f64,
    longitude: f64,
    observations: usize,
}

impl Aggregator {
    pub fn new(
        grid: Grid,
        clip_percentile: f64,
        min_coverage_months: usize,
        observation_years: Vec<i32>,
    ) -> Self {
        Self {
            grid,
            clip_percentile,
            min_coverage_months,
            observation_years,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Buckets the observations into `(cell, month)` rows sorted by cell and month, dropping
    /// cells with fewer than the configured number of distinct months.
    pub fn aggregate(
        &self,
        species: &ScientificName,
        observations: &[Observation],
    ) -> Result<Aggregation> {
        let observations = observations
            .iter()
            .filter(|o| {
                self.observation_years.is_empty() || self.observation_years.contains(&o.year())
            })
            .collect_vec();

        ensure!(
            !observations.is_empty(),
            NoObservationsSnafu {
                species: species.as_str(),
            }
        );

        let mut groups: BTreeMap<(GridCell, YearMonth), Accumulator> = BTreeMap::new();
        for o in &observations {
            let key = (self.grid.cell(o.latitude, o.longitude), o.period());
            let group = groups.entry(key).or_default();
            group.count += o.count as f64;
            group.latitude += o.latitude;
            group.longitude += o.longitude;
            group.observations += 1;
        }

        let counts = observations.iter().map(|o| o.count as f64).collect_vec();
        let statistics = CountStatistics::new(&counts);

        let totals = groups.values().map(|g| g.count).collect_vec();
        let ceiling = percentile(&totals, self.clip_percentile);

        event!(
            Level::DEBUG,
            mean = statistics.mean,
            median = statistics.median,
            max = statistics.max,
            p95 = statistics.p95,
            p99 = statistics.p99,
            ceiling,
            "observation count distribution"
        );

        let group_count = groups.len();
        let mut rows = groups
            .into_iter()
            .map(|((cell, period), group)| {
                let n = group.observations as f64;
                let (month_sin, month_cos) = period.cyclical_encoding();
                MonthlyAggregate {
                    cell,
                    period,
                    count: group.count,
                    count_original: group.count,
                    latitude: group.latitude / n,
                    longitude: group.longitude / n,
                    month_sin,
                    month_cos,
                    observations: group.observations,
                }
            })
            .collect_vec();

        clip_counts(&mut rows, ceiling);

        let coverage = rows.iter().counts_by(|r| r.cell);
        let cells_kept = coverage
            .values()
            .filter(|months| **months >= self.min_coverage_months)
            .count();
        let cells_dropped = coverage.len() - cells_kept;
        rows.retain(|r| coverage[&r.cell] >= self.min_coverage_months);

        if cells_dropped > 0 {
            event!(
                Level::DEBUG,
                cells_dropped,
                min_coverage_months = self.min_coverage_months,
                "dropped grid cells with insufficient history"
            );
        }

        Ok(Aggregation {
            rows,
            summary: AggregationSummary {
                observations: observations.len(),
                groups: group_count,
                cells_kept,
                cells_dropped,
                clip_ceiling: ceiling,
                statistics,
            },
        })
    }
}

/// Caps every row's count at `ceiling`, the unclipped sum stays in `count_original`.
pub fn clip_counts(rows: &mut [MonthlyAggregate], ceiling: f64) {
    for row in rows {
        row.count = row.count.min(ceiling);
    }
}

/// Percentile `q` (0..=100) with linear interpolation between the closest ranks.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let sorted = values.iter().copied().sorted_by(f64::total_cmp).collect_vec();
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

impl CountStatistics {
    fn new(values: &[f64]) -> Self {
        let mean = if values.is_empty() {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        Self {
            mean,
            median: percentile(values, 50.0),
            max: values.iter().copied().fold(f64::NAN, f64::max),
            p95: percentile(values, 95.0),
            p99: percentile(values, 99.0),
        }
    }
}
