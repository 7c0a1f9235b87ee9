use crate::error::error::{InvalidConfigSnafu, JoinSnafu, NoSequencesSnafu, StoreSnafu};
use crate::{
    Aggregator, Database, ForecastGenerator, ModelArtifact, ModelConfig, ModelMetrics,
    ModelStorage, Result, SeasonalNoise, SequenceBuilder, Trainer, TrainingConfig,
    TrainingReport, forecast_chart, replace_forecasts,
};
use avicast_core::{Grid, MonthRange, ScientificName};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use snafu::{Report, ResultExt, ensure};
use std::path::PathBuf;
use tracing::{error, event, instrument, Level};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Grid cell width in degrees.
    pub grid_size: f64,
    pub sequence_length: usize,
    pub prediction_horizon: usize,
    pub min_coverage_months: usize,
    pub clip_percentile: f64,
    /// Only observations from these years are used, all years if empty.
    pub observation_years: Vec<i32>,
    pub forecast_start_year: i32,
    pub forecast_end_year: i32,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub model_dir: PathBuf,
    pub model_version: String,
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grid_size: 0.5,
            sequence_length: 12,
            prediction_horizon: 1,
            min_coverage_months: 12,
            clip_percentile: 99.0,
            observation_years: vec![],
            forecast_start_year: 2024,
            forecast_end_year: 2030,
            model: ModelConfig::default(),
            training: TrainingConfig::default(),
            model_dir: PathBuf::from("models"),
            model_version: "v1.0".into(),
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// `(end - start + 1) * 12`
    pub fn months_ahead(&self) -> u32 {
        ((self.forecast_end_year - self.forecast_start_year + 1).max(0) * 12) as u32
    }

    pub fn forecast_range(&self) -> Result<MonthRange> {
        MonthRange::years(self.forecast_start_year, self.forecast_end_year).map_err(|e| {
            InvalidConfigSnafu {
                reason: e.to_string(),
            }
            .build()
        })
    }

    pub fn grid(&self) -> Result<Grid> {
        Grid::new(self.grid_size).map_err(|e| {
            InvalidConfigSnafu {
                reason: e.to_string(),
            }
            .build()
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.grid()?;
        self.forecast_range()?;

        let checks = [
            (self.sequence_length > 0, "sequence_length must be positive"),
            (self.prediction_horizon > 0, "prediction_horizon must be positive"),
            (
                (0.0..=100.0).contains(&self.clip_percentile),
                "clip_percentile must be within 0..=100",
            ),
            (self.model.num_layers > 0, "model.num_layers must be positive"),
            (self.model.hidden_size > 0, "model.hidden_size must be positive"),
            (
                self.model.input_size == crate::FEATURES,
                "model.input_size must match the feature vector width",
            ),
            (
                (0.0..1.0).contains(&self.model.dropout),
                "model.dropout must be within 0..1",
            ),
            (self.training.batch_size > 0, "training.batch_size must be positive"),
            (
                self.training.learning_rate > 0.0,
                "training.learning_rate must be positive",
            ),
            (
                self.training.train_fraction > 0.0 && self.training.train_fraction <= 1.0,
                "training.train_fraction must be within (0, 1]",
            ),
        ];
        for (valid, reason) in checks {
            ensure!(valid, InvalidConfigSnafu { reason });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesReport {
    pub species: ScientificName,
    pub predictions_generated: usize,
    pub metrics: ModelMetrics,
    pub model_path: PathBuf,
    pub training: TrainingReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpeciesOutcome {
    Success(SpeciesReport),
    Failure { error: String },
}

impl SpeciesOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SpeciesOutcome::Success(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<(ScientificName, SpeciesOutcome)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn outcome(&self, species: &ScientificName) -> Option<&SpeciesOutcome> {
        self.outcomes
            .iter()
            .find(|(s, _)| s == species)
            .map(|(_, o)| o)
    }
}

/// Observations to stored forecasts for one species at a time.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    aggregator: Aggregator,
    sequences: SequenceBuilder,
    trainer: Trainer,
    generator: ForecastGenerator,
    storage: ModelStorage,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let grid = config.grid()?;

        Ok(Self {
            aggregator: Aggregator::new(
                grid,
                config.clip_percentile,
                config.min_coverage_months,
                config.observation_years.clone(),
            ),
            sequences: SequenceBuilder::new(config.sequence_length, config.prediction_horizon),
            trainer: Trainer::new(config.model.clone(), config.training.clone(), config.seed),
            generator: ForecastGenerator::new(
                grid,
                config.sequence_length,
                config.months_ahead(),
                config.model_version.clone(),
            ),
            storage: ModelStorage::new(config.model_dir.clone()),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model_storage(&self) -> &ModelStorage {
        &self.storage
    }

    /// Retrains the species' model and replaces its stored forecasts. Any error aborts the run
    /// and leaves previously stored forecasts untouched.
    #[instrument(skip_all, fields(app.species = %species))]
    pub async fn run_species<S: Database>(
        &self,
        store: &S,
        species: &ScientificName,
    ) -> Result<SpeciesReport> {
        let observations = store.observations(species).await.context(StoreSnafu)?;
        event!(
            Level::INFO,
            observations = observations.len(),
            "loaded observations"
        );

        let aggregation = self.aggregator.aggregate(species, &observations)?;
        event!(
            Level::INFO,
            rows = aggregation.rows.len(),
            cells = aggregation.summary.cells_kept,
            clip_ceiling = aggregation.summary.clip_ceiling,
            "aggregated observations"
        );

        let examples = self.sequences.build(&aggregation.rows);
        ensure!(
            !examples.is_empty(),
            NoSequencesSnafu {
                species: species.as_str(),
            }
        );
        event!(Level::INFO, examples = examples.len(), "built sequences");

        let trainer = self.trainer.clone();
        let generator = self.generator.clone();
        let seed = self.config.seed;
        let rows = aggregation.rows;
        let task_species = species.clone();
        let generated_at = Utc::now();

        let (model, forecasts) = tokio::task::spawn_blocking(move || -> Result<_> {
            let model = trainer.train(&task_species, &examples)?;
            let mut estimator = SeasonalNoise::new(seed);
            let forecasts = generator.generate(
                &task_species,
                &model.network,
                &rows,
                &mut estimator,
                generated_at,
            );
            Ok((model, forecasts))
        })
        .await
        .context(JoinSnafu)??;

        let predictions_generated = replace_forecasts(store, species, forecasts).await?;

        let model_path = self
            .storage
            .save(&ModelArtifact {
                species: species.clone(),
                model_version: self.config.model_version.clone(),
                trained_at: generated_at,
                metrics: model.report.metrics,
                network: model.network,
            })
            .await?;

        Ok(SpeciesReport {
            species: species.clone(),
            predictions_generated,
            metrics: model.report.metrics,
            model_path,
            training: model.report,
        })
    }

    /// Runs every species in order, a failing species does not stop the others.
    pub async fn run_all<S: Database>(&self, store: &S, species: &[ScientificName]) -> BatchReport {
        let mut report = BatchReport::default();

        for s in species {
            let outcome = match self.run_species(store, s).await {
                Ok(species_report) => {
                    self.log_chart_sample(store, s).await;
                    SpeciesOutcome::Success(species_report)
                }
                Err(e) => {
                    error!("failed to run forecast pipeline for species: {s}, err: {e:?}");
                    SpeciesOutcome::Failure {
                        error: Report::from_error(&e).to_string(),
                    }
                }
            };
            report.outcomes.push((s.clone(), outcome));
        }

        event!(
            Level::INFO,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "finished forecast batch"
        );

        report
    }

    async fn log_chart_sample<S: Database>(&self, store: &S, species: &ScientificName) {
        let range = match self.config.forecast_range() {
            Ok(range) => range,
            Err(e) => {
                error!("invalid forecast range: {e:?}");
                return;
            }
        };
        match forecast_chart(store, species, range).await {
            Ok(points) => match points.first() {
                Some(first) => event!(
                    Level::INFO,
                    months = points.len(),
                    year = first.year,
                    month = first.month,
                    count_prediction = first.count_prediction,
                    "forecast chart sample for {species}"
                ),
                None => event!(
                    Level::INFO,
                    "no forecasts within the configured range for {species}"
                ),
            },
            Err(e) => error!("failed to query forecast chart for species: {species}, err: {e:?}"),
        }
    }
}
