use crate::error::error::NoSequencesSnafu;
use crate::{Adam, ForecastNetwork, ModelConfig, PlateauScheduler, Result, SequenceExample};
use avicast_core::ScientificName;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use strum::{AsRefStr, EnumString};
use tracing::{event, Level};

/// How examples are divided between training and evaluation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SplitStrategy {
    /// Shuffled indices, evaluation months may interleave with training months of other cells.
    #[default]
    Random,
    /// The latest target months are held out.
    Chronological,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub train_fraction: f64,
    pub plateau_patience: usize,
    pub plateau_factor: f64,
    pub split: SplitStrategy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            learning_rate: 0.001,
            train_fraction: 0.8,
            plateau_patience: 10,
            plateau_factor: 0.5,
            split: SplitStrategy::Random,
        }
    }
}

/// Errors in raw count units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub train_mae: f64,
    pub test_mae: f64,
    /// Percentage error with `actual + 1` as denominator.
    pub test_mape: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub metrics: ModelMetrics,
    pub train_losses: Vec<f64>,
    pub test_losses: Vec<f64>,
    pub train_size: usize,
    pub test_size: usize,
    pub final_learning_rate: f64,
}

#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub network: ForecastNetwork,
    pub report: TrainingReport,
}

#[derive(Debug, Clone)]
pub struct Trainer {
    model: ModelConfig,
    config: TrainingConfig,
    seed: Option<u64>,
}

impl Trainer {
    pub fn new(model: ModelConfig, config: TrainingConfig, seed: Option<u64>) -> Self {
        Self {
            model,
            config,
            seed,
        }
    }

    /// Trains a fresh network for the full epoch budget.
    pub fn train(
        &self,
        species: &ScientificName,
        examples: &[SequenceExample],
    ) -> Result<TrainedModel> {
        ensure!(
            !examples.is_empty(),
            NoSequencesSnafu {
                species: species.as_str(),
            }
        );

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let (train, test) = self.split(examples, &mut rng);
        let holdout = if test.is_empty() {
            event!(
                Level::WARN,
                examples = examples.len(),
                "too few examples for a holdout set, evaluating on the training set"
            );
            &train
        } else {
            &test
        };

        let mut network = ForecastNetwork::new(self.model.clone(), &mut rng);
        let mut optimizer = Adam::new(&network, self.config.learning_rate);
        let mut scheduler =
            PlateauScheduler::new(self.config.plateau_factor, self.config.plateau_patience);

        let mut train_losses = Vec::with_capacity(self.config.epochs);
        let mut test_losses = Vec::with_capacity(self.config.epochs);
        let batch_size = self.config.batch_size.max(1);

        for epoch in 0..self.config.epochs {
            let mut epoch_loss = 0.0;
            for batch in train.chunks(batch_size) {
                let loss = train_batch(&mut network, batch, &mut optimizer, &mut rng);
                epoch_loss += loss * batch.len() as f64;
            }
            let train_loss = epoch_loss / train.len() as f64;
            let test_loss = mean_squared_error(&network, holdout);

            if scheduler.step(test_loss, &mut optimizer) {
                event!(
                    Level::DEBUG,
                    epoch,
                    learning_rate = optimizer.learning_rate(),
                    "reduced learning rate"
                );
            }
            if (epoch + 1) % 10 == 0 {
                event!(Level::DEBUG, epoch = epoch + 1, train_loss, test_loss);
            }

            train_losses.push(train_loss);
            test_losses.push(test_loss);
        }

        let (train_mae, _) = count_errors(&network, &train);
        let (test_mae, test_mape) = count_errors(&network, holdout);
        let metrics = ModelMetrics {
            train_mae,
            test_mae,
            test_mape,
        };

        event!(
            Level::INFO,
            train_mae,
            test_mae,
            test_mape,
            train_size = train.len(),
            test_size = test.len(),
            "finished training"
        );

        Ok(TrainedModel {
            network,
            report: TrainingReport {
                metrics,
                train_losses,
                test_losses,
                train_size: train.len(),
                test_size: test.len(),
                final_learning_rate: optimizer.learning_rate(),
            },
        })
    }

    fn split<'a>(
        &self,
        examples: &'a [SequenceExample],
        rng: &mut StdRng,
    ) -> (Vec<&'a SequenceExample>, Vec<&'a SequenceExample>) {
        let mut ordered = examples.iter().collect::<Vec<_>>();
        match self.config.split {
            SplitStrategy::Random => ordered.shuffle(rng),
            SplitStrategy::Chronological => ordered.sort_by_key(|e| e.meta.target_period),
        }
        let test = ordered.split_off(train_size(examples.len(), self.config.train_fraction));
        (ordered, test)
    }
}

/// `floor(n * fraction)` kept within `1..=n` so at least one example is trained on.
pub fn train_size(examples: usize, fraction: f64) -> usize {
    if examples == 0 {
        return 0;
    }
    ((examples as f64 * fraction).floor() as usize).clamp(1, examples)
}

fn train_batch(
    network: &mut ForecastNetwork,
    batch: &[&SequenceExample],
    optimizer: &mut Adam,
    rng: &mut StdRng,
) -> f64 {
    let mut grads = network.zeros_like();
    let scale = 1.0 / batch.len() as f64;
    let mut loss = 0.0;

    for example in batch {
        let pass = network.forward_train(example.features.view(), rng);
        let error = pass.output() - example.target;
        loss += error * error * scale;
        network.backward(&pass, 2.0 * error * scale, &mut grads);
    }

    optimizer.step(network, &grads);
    loss
}

fn mean_squared_error(network: &ForecastNetwork, examples: &[&SequenceExample]) -> f64 {
    let total: f64 = examples
        .iter()
        .map(|e| (network.predict(e.features.view()) - e.target).powi(2))
        .sum();
    total / examples.len() as f64
}

/// Mean absolute error and mean percentage error after mapping back from log space.
fn count_errors(network: &ForecastNetwork, examples: &[&SequenceExample]) -> (f64, f64) {
    let (absolute, relative) = examples.iter().fold((0.0, 0.0), |(absolute, relative), e| {
        let predicted = network.predict(e.features.view()).exp_m1();
        let actual = e.target.exp_m1();
        let error = (predicted - actual).abs();
        (absolute + error, relative + error / (actual + 1.0))
    });
    let n = examples.len() as f64;
    (absolute / n, relative / n * 100.0)
}
