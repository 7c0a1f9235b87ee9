use avicast_core::{Observation, ScientificName, TestStore, YearMonth};
use engine::{ModelConfig, Pipeline, PipelineConfig, TrainingConfig};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Once;
use tracing_subscriber::FmtSubscriber;

static TRACING: Once = Once::new();

pub struct TestHelper {
    pub store: TestStore,
    pub config: PipelineConfig,
}

impl TestHelper {
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config.clone()).unwrap()
    }

    pub fn model_dir(&self) -> &PathBuf {
        &self.config.model_dir
    }

    /// Adds `months` monthly observations with a constant count at a single location.
    pub async fn add_constant_series(
        &self,
        species: &ScientificName,
        start: YearMonth,
        months: u32,
        count: u32,
    ) {
        self.store
            .add_observations(Observation::monthly_series(
                species, 35.2, -80.8, start, months, count,
            ))
            .await;
    }
}

/// A single small LSTM layer without dropout and a higher learning rate. The default network
/// does not fit a short constant series within the default epoch budget, its first forecast
/// lands anywhere between 5 and 9 for a constant count of 10 depending on the seed.
pub fn test_config(model_dir: PathBuf) -> PipelineConfig {
    PipelineConfig {
        grid_size: 0.5,
        sequence_length: 12,
        prediction_horizon: 1,
        min_coverage_months: 12,
        clip_percentile: 99.0,
        observation_years: vec![],
        forecast_start_year: 2024,
        forecast_end_year: 2024,
        model: ModelConfig {
            hidden_size: 8,
            num_layers: 1,
            head_sizes: vec![],
            dropout: 0.0,
            ..Default::default()
        },
        training: TrainingConfig {
            epochs: 400,
            batch_size: 8,
            learning_rate: 0.01,
            ..Default::default()
        },
        model_dir,
        model_version: "test".into(),
        seed: Some(42),
    }
}

pub async fn test<T, Fut>(test: T)
where
    T: FnOnce(TestHelper) -> Fut,
    Fut: Future<Output = ()>,
{
    TRACING.call_once(|| {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder()
                .with_max_level(tracing::Level::INFO)
                .finish(),
        )
        .unwrap();
    });

    let model_dir = std::env::temp_dir().join(format!("avicast-test-{}", rand::random::<u64>()));

    let helper = TestHelper {
        store: TestStore::new(),
        config: test_config(model_dir.clone()),
    };

    test(helper).await;

    let _ = tokio::fs::remove_dir_all(&model_dir).await;
}
