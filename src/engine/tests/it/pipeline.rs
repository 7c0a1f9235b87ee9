use crate::helper::*;
use avicast_core::{ForecastOutbound, PredictionType, ScientificName, YearMonth};
use engine::SpeciesOutcome;

fn cardinal() -> ScientificName {
    ScientificName::new("Cardinalis cardinalis")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_constant_series_forecasts_the_constant_count() {
    test(|helper| async move {
        let species = cardinal();
        helper
            .add_constant_series(&species, YearMonth::new(2022, 1).unwrap(), 36, 10)
            .await;

        let report = helper
            .pipeline()
            .run_species(&helper.store, &species)
            .await
            .unwrap();

        assert_eq!(report.training.train_size, 19);
        assert_eq!(report.training.test_size, 5);
        assert_eq!(report.predictions_generated, 12);
        assert!(report.metrics.train_mae < 1.0);

        let forecasts = helper.store.forecasts(&species, None).await.unwrap();
        assert_eq!(forecasts.len(), 12);
        assert_eq!(forecasts[0].period, YearMonth::new(2025, 1).unwrap());
        assert_eq!(forecasts[11].period, YearMonth::new(2025, 12).unwrap());

        let next_month = forecasts[0].count_prediction;
        assert!(
            (next_month - 10.0).abs() < 1.5,
            "next month forecast {next_month} is not close to 10"
        );
        for (i, f) in forecasts.iter().enumerate() {
            assert_eq!(f.months_ahead, i as u32 + 1);
            assert_eq!(f.prediction_type, PredictionType::Future);
            assert_eq!(f.model_version, "test");
            assert_eq!(f.grid_latitude, 35.0);
            assert_eq!(f.grid_longitude, -81.0);
            assert!(f.count_prediction.is_finite() && f.count_prediction >= 0.0);
        }
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_species_without_observations_fails_without_side_effects() {
    test(|helper| async move {
        let species = ScientificName::new("Strix varia");

        let result = helper
            .pipeline()
            .run_species(&helper.store, &species)
            .await;

        assert!(result.is_err());
        assert!(helper.store.all_forecasts().await.is_empty());
        assert!(!helper.pipeline().model_storage().path(&species).exists());
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_species_with_too_short_history_fails() {
    test(|helper| async move {
        let species = cardinal();
        helper
            .add_constant_series(&species, YearMonth::new(2022, 1).unwrap(), 12, 10)
            .await;

        let result = helper
            .pipeline()
            .run_species(&helper.store, &species)
            .await;

        assert!(result.is_err());
        assert!(helper.store.all_forecasts().await.is_empty());
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failing_species_does_not_stop_the_batch() {
    test(|helper| async move {
        let cardinal = cardinal();
        let owl = ScientificName::new("Strix varia");
        helper
            .add_constant_series(&cardinal, YearMonth::new(2022, 1).unwrap(), 14, 4)
            .await;

        let report = helper
            .pipeline()
            .run_all(&helper.store, &[owl.clone(), cardinal.clone()])
            .await;

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcome(&owl),
            Some(SpeciesOutcome::Failure { .. })
        ));
        assert!(report.outcome(&cardinal).unwrap().is_success());
        assert_eq!(
            helper.store.forecasted_species().await.unwrap(),
            vec![cardinal]
        );
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rerunning_a_species_replaces_its_forecasts() {
    test(|mut helper| async move {
        let species = cardinal();
        helper
            .add_constant_series(&species, YearMonth::new(2022, 1).unwrap(), 13, 10)
            .await;

        helper
            .pipeline()
            .run_species(&helper.store, &species)
            .await
            .unwrap();
        assert_eq!(helper.store.all_forecasts().await.len(), 12);

        helper.config.forecast_end_year = 2025;
        helper
            .pipeline()
            .run_species(&helper.store, &species)
            .await
            .unwrap();

        let forecasts = helper.store.all_forecasts().await;
        assert_eq!(forecasts.len(), 24);
        assert!(forecasts.iter().all(|f| f.months_ahead <= 24));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_trained_model_is_persisted_and_reloadable() {
    test(|helper| async move {
        let species = cardinal();
        helper
            .add_constant_series(&species, YearMonth::new(2022, 1).unwrap(), 13, 10)
            .await;

        let pipeline = helper.pipeline();
        let report = pipeline
            .run_species(&helper.store, &species)
            .await
            .unwrap();

        assert!(report.model_path.starts_with(helper.model_dir()));
        assert!(report.model_path.ends_with("Cardinalis_cardinalis_model.json"));

        let artifact = pipeline
            .model_storage()
            .load(&species)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(artifact.species, species);
        assert_eq!(artifact.model_version, "test");
        assert!((artifact.metrics.train_mae - report.metrics.train_mae).abs() < 1e-9);
        assert_eq!(artifact.network.config(), &helper.config.model);
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_same_seed_produces_identical_forecasts() {
    test(|helper| async move {
        let species = cardinal();
        helper
            .add_constant_series(&species, YearMonth::new(2021, 6).unwrap(), 20, 7)
            .await;

        let pipeline = helper.pipeline();
        pipeline
            .run_species(&helper.store, &species)
            .await
            .unwrap();
        let first = helper.store.forecasts(&species, None).await.unwrap();

        pipeline
            .run_species(&helper.store, &species)
            .await
            .unwrap();
        let second = helper.store.forecasts(&species, None).await.unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.period, b.period);
            assert_eq!(a.count_prediction, b.count_prediction);
            assert_eq!(a.range_shift, b.range_shift);
        }
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_example_is_evaluated_on_the_training_set() {
    test(|helper| async move {
        let species = cardinal();
        helper
            .add_constant_series(&species, YearMonth::new(2022, 1).unwrap(), 13, 10)
            .await;

        let report = helper
            .pipeline()
            .run_species(&helper.store, &species)
            .await
            .unwrap();

        assert_eq!(report.training.train_size, 1);
        assert_eq!(report.training.test_size, 0);
        assert_eq!(report.metrics.train_mae, report.metrics.test_mae);

        let forecasts = helper.store.forecasts(&species, None).await.unwrap();
        assert_eq!(forecasts[0].period, YearMonth::new(2023, 2).unwrap());
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_forecast_write_keeps_previous_forecasts() {
    test(|helper| async move {
        let species = cardinal();
        helper
            .add_constant_series(&species, YearMonth::new(2022, 1).unwrap(), 13, 10)
            .await;

        let pipeline = helper.pipeline();
        pipeline
            .run_species(&helper.store, &species)
            .await
            .unwrap();
        let before = helper.store.all_forecasts().await;
        assert_eq!(before.len(), 12);

        helper.store.fail_forecast_writes(true);
        let report = pipeline
            .run_all(&helper.store, std::slice::from_ref(&species))
            .await;

        assert_eq!(report.failed(), 1);
        match report.outcome(&species) {
            Some(SpeciesOutcome::Failure { error }) => {
                assert!(error.contains("forecast writes are disabled"), "{error}");
            }
            other => panic!("expected a failure, got {other:?}"),
        }
        assert_eq!(helper.store.all_forecasts().await, before);
    })
    .await;
}
