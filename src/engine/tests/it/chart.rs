use crate::helper::*;
use avicast_core::{Forecast, ForecastInbound, ScientificName, YearMonth};
use engine::{forecast_chart_for_years, round_to};

#[tokio::test]
async fn test_chart_of_species_without_forecasts_is_empty() {
    test(|helper| async move {
        let points =
            forecast_chart_for_years(&helper.store, &ScientificName::new("Strix varia"), 2024, 2030)
                .await
                .unwrap();
        assert!(points.is_empty());
    })
    .await;
}

#[tokio::test]
async fn test_chart_averages_cells_per_month_within_range() {
    test(|helper| async move {
        let species = ScientificName::new("Cardinalis cardinalis");
        let forecast = |year, month, count| Forecast {
            period: YearMonth::new(year, month).unwrap(),
            count_prediction: count,
            ..Forecast::test_default()
        };
        helper
            .store
            .add_forecasts(vec![
                forecast(2023, 12, 100.0),
                forecast(2024, 1, 1.0),
                forecast(2024, 1, 2.0),
                forecast(2024, 2, 10.0 / 3.0),
                forecast(2031, 1, 100.0),
            ])
            .await
            .unwrap();

        let points = forecast_chart_for_years(&helper.store, &species, 2024, 2030)
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!((points[0].year, points[0].month), (2024, 1));
        assert_eq!(points[0].count_prediction, 1.5);
        assert_eq!((points[1].year, points[1].month), (2024, 2));
        assert_eq!(points[1].count_prediction, round_to(10.0 / 3.0, 2));
    })
    .await;
}
