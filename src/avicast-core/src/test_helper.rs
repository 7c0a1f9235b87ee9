use crate::*;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Record based in-memory storage implementing every port.
#[derive(Debug, Default)]
pub struct TestStore {
    observations: RwLock<Vec<Observation>>,
    tracked_species: RwLock<Vec<ScientificName>>,
    forecasts: RwLock<Vec<Forecast>>,
    fail_forecast_writes: AtomicBool,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_observations(&self, observations: Vec<Observation>) {
        self.observations.write().await.extend(observations);
    }

    pub async fn track_species(&self, species: ScientificName) {
        self.tracked_species.write().await.push(species);
    }

    pub async fn all_forecasts(&self) -> Vec<Forecast> {
        self.forecasts.read().await.clone()
    }

    /// Makes every following forecast insert fail, deletes still succeed.
    pub fn fail_forecast_writes(&self, fail: bool) {
        self.fail_forecast_writes.store(fail, Ordering::SeqCst);
    }

    fn check_forecast_writes(&self) -> Result<()> {
        if self.fail_forecast_writes.load(Ordering::SeqCst) {
            Err(Error::storage(std::io::Error::other(
                "forecast writes are disabled",
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObservationOutbound for TestStore {
    async fn observations(&self, species: &ScientificName) -> Result<Vec<Observation>> {
        let mut observations: Vec<Observation> = self
            .observations
            .read()
            .await
            .iter()
            .filter(|o| species.matches(o.species.as_str()))
            .cloned()
            .collect();
        observations.sort_by_key(|o| o.date);
        Ok(observations)
    }

    async fn tracked_species(&self) -> Result<Vec<ScientificName>> {
        Ok(self.tracked_species.read().await.clone())
    }
}

#[async_trait]
impl ForecastInbound for TestStore {
    async fn delete_forecasts(&self, species: &ScientificName) -> Result<u64> {
        let mut forecasts = self.forecasts.write().await;
        let before = forecasts.len();
        forecasts.retain(|f| !species.matches(f.species.as_str()));
        Ok((before - forecasts.len()) as u64)
    }

    async fn add_forecasts(&self, forecasts: Vec<Forecast>) -> Result<()> {
        self.check_forecast_writes()?;
        self.forecasts.write().await.extend(forecasts);
        Ok(())
    }

    async fn replace_forecasts(
        &self,
        species: &ScientificName,
        forecasts: Vec<Forecast>,
    ) -> Result<u64> {
        let mut stored = self.forecasts.write().await;
        self.check_forecast_writes()?;

        let before = stored.len();
        stored.retain(|f| !species.matches(f.species.as_str()));
        let removed = (before - stored.len()) as u64;
        stored.extend(forecasts);
        Ok(removed)
    }
}

#[async_trait]
impl ForecastOutbound for TestStore {
    async fn forecasts(
        &self,
        species: &ScientificName,
        range: Option<MonthRange>,
    ) -> Result<Vec<Forecast>> {
        let mut forecasts: Vec<Forecast> = self
            .forecasts
            .read()
            .await
            .iter()
            .filter(|f| {
                species.matches(f.species.as_str())
                    && range.is_none_or(|r| r.contains(&f.period))
            })
            .cloned()
            .collect();
        forecasts.sort_by_key(|f| f.period);
        Ok(forecasts)
    }

    async fn forecasted_species(&self) -> Result<Vec<ScientificName>> {
        let mut species: Vec<ScientificName> = self
            .forecasts
            .read()
            .await
            .iter()
            .map(|f| f.species.clone())
            .collect();
        species.sort();
        species.dedup();
        Ok(species)
    }
}

impl Observation {
    pub fn test_default() -> Self {
        Self {
            species: ScientificName::new("Cardinalis cardinalis"),
            date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
            latitude: 35.2,
            longitude: -80.8,
            count: 1,
        }
    }

    /// One observation on the 15th of each month starting at `start`, all with the same count.
    pub fn monthly_series(
        species: &ScientificName,
        latitude: f64,
        longitude: f64,
        start: YearMonth,
        months: u32,
        count: u32,
    ) -> Vec<Self> {
        (0..months)
            .map(|offset| {
                let period = start.add_months(offset);
                Self {
                    species: species.clone(),
                    date: NaiveDate::from_ymd_opt(period.year(), period.month(), 15).unwrap(),
                    latitude,
                    longitude,
                    count,
                }
            })
            .collect()
    }
}

impl Forecast {
    pub fn test_default() -> Self {
        Self {
            species: ScientificName::new("Cardinalis cardinalis"),
            period: YearMonth::new(2024, 1).unwrap(),
            grid_latitude: 35.0,
            grid_longitude: -81.0,
            latitude: 35.2,
            longitude: -80.8,
            count_prediction: 10.0,
            range_shift: RangeShift::default(),
            months_ahead: 1,
            prediction_type: PredictionType::Future,
            model_version: "v1.0".into(),
            generated_at: Utc::now(),
        }
    }
}
