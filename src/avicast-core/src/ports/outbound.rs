use crate::*;
use async_trait::async_trait;

#[async_trait]
pub trait ObservationOutbound: Send + Sync {
    /// Observations of the species ordered by date, the name is matched case-insensitively.
    async fn observations(&self, species: &ScientificName) -> Result<Vec<Observation>>;
    /// Species the pipeline should produce forecasts for.
    async fn tracked_species(&self) -> Result<Vec<ScientificName>>;
}

#[async_trait]
pub trait ForecastOutbound: Send + Sync {
    /// Stored forecasts of the species ordered by period, restricted to `range` if given.
    async fn forecasts(
        &self,
        species: &ScientificName,
        range: Option<MonthRange>,
    ) -> Result<Vec<Forecast>>;
    async fn forecasted_species(&self) -> Result<Vec<ScientificName>>;
}
