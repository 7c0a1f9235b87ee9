use crate::*;
use async_trait::async_trait;

#[async_trait]
pub trait ForecastInbound: Send + Sync {
    /// Removes every stored forecast of the species, returns the number of removed records.
    async fn delete_forecasts(&self, species: &ScientificName) -> Result<u64>;
    async fn add_forecasts(&self, forecasts: Vec<Forecast>) -> Result<()>;
    /// Swaps the species' stored forecasts for `forecasts` in one unit, on failure the previous
    /// forecasts are kept. Returns the number of removed records.
    async fn replace_forecasts(
        &self,
        species: &ScientificName,
        forecasts: Vec<Forecast>,
    ) -> Result<u64>;
}
