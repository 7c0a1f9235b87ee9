use crate::error::error::{ConnectionSnafu, MigrationSnafu};
use crate::error::PostgresError;
use async_trait::async_trait;
use avicast_core::{
    Forecast, ForecastInbound, ForecastOutbound, MonthRange, Observation, ObservationOutbound,
    PsqlLogStatements, PsqlSettings, Result as CoreResult, ScientificName,
};
use snafu::ResultExt;
use sqlx::{
    ConnectOptions, PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use tracing::{Level, event};

#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pub(crate) pool: PgPool,
}

impl PostgresAdapter {
    pub async fn new(settings: &PsqlSettings) -> Result<PostgresAdapter, PostgresError> {
        let mut opts = PgConnectOptions::new()
            .username(&settings.username)
            .password(&settings.password)
            .host(&settings.ip)
            .port(settings.port as u16)
            .options([("plan_cache_mode", "force_custom_plan")]);

        if let Some(db_name) = &settings.db_name {
            opts = opts.database(db_name);
        }

        if let Some(root_cert_path) = &settings.root_cert {
            opts = opts
                .ssl_root_cert(root_cert_path)
                .ssl_mode(PgSslMode::VerifyFull);
        }

        if settings.log_statements == PsqlLogStatements::Disable {
            opts = opts.disable_statement_logging();
        }

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections.max(1))
            .connect_with(opts)
            .await
            .context(ConnectionSnafu)?;

        Ok(PostgresAdapter { pool })
    }

    pub async fn do_migrations(&self) -> Result<(), PostgresError> {
        sqlx::migrate!()
            .set_ignore_missing(true)
            .run(&self.pool)
            .await
            .context(MigrationSnafu)?;

        event!(Level::INFO, "database migrations up to date");
        Ok(())
    }
}

#[async_trait]
impl ObservationOutbound for PostgresAdapter {
    async fn observations(&self, species: &ScientificName) -> CoreResult<Vec<Observation>> {
        Ok(self.observations_impl(species).await?)
    }

    async fn tracked_species(&self) -> CoreResult<Vec<ScientificName>> {
        Ok(self.tracked_species_impl().await?)
    }
}

#[async_trait]
impl ForecastInbound for PostgresAdapter {
    async fn delete_forecasts(&self, species: &ScientificName) -> CoreResult<u64> {
        Ok(self.delete_forecasts_impl(species).await?)
    }

    async fn add_forecasts(&self, forecasts: Vec<Forecast>) -> CoreResult<()> {
        Ok(self.add_forecasts_impl(forecasts).await?)
    }

    async fn replace_forecasts(
        &self,
        species: &ScientificName,
        forecasts: Vec<Forecast>,
    ) -> CoreResult<u64> {
        Ok(self.replace_forecasts_impl(species, forecasts).await?)
    }
}

#[async_trait]
impl ForecastOutbound for PostgresAdapter {
    async fn forecasts(
        &self,
        species: &ScientificName,
        range: Option<MonthRange>,
    ) -> CoreResult<Vec<Forecast>> {
        Ok(self.forecasts_impl(species, range).await?)
    }

    async fn forecasted_species(&self) -> CoreResult<Vec<ScientificName>> {
        Ok(self.forecasted_species_impl().await?)
    }
}
