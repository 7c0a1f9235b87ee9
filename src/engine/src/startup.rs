use crate::error::error::StoreSnafu;
use crate::{BatchReport, Pipeline, Result, Settings};
use avicast_core::{ObservationOutbound, ScientificName};
use postgres::PostgresAdapter;
use snafu::ResultExt;
use tracing::{event, Level};

pub struct App {
    pipeline: Pipeline,
    postgres: PostgresAdapter,
    species: Option<Vec<ScientificName>>,
}

impl App {
    pub async fn build(settings: &Settings) -> Result<App> {
        let postgres = PostgresAdapter::new(&settings.postgres)
            .await
            .map_err(avicast_core::Error::from)
            .context(StoreSnafu)?;
        postgres
            .do_migrations()
            .await
            .map_err(avicast_core::Error::from)
            .context(StoreSnafu)?;

        let pipeline = Pipeline::new(settings.pipeline.clone())?;

        Ok(App {
            pipeline,
            postgres,
            species: settings.species_override(),
        })
    }

    pub async fn run(self) -> Result<BatchReport> {
        let species = match self.species {
            Some(species) => species,
            None => self
                .postgres
                .tracked_species()
                .await
                .context(StoreSnafu)?,
        };

        event!(Level::INFO, species = species.len(), "starting forecast batch");

        Ok(self.pipeline.run_all(&self.postgres, &species).await)
    }
}
