use crate::error::PostgresError;
use crate::error::error::QuerySnafu;
use crate::{PostgresAdapter, models};
use avicast_core::{Observation, ScientificName};
use snafu::ResultExt;

impl PostgresAdapter {
    pub(crate) async fn observations_impl(
        &self,
        species: &ScientificName,
    ) -> Result<Vec<Observation>, PostgresError> {
        sqlx::query_as::<_, models::Observation>(
            r#"
SELECT
    scientific_name,
    observed_on,
    latitude,
    longitude,
    observation_count
FROM
    species_occurrences
WHERE
    LOWER(scientific_name) = LOWER($1)
ORDER BY
    observed_on
            "#,
        )
        .bind(species.as_str())
        .fetch_all(&self.pool)
        .await
        .context(QuerySnafu)?
        .into_iter()
        .map(Observation::try_from)
        .collect()
    }

    pub(crate) async fn tracked_species_impl(&self) -> Result<Vec<ScientificName>, PostgresError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
SELECT
    scientific_name
FROM
    tracked_species
ORDER BY
    scientific_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context(QuerySnafu)?;

        Ok(names.into_iter().map(ScientificName::new).collect())
    }
}
