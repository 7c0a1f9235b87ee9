use crate::error::PostgresError;
use crate::error::error::{ConnectionSnafu, QuerySnafu};
use crate::models::{self, NewForecasts};
use crate::PostgresAdapter;
use avicast_core::{Forecast, MonthRange, ScientificName};
use snafu::ResultExt;
use sqlx::PgConnection;

impl PostgresAdapter {
    pub(crate) async fn delete_forecasts_impl(
        &self,
        species: &ScientificName,
    ) -> Result<u64, PostgresError> {
        let mut conn = self.pool.acquire().await.context(ConnectionSnafu)?;
        delete_forecasts(&mut conn, species).await
    }

    pub(crate) async fn add_forecasts_impl(
        &self,
        forecasts: Vec<Forecast>,
    ) -> Result<(), PostgresError> {
        let mut conn = self.pool.acquire().await.context(ConnectionSnafu)?;
        insert_forecasts(&mut conn, forecasts).await
    }

    pub(crate) async fn replace_forecasts_impl(
        &self,
        species: &ScientificName,
        forecasts: Vec<Forecast>,
    ) -> Result<u64, PostgresError> {
        let mut tx = self.pool.begin().await.context(ConnectionSnafu)?;

        let removed = delete_forecasts(&mut tx, species).await?;
        insert_forecasts(&mut tx, forecasts).await?;

        tx.commit().await.context(QuerySnafu)?;

        Ok(removed)
    }

    pub(crate) async fn forecasts_impl(
        &self,
        species: &ScientificName,
        range: Option<MonthRange>,
    ) -> Result<Vec<Forecast>, PostgresError> {
        let start = range.map(|r| r.start().ordinal());
        let end = range.map(|r| r.end().ordinal());

        sqlx::query_as::<_, models::Forecast>(
            r#"
SELECT
    scientific_name,
    year,
    month,
    grid_latitude,
    grid_longitude,
    latitude,
    longitude,
    count_prediction,
    range_north,
    range_south,
    range_east,
    range_west,
    months_ahead,
    prediction_type,
    model_version,
    generated_at
FROM
    species_forecasts
WHERE
    LOWER(scientific_name) = LOWER($1)
    AND (
        $2::BIGINT IS NULL
        OR year::BIGINT * 12 + month - 1 BETWEEN $2 AND $3
    )
ORDER BY
    year,
    month,
    grid_latitude,
    grid_longitude
            "#,
        )
        .bind(species.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context(QuerySnafu)?
        .into_iter()
        .map(Forecast::try_from)
        .collect()
    }

    pub(crate) async fn forecasted_species_impl(
        &self,
    ) -> Result<Vec<ScientificName>, PostgresError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
SELECT DISTINCT
    scientific_name
FROM
    species_forecasts
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

async fn delete_forecasts(
    conn: &mut PgConnection,
    species: &ScientificName,
) -> Result<u64, PostgresError> {
    sqlx::query(
        r#"
DELETE FROM species_forecasts
WHERE
    LOWER(scientific_name) = LOWER($1)
        "#,
    )
    .bind(species.as_str())
    .execute(conn)
    .await
    .context(QuerySnafu)
    .map(|r| r.rows_affected())
}

async fn insert_forecasts(
    conn: &mut PgConnection,
    forecasts: Vec<Forecast>,
) -> Result<(), PostgresError> {
    if forecasts.is_empty() {
        return Ok(());
    }

    let columns = NewForecasts::from(forecasts);

    sqlx::query(
        r#"
INSERT INTO
    species_forecasts (
        scientific_name,
        year,
        month,
        grid_latitude,
        grid_longitude,
        latitude,
        longitude,
        count_prediction,
        range_north,
        range_south,
        range_east,
        range_west,
        months_ahead,
        prediction_type,
        model_version,
        generated_at
    )
SELECT
    *
FROM
    UNNEST(
        $1::TEXT[],
        $2::INT[],
        $3::INT[],
        $4::DOUBLE PRECISION[],
        $5::DOUBLE PRECISION[],
        $6::DOUBLE PRECISION[],
        $7::DOUBLE PRECISION[],
        $8::DOUBLE PRECISION[],
        $9::DOUBLE PRECISION[],
        $10::DOUBLE PRECISION[],
        $11::DOUBLE PRECISION[],
        $12::DOUBLE PRECISION[],
        $13::INT[],
        $14::TEXT[],
        $15::TEXT[],
        $16::TIMESTAMPTZ[]
    )
        "#,
    )
    .bind(columns.scientific_name)
    .bind(columns.year)
    .bind(columns.month)
    .bind(columns.grid_latitude)
    .bind(columns.grid_longitude)
    .bind(columns.latitude)
    .bind(columns.longitude)
    .bind(columns.count_prediction)
    .bind(columns.range_north)
    .bind(columns.range_south)
    .bind(columns.range_east)
    .bind(columns.range_west)
    .bind(columns.months_ahead)
    .bind(columns.prediction_type)
    .bind(columns.model_version)
    .bind(columns.generated_at)
    .execute(conn)
    .await
    .context(QuerySnafu)
    .map(|_| ())
}
