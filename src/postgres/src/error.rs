use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(module(error), visibility(pub))]
pub enum PostgresError {
    #[snafu(display("Failed to acquire a database connection"))]
    Connection {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: sqlx::Error,
    },
    #[snafu(display("A query related error occurred"))]
    Query {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: sqlx::Error,
    },
    #[snafu(display("Failed to run database migrations"))]
    Migration {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: sqlx::migrate::MigrateError,
    },
    #[snafu(display("Failed to convert stored data: {reason}"))]
    DataConversion {
        #[snafu(implicit)]
        location: Location,
        reason: String,
    },
}

impl From<PostgresError> for avicast_core::Error {
    #[track_caller]
    fn from(value: PostgresError) -> Self {
        avicast_core::Error::storage(value)
    }
}
