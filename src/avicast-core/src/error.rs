use snafu::{IntoError, Location, Snafu};

pub type Result<T> = std::result::Result<T, Error>;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub))]
pub enum Error {
    #[snafu(display("A storage operation failed"))]
    Storage {
        #[snafu(implicit)]
        location: Location,
        source: BoxedError,
    },
    #[snafu(display("Month '{month}' is outside of 1..=12"))]
    InvalidMonth {
        #[snafu(implicit)]
        location: Location,
        month: u32,
    },
    #[snafu(display("Month range start '{start}' is after its end '{end}'"))]
    InvalidMonthRange {
        #[snafu(implicit)]
        location: Location,
        start: String,
        end: String,
    },
    #[snafu(display("Grid size must be a positive finite number of degrees, got '{size}'"))]
    InvalidGridSize {
        #[snafu(implicit)]
        location: Location,
        size: f64,
    },
}

impl Error {
    /// Wraps an error raised by a storage backend.
    #[track_caller]
    pub fn storage<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        error::StorageSnafu.into_error(Box::new(error))
    }
}
