use snafu::{Location, Snafu};
use std::path::PathBuf;
use tokio::task::JoinError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub))]
pub enum Error {
    #[snafu(display("Failed a storage operation"))]
    Store {
        #[snafu(implicit)]
        location: Location,
        source: avicast_core::Error,
    },
    #[snafu(display("No observations found for species '{species}'"))]
    NoObservations {
        #[snafu(implicit)]
        location: Location,
        species: String,
    },
    #[snafu(display("No training sequences could be built for species '{species}'"))]
    NoSequences {
        #[snafu(implicit)]
        location: Location,
        species: String,
    },
    #[snafu(display("Invalid pipeline configuration: {reason}"))]
    InvalidConfig {
        #[snafu(implicit)]
        location: Location,
        reason: String,
    },
    #[snafu(display("Invalid forecast period"))]
    InvalidPeriod {
        #[snafu(implicit)]
        location: Location,
        source: avicast_core::Error,
    },
    #[snafu(display("Failed to join training task"))]
    Join {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: JoinError,
    },
    #[snafu(display("Failed to access model artifact at '{}'", path.display()))]
    ModelIo {
        #[snafu(implicit)]
        location: Location,
        path: PathBuf,
        #[snafu(source)]
        error: std::io::Error,
    },
    #[snafu(display("Failed to (de)serialize model artifact at '{}'", path.display()))]
    ModelFormat {
        #[snafu(implicit)]
        location: Location,
        path: PathBuf,
        #[snafu(source)]
        error: serde_json::Error,
    },
    #[snafu(display("Model artifact at '{}' does not fit the configured network shape", path.display()))]
    ModelShape {
        #[snafu(implicit)]
        location: Location,
        path: PathBuf,
    },
}
