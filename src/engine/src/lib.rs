#![deny(rust_2018_idioms)]

use avicast_core::{ForecastInbound, ForecastOutbound, ObservationOutbound};

pub mod aggregation;
pub mod chart;
pub mod error;
pub mod forecast;
pub mod ml_model;
pub mod model_storage;
pub mod pipeline;
pub mod range_shift;
pub mod sequences;
pub mod settings;
pub mod startup;
pub mod trainer;

pub use aggregation::*;
pub use chart::*;
pub use error::{Error, Result};
pub use forecast::*;
pub use ml_model::*;
pub use model_storage::*;
pub use pipeline::*;
pub use range_shift::*;
pub use sequences::*;
pub use settings::*;
pub use startup::*;
pub use trainer::*;

pub trait Database:
    ObservationOutbound + ForecastInbound + ForecastOutbound + Send + Sync + 'static
{
}

impl<T> Database for T where
    T: ObservationOutbound + ForecastInbound + ForecastOutbound + 'static
{
}
