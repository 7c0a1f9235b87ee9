use crate::PipelineConfig;
use avicast_core::{Environment, LogLevel, PsqlSettings, ScientificName};
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub postgres: PsqlSettings,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Overrides the tracked species list stored in the database.
    pub species: Option<Vec<String>>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".into());
        let environment = Environment::from_str(&environment)
            .map_err(|e| ConfigError::Message(format!("invalid APP_ENVIRONMENT: {e}")))?;

        Config::builder()
            .add_source(
                File::with_name(&format!("config/{}", environment.as_str().to_lowercase()))
                    .required(true),
            )
            .add_source(config::Environment::with_prefix("AVICAST_ENGINE").separator("__"))
            .set_override("environment", environment.as_str())?
            .build()?
            .try_deserialize()
    }

    pub fn species_override(&self) -> Option<Vec<ScientificName>> {
        self.species
            .as_ref()
            .map(|species| species.iter().map(|s| ScientificName::new(s.as_str())).collect())
    }
}
