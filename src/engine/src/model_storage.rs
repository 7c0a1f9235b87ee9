use crate::error::error::{ModelFormatSnafu, ModelIoSnafu, ModelShapeSnafu};
use crate::{ForecastNetwork, ModelMetrics, Result};
use avicast_core::ScientificName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Persisted result of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub species: ScientificName,
    pub model_version: String,
    pub trained_at: DateTime<Utc>,
    pub metrics: ModelMetrics,
    pub network: ForecastNetwork,
}

/// One artifact file per species inside a directory, rewritten on every save.
#[derive(Debug, Clone)]
pub struct ModelStorage {
    dir: PathBuf,
}

impl ModelStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, species: &ScientificName) -> PathBuf {
        self.dir.join(format!("{}_model.json", species.file_stem()))
    }

    pub async fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context(ModelIoSnafu { path: &self.dir })?;

        let path = self.path(&artifact.species);
        let bytes = serde_json::to_vec(artifact).context(ModelFormatSnafu { path: &path })?;
        tokio::fs::write(&path, bytes)
            .await
            .context(ModelIoSnafu { path: &path })?;

        Ok(path)
    }

    /// `None` if the species has never been trained.
    pub async fn load(&self, species: &ScientificName) -> Result<Option<ModelArtifact>> {
        let path = self.path(species);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context(ModelIoSnafu { path }),
        };

        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).context(ModelFormatSnafu { path: &path })?;
        ensure!(artifact.network.is_well_formed(), ModelShapeSnafu { path });

        Ok(Some(artifact))
    }
}
