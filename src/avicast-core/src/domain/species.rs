use serde::{Deserialize, Serialize};
use std::fmt;

/// Scientific name identifying a species, e.g. `Cardinalis cardinalis`.
///
/// Lookups against stored data are case-insensitive exact matches, equality on this type is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScientificName(String);

impl ScientificName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.trim().to_lowercase()
    }

    /// Filesystem friendly form, spaces replaced by underscores.
    pub fn file_stem(&self) -> String {
        self.0.replace(' ', "_")
    }
}

impl fmt::Display for ScientificName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScientificName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ScientificName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
