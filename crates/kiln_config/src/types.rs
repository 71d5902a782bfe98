//! Configuration types deserialized from `kiln.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Default cache subdirectory under each target's data root.
pub const DEFAULT_CACHE_DIRECTORY: &str = "kiln";

/// Default file extension of compiled output artifacts.
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "class";

/// The top-level configuration parsed from `kiln.toml`.
#[derive(Debug, Deserialize)]
pub struct KilnConfig {
    /// Settings shared by every target's cache.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Named build targets, one cache per target.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

/// Cache settings shared across targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheSettings {
    /// Name of the cache subdirectory under a target's data root.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Extension appended to unit names to form artifact paths.
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,
    /// Storage backend for the typed maps.
    #[serde(default)]
    pub backend: StoreBackend,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            artifact_extension: default_artifact_extension(),
            backend: StoreBackend::default(),
        }
    }
}

fn default_directory() -> String {
    DEFAULT_CACHE_DIRECTORY.to_string()
}

fn default_artifact_extension() -> String {
    DEFAULT_ARTIFACT_EXTENSION.to_string()
}

/// Storage strategy for the typed maps, resolved once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One file per typed map under the target's cache directory.
    #[default]
    Disk,
    /// In-memory maps that are never persisted.
    Memory,
}

/// Configuration for one build target.
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    /// Directory holding the target's cache and version stamp.
    pub data_root: String,
    /// Directory the compiler writes the target's artifacts to.
    #[serde(default)]
    pub output_dir: Option<String>,
    /// Targets that may inline functions compiled in this target.
    #[serde(default)]
    pub dependents: Vec<String>,
}
