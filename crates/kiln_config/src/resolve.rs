//! Target resolution: pairing a target's directories with the shared cache settings.

use crate::error::ConfigError;
use crate::types::{CacheSettings, KilnConfig};
use std::path::PathBuf;

/// A fully resolved target, ready to open its cache.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// The target name.
    pub name: String,
    /// Directory holding the target's cache directory and version stamp.
    pub data_root: PathBuf,
    /// Directory the target's artifacts are written to.
    pub output_dir: PathBuf,
    /// Targets whose caches may hold inline call sites into this one.
    pub dependents: Vec<String>,
    /// Cache settings shared across targets.
    pub cache: CacheSettings,
}

/// Resolves a named target.
///
/// A target must have an output directory before its cache can be opened,
/// so a missing `output_dir` is reported as a missing field here.
pub fn resolve_target(
    config: &KilnConfig,
    target_name: &str,
) -> Result<ResolvedTarget, ConfigError> {
    let target = config
        .targets
        .get(target_name)
        .ok_or_else(|| ConfigError::UnknownTarget(target_name.to_string()))?;

    let output_dir = target
        .output_dir
        .as_deref()
        .filter(|dir| !dir.is_empty())
        .ok_or_else(|| ConfigError::MissingField(format!("targets.{target_name}.output_dir")))?;

    Ok(ResolvedTarget {
        name: target_name.to_string(),
        data_root: PathBuf::from(&target.data_root),
        output_dir: PathBuf::from(output_dir),
        dependents: target.dependents.clone(),
        cache: config.cache.clone(),
    })
}
