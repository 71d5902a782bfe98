//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::KilnConfig;
use std::path::Path;

/// Name of the configuration file inside a project directory.
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

/// Loads and validates a `kiln.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::IoError {
        path: config_path.clone(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates cache settings and cross-target references.
fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    let dir = &config.cache.directory;
    if dir.is_empty() || dir.contains(['/', '\\']) || dir == "." || dir == ".." {
        return Err(ConfigError::ValidationError(format!(
            "cache.directory must be a single path segment, got '{dir}'"
        )));
    }
    if config.cache.artifact_extension.is_empty() {
        return Err(ConfigError::ValidationError(
            "cache.artifact_extension must not be empty".to_string(),
        ));
    }

    for (name, target) in &config.targets {
        if target.data_root.is_empty() {
            return Err(ConfigError::MissingField(format!(
                "targets.{name}.data_root"
            )));
        }
        for dependent in &target.dependents {
            if dependent == name {
                return Err(ConfigError::ValidationError(format!(
                    "target '{name}' lists itself as a dependent"
                )));
            }
            if !config.targets.contains_key(dependent) {
                return Err(ConfigError::ValidationError(format!(
                    "target '{name}' lists unknown dependent '{dependent}'"
                )));
            }
        }
    }
    Ok(())
}
