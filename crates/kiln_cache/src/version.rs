//! Cache format version stamp.
//!
//! A single `format-version.txt` in the target's data root records the layout
//! version the cache directory was written with. Any mismatch invalidates the
//! whole directory; there is no partial migration.

use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Current cache layout version. Increment on any change to a typed map's
/// key or value encoding, or to the set of map files.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Name of the stamp file within the target's data root.
const VERSION_FILE: &str = "format-version.txt";

/// Extension shared by every typed map file.
pub(crate) const MAP_FILE_EXT: &str = "tab";

/// The format version stamp of one target.
#[derive(Debug, Clone)]
pub struct CacheFormatVersion {
    file: PathBuf,
}

impl CacheFormatVersion {
    /// Creates the guard for the target whose data lives under `data_root`.
    pub fn new(data_root: &Path) -> Self {
        Self {
            file: data_root.join(VERSION_FILE),
        }
    }

    /// Returns the stamp file path.
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Reads the stored stamp, `None` if there is none.
    fn stored(&self) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(&self.file) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(&self.file, e)),
        }
    }

    /// Returns `true` if the state under `cache_dir` cannot be trusted.
    ///
    /// That is the case when a stamp exists with another version, or when no
    /// stamp exists but `cache_dir` already holds map files.
    pub fn is_incompatible(&self, cache_dir: &Path) -> Result<bool, CacheError> {
        match self.stored()? {
            Some(version) => Ok(version != CACHE_FORMAT_VERSION.to_string()),
            None => has_map_files(cache_dir),
        }
    }

    /// Writes the current version unless it is already stamped.
    pub fn save_if_needed(&self) -> Result<(), CacheError> {
        if self.stored()?.as_deref() == Some(CACHE_FORMAT_VERSION.to_string().as_str()) {
            return Ok(());
        }
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        std::fs::write(&self.file, CACHE_FORMAT_VERSION.to_string())
            .map_err(|e| CacheError::io(&self.file, e))
    }

    /// Removes the stamp.
    pub fn clean(&self) -> Result<(), CacheError> {
        match std::fs::remove_file(&self.file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&self.file, e)),
        }
    }
}

fn has_map_files(cache_dir: &Path) -> Result<bool, CacheError> {
    let entries = match std::fs::read_dir(cache_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(CacheError::io(cache_dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| CacheError::io(cache_dir, e))?;
        if entry.path().extension().and_then(|e| e.to_str()) == Some(MAP_FILE_EXT) {
            return Ok(true);
        }
    }
    Ok(false)
}
