//! Error types for cache operations.

use std::path::PathBuf;

use kiln_common::InternalError;

/// Errors that can occur during cache operations.
///
/// None of these are retried. A format mismatch is handled internally by
/// discarding state; every error surfaced here means the target's cache must
/// be cleaned and the target rebuilt from scratch.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A store file has an invalid or missing header.
    #[error("invalid store header in {path}: {reason}")]
    InvalidHeader {
        /// The store file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// A stored record could not be decoded.
    #[error("malformed record in {path}: {reason}")]
    MalformedRecord {
        /// The store file path.
        path: PathBuf,
        /// Description of the decoding failure.
        reason: String,
    },

    /// A serialization or deserialization error occurred outside a store file.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The target has no resolved output directory.
    #[error("target '{target}' has no output directory")]
    MissingOutputDir {
        /// The target name.
        target: String,
    },

    /// An invariant between compiler and cache was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
