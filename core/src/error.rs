//! Crate-wide error taxonomy.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure categories surfaced by the catalog, container, and cache layers.
#[derive(Debug, Error)]
pub enum Error {
    /// A request parameter was malformed (bad rotation angle, zero target
    /// dimensions, and similar).
    #[error("invalid request: {0}")]
    Validation(String),

    /// The referenced library, book, page, or cache entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path's extension is outside the supported container or image set.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A filesystem or archive read failed. Carries the container path.
    #[error("io failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image codec rejected the input.
    #[error("decode failure: {0}")]
    Decode(String),

    /// A uniqueness invariant was violated (duplicate catalog path or cache
    /// key).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl Error {
    /// Wrap an io error together with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Wrap a non-io archive library error, keeping the container path.
    pub fn archive(path: &Path, message: impl std::fmt::Display) -> Self {
        Self::Io { path: path.to_path_buf(), source: std::io::Error::other(message.to_string()) }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
