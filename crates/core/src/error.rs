// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a generate request is rejected outright.
///
/// Individual unknown glyphs are not errors; they are dropped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid request: expected an object with a `glyphs` field")]
    MissingGlyphs,

    #[error("invalid request: `glyphs` must be a list")]
    NotAList,

    #[error("invalid request: none of the {requested} glyphs matched the catalog")]
    NoValidGlyphs { requested: usize },
}

/// Errors that can occur when loading the glyph catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Glyph catalog not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading glyph catalog: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading glyph catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed glyph catalog: {message}")]
    Malformed { message: String },
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors from moving a built artifact into the output store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Staged artifact not found: {path}")]
    StagedMissing { path: PathBuf },

    #[error("IO error in output store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
