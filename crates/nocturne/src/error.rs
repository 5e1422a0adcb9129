//! Error types for the calling layer.

use std::io;
use std::path::PathBuf;

use nocturne_css::{ColorMapError, ParseError};
use thiserror::Error;

/// Errors raised while loading, saving or applying color overrides.
#[derive(Debug, Error)]
pub enum Error {
    /// A stylesheet, color map or catalog file does not exist.
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    /// A save payload is not a well-formed color map.
    #[error("invalid payload: {0}")]
    Validation(String),

    /// A stylesheet could not be parsed.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored JSON file is malformed.
    #[error("malformed {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: ColorMapError,
    },

    /// A stylesheet name would resolve outside the stylesheet directory.
    #[error("invalid stylesheet name '{0}'")]
    InvalidSheetName(String),

    /// The configuration file is malformed.
    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl Error {
    /// Maps an I/O error, turning `NotFound` into [`Error::NotFound`].
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// True for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ColorMapError> for Error {
    fn from(err: ColorMapError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type for calling-layer operations.
pub type Result<T> = std::result::Result<T, Error>;
