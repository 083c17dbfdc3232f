use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parcel id format: '{raw}'")]
    MalformedIdentifier { raw: String },

    #[error("column '{column}' not found in {path}")]
    MissingColumn { column: String, path: String },

    #[error("separator '{separator}' not found in the header of {}", .path.display())]
    SeparatorMismatch { separator: String, path: PathBuf },

    #[error("separator must be a single ASCII character, got '{0}'")]
    InvalidSeparator(String),

    #[error("file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("cannot read {}: {source}", .path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    FileUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read the operator's answer: {0}")]
    Prompt(#[source] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{} is not a FeatureCollection", .path.display())]
    NotAFeatureCollection { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Maps an open/read failure onto the not-found or unreadable variant.
    pub fn reading(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Error::FileNotFound { path }
        } else {
            Error::FileUnreadable { path, source }
        }
    }

    pub fn writing(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::FileUnwritable {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
