use std::path::PathBuf;

use thiserror::Error;

use crate::models::GuideKey;

/// Errors that can occur while building the catalog or reading project config.
#[derive(Error, Debug)]
pub enum GuideError {
    /// Front-matter parsing failed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A guide with the same key or id is already registered.
    #[error("duplicate guide: {key} (id '{id}') is already registered")]
    DuplicateGuide { key: GuideKey, id: String },

    /// A catalog guide uses an id reserved for the project guide.
    #[error("guide id '{id}' is reserved for the project guide")]
    ReservedId { id: String },

    /// A guide file was readable but its front-matter is unusable.
    #[error("invalid guide {path}: {message}")]
    InvalidGuide { path: PathBuf, message: String },

    /// The project override file is malformed.
    #[error("invalid override file {path}: {message}")]
    Override { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Convenience alias for `Result<T, GuideError>`.
pub type Result<T> = std::result::Result<T, GuideError>;
