//! Error types for the filesystem layer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for filesystem operations.
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors that can occur while reading or writing documents.
#[derive(Debug, Error)]
pub enum FsError {
    /// A config file already exists where `init` would write one.
    #[error("workspace already exists at '{0}'")]
    WorkspaceExists(PathBuf),

    /// The file extension is not one of yml, yaml or json.
    #[error("unsupported document format: '{0}'")]
    UnsupportedFormat(PathBuf),

    /// A batch names a group label the project does not have.
    #[error("no group labelled '{0}' in project")]
    UnknownGroup(String),

    /// A batch names no destination and the config has no default.
    #[error("batch '{0}' has no destination and no default destination is configured")]
    MissingDestination(PathBuf),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Merge engine error.
    #[error("merge error: {0}")]
    Core(#[from] itemmerge_core::MergeError),
}
