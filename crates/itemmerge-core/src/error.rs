//! Error types for itemmerge-core.

use thiserror::Error;

/// Result type alias for itemmerge-core operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors that can occur while merging items into a project.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// A caller-supplied handle or argument is unusable (missing destination, stale id).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Two items of different types were asked to merge.
    #[error("cannot merge items of different types: expected '{expected}', got '{actual}'")]
    TypeMismatch { expected: String, actual: String },

    /// The incoming item has neither include nor update targets.
    #[error("cannot merge items without a common target kind")]
    NoCommonTargetKind,
}
