//! Filesystem layer for itemmerge runs.
//!
//! Provides:
//! - Project documents (nested, guarded groups of items) in YAML or JSON
//! - Batch documents: items to add to one labelled group
//! - `itemmerge.yml`: run defaults
//! - `Workspace::run`: load, apply batches, save

pub mod config;
pub mod document;
pub mod error;
pub mod workspace;

pub use config::{ReportFormat, RunConfig};
pub use document::{
    BatchDocument, ProjectDocument, collect_batches, load_batch, load_project, save_project,
};
pub use error::{FsError, Result};
pub use workspace::{BatchReport, RunOptions, RunReport, Workspace};
