//! itemmerge-core: Conditional item merging for declarative project files.
//!
//! This crate provides:
//! - `Item`, `TargetSet` and `Metadata`: the records being merged and their algebra
//! - `Project`: an arena of guarded groups holding items
//! - The three merge passes (`engine`) and the `Applicator` that runs them
//! - `MergeTrace`: the trace capability the engine reports its decisions to

pub mod applicator;
pub mod condition;
pub mod engine;
pub mod error;
pub mod item;
pub mod metadata;
pub mod project;
pub mod targets;
pub mod trace;

pub use applicator::{ApplyOutcome, Applicator};
pub use condition::{ConditionChain, chains_equivalent, has_condition};
pub use engine::{Destination, MergeResult, PassOutcome, merge_items};
pub use error::{MergeError, Result};
pub use item::Item;
pub use metadata::{Metadata, merge_metadata};
pub use project::{Child, Edit, Group, GroupId, ItemId, Project};
pub use targets::{TargetKind, TargetSet};
pub use trace::{MergeTrace, Pass, RecordingTrace, TraceEvent, TracingTrace};
