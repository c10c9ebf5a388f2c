//! Applies batches of incoming items to a destination group.

use crate::engine::{Destination, run_pass};
use crate::error::{MergeError, Result};
use crate::item::Item;
use crate::project::{GroupId, ItemId, Project};
use crate::trace::{MergeTrace, Pass, TraceEvent};
use serde::Serialize;
use tracing::info;

/// Merge passes in the order they run.
const PASSES: [Pass; 3] = [Pass::SameCondition, Pass::NoCondition, Pass::HasCondition];

/// What happened to one incoming item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "item", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The surviving item was appended as a new node.
    Appended(ItemId),
    /// Existing items absorbed the item entirely; nothing was appended.
    Consumed,
}

/// Adds items to a project, optionally reconciling them with existing items first.
pub struct Applicator<'a> {
    trace: &'a dyn MergeTrace,
}

impl<'a> Applicator<'a> {
    /// Create an applicator reporting decisions to `trace`.
    #[must_use]
    pub fn new(trace: &'a dyn MergeTrace) -> Self {
        Self { trace }
    }

    /// Apply one item to `destination`.
    ///
    /// With `merge_existing` the three merge passes run in order and may
    /// absorb the item. Whatever survives is appended to `destination`.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` if `destination` is `None` or not a
    /// group of `project`, and propagates merge errors.
    pub fn apply(
        &self,
        project: &mut Project,
        item: Item,
        destination: Option<GroupId>,
        merge_existing: bool,
    ) -> Result<ApplyOutcome> {
        let group = destination.ok_or_else(|| {
            MergeError::InvalidArgument("expected destination group to not be null".to_string())
        })?;
        let destination = Destination::resolve(project, group)?;

        self.trace
            .record(TraceEvent::received(&item, &destination.chain));

        let mut item = item;
        if merge_existing {
            for pass in PASSES {
                let outcome = run_pass(pass, project, item, &destination, self.trace)?;
                project.apply_edits(outcome.edits)?;
                match outcome.survivor {
                    Some(survivor) => item = survivor,
                    None => return Ok(ApplyOutcome::Consumed),
                }
            }
        }

        self.trace.record(TraceEvent::Appended {
            item: item.to_string(),
        });
        let id = project.append_item(group, item)?;
        Ok(ApplyOutcome::Appended(id))
    }

    /// Apply items in order; each one sees the effects of those before it.
    ///
    /// # Errors
    /// Stops at and returns the first error.
    pub fn apply_all(
        &self,
        project: &mut Project,
        items: impl IntoIterator<Item = Item>,
        destination: Option<GroupId>,
        merge_existing: bool,
    ) -> Result<Vec<ApplyOutcome>> {
        let outcomes = items
            .into_iter()
            .map(|item| self.apply(project, item, destination, merge_existing))
            .collect::<Result<Vec<_>>>()?;

        let consumed = outcomes
            .iter()
            .filter(|o| **o == ApplyOutcome::Consumed)
            .count();
        info!(
            applied = outcomes.len(),
            consumed,
            merge_existing,
            "Applied item batch"
        );

        Ok(outcomes)
    }
}
