//! The three merge passes.
//!
//! Each pass reads the project, decides what to do with one incoming item and
//! returns the surviving item together with the [`Edit`]s to apply. Passes
//! never mutate the project themselves; the applicator applies the edits of
//! one pass before running the next.
//!
//! 1. [`merge_same_condition`]: fold shared targets with items of the same
//!    condition in an equivalent scope.
//! 2. [`merge_no_condition`]: a conditioned item drops targets an
//!    unconditioned item already declares identically.
//! 3. [`merge_has_condition`]: an unconditioned item narrows conditioned items
//!    that it re-declares.

use crate::condition::{ConditionChain, chains_equivalent, has_condition};
use crate::error::{MergeError, Result};
use crate::item::Item;
use crate::metadata::merge_metadata;
use crate::project::{Edit, GroupId, ItemId, Project};
use crate::targets::{TargetKind, TargetSet};
use crate::trace::{MergeTrace, Pass, TraceEvent};

/// The group items are being added to, with its chain resolved once.
#[derive(Debug, Clone)]
pub struct Destination {
    pub group: GroupId,
    pub chain: ConditionChain,
}

impl Destination {
    /// Resolve `group` in `project`.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` if `group` is unknown.
    pub fn resolve(project: &Project, group: GroupId) -> Result<Self> {
        Ok(Self {
            group,
            chain: project.group_chain(group)?,
        })
    }
}

/// What a pass decided for one incoming item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    /// The narrowed incoming item, or `None` when it was fully absorbed.
    pub survivor: Option<Item>,
    /// Tree changes to apply, in order.
    pub edits: Vec<Edit>,
}

impl PassOutcome {
    const fn skipped(item: Item) -> Self {
        Self {
            survivor: Some(item),
            edits: Vec::new(),
        }
    }
}

/// Result of folding an incoming item into one existing item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Target list the merge ran on.
    pub kind: TargetKind,
    /// Incoming item minus the shared targets; `None` once it has no targets left.
    pub input: Option<Item>,
    /// Existing item minus the shared targets; `None` once it has no targets left.
    pub existing: Option<Item>,
    /// New item holding the shared targets; `None` when nothing was shared.
    pub merged: Option<Item>,
}

/// Fold the targets `incoming` shares with `existing` into a new item.
///
/// The merged item keeps the incoming type and condition, unions both
/// exclude lists and combines metadata with [`merge_metadata`]. Shared
/// targets are removed from both inputs.
///
/// # Errors
/// Returns `MergeError::TypeMismatch` if the types differ and
/// `MergeError::NoCommonTargetKind` if `incoming` has neither include nor
/// update targets.
pub fn merge_items(incoming: &Item, existing: &Item) -> Result<MergeResult> {
    if incoming.item_type != existing.item_type {
        return Err(MergeError::TypeMismatch {
            expected: existing.item_type.clone(),
            actual: incoming.item_type.clone(),
        });
    }

    let kind = incoming
        .primary_kind()
        .ok_or(MergeError::NoCommonTargetKind)?;
    let common = incoming.intersect(kind, existing);

    if common.is_empty() {
        return Ok(MergeResult {
            kind,
            input: Some(incoming.clone()),
            existing: Some(existing.clone()),
            merged: None,
        });
    }

    let mut merged =
        Item::new(incoming.item_type.clone()).with_condition(incoming.condition.trim());
    *merged.targets_mut(kind) = common.clone();
    merged.exclude = existing.exclude.union(&incoming.exclude);
    merged.metadata = merge_metadata(&existing.metadata, &incoming.metadata);

    let mut input = incoming.clone();
    input.subtract(kind, &common);
    let mut rest = existing.clone();
    rest.subtract(kind, &common);

    Ok(MergeResult {
        kind,
        input: input.has_targets().then_some(input),
        existing: rest.has_targets().then_some(rest),
        merged: Some(merged),
    })
}

/// Run one pass by name.
///
/// # Errors
/// Propagates errors from the selected pass.
pub fn run_pass(
    pass: Pass,
    project: &Project,
    item: Item,
    destination: &Destination,
    trace: &dyn MergeTrace,
) -> Result<PassOutcome> {
    match pass {
        Pass::SameCondition => merge_same_condition(project, item, destination, trace),
        Pass::NoCondition => merge_no_condition(project, item, destination, trace),
        Pass::HasCondition => merge_has_condition(project, item, destination, trace),
    }
}

/// Pass 1: fold into items with the same condition in an equivalent scope.
///
/// Candidates are re-checked against the narrowed incoming item, and the
/// pass stops as soon as the incoming item has nothing left.
///
/// # Errors
/// Returns `MergeError::NoCommonTargetKind` if a candidate is found for an item
/// with neither include nor update targets.
pub fn merge_same_condition(
    project: &Project,
    item: Item,
    destination: &Destination,
    trace: &dyn MergeTrace,
) -> Result<PassOutcome> {
    let candidates = find_candidates(project, &item, |id, existing| {
        let same_scope = project
            .item_parent(id)?
            .map(|group| project.group_chain(group))
            .transpose()?
            .is_some_and(|chain| chains_equivalent(&chain, &destination.chain));
        Ok(same_scope && existing.same_condition(&item))
    })?;
    trace.record(TraceEvent::Candidates {
        pass: Pass::SameCondition,
        count: candidates.len(),
    });

    let mut item = item;
    let mut edits = Vec::new();

    for id in candidates {
        let existing = project.item(id)?;
        if !existing.intersects(&item) {
            continue;
        }

        let result = merge_items(&item, existing)?;
        let Some(merged) = result.merged else {
            continue;
        };

        match result.existing {
            Some(rest) => edits.push(Edit::SetTargets {
                item: id,
                kind: result.kind,
                targets: rest.targets(result.kind).clone(),
            }),
            None => {
                trace.record(TraceEvent::Detached {
                    pass: Pass::SameCondition,
                    item: existing.to_string(),
                });
                edits.push(Edit::Detach { item: id });
            }
        }

        trace.record(TraceEvent::Merged {
            kind: result.kind,
            targets: merged.targets(result.kind).clone(),
        });
        edits.push(Edit::Append {
            group: destination.group,
            item: merged,
        });

        match result.input {
            Some(rest) => item = rest,
            None => {
                trace.record(TraceEvent::Consumed {
                    pass: Pass::SameCondition,
                });
                return Ok(PassOutcome {
                    survivor: None,
                    edits,
                });
            }
        }
    }

    Ok(PassOutcome {
        survivor: Some(item),
        edits,
    })
}

/// Pass 2: narrow a conditioned item against unconditioned declarations.
///
/// Targets an unconditioned item already declares identically are dropped
/// from the incoming item. When any unconditioned overlap exists, the
/// incoming targets as they stood on entry are listed in a remove-only record
/// in the destination. That includes targets that survive the pass: an item
/// `a;b` encompassed only on `a` records `remove="a;b"` and keeps `b`, which
/// then overrides the unconditioned declaration under its own guard.
///
/// # Errors
/// Returns `MergeError::InvalidArgument` if the project holds stale ids.
pub fn merge_no_condition(
    project: &Project,
    item: Item,
    destination: &Destination,
    trace: &dyn MergeTrace,
) -> Result<PassOutcome> {
    let own_chain = ConditionChain::new().with(&item.condition);
    if !has_condition(&own_chain) && !has_condition(&destination.chain) {
        return Ok(PassOutcome::skipped(item));
    }

    let candidates = find_candidates(project, &item, |id, _| {
        Ok(!has_condition(&project.item_chain(id)?))
    })?;
    trace.record(TraceEvent::Candidates {
        pass: Pass::NoCondition,
        count: candidates.len(),
    });

    let entry_targets = item.include.union(&item.update);
    let mut item = item;

    for kind in item.active_kinds() {
        for id in &candidates {
            let covered = item.encompassed_by(project.item(*id)?, kind);
            if covered.is_empty() {
                continue;
            }

            trace.record(TraceEvent::Encompassed {
                pass: Pass::NoCondition,
                kind,
                targets: covered.clone(),
            });
            item.subtract(kind, &covered);
            if item.targets(kind).is_empty() {
                break;
            }
        }
    }

    let mut edits = Vec::new();
    if !candidates.is_empty() {
        trace.record(TraceEvent::RemoveEmitted {
            pass: Pass::NoCondition,
            targets: entry_targets.clone(),
        });
        edits.push(Edit::ExtendRemove {
            group: destination.group,
            item_type: item.item_type.clone(),
            targets: entry_targets,
        });
    }

    if !item.has_targets() {
        trace.record(TraceEvent::Consumed {
            pass: Pass::NoCondition,
        });
        return Ok(PassOutcome {
            survivor: None,
            edits,
        });
    }

    Ok(PassOutcome {
        survivor: Some(item),
        edits,
    })
}

/// Pass 3: an unconditioned item narrows conditioned declarations of its targets.
///
/// Targets of a conditioned item that the incoming item re-declares
/// identically are dropped from it; an emptied item is detached. Otherwise
/// the overlap is listed in a remove-only record in the destination. The
/// incoming item is returned unchanged.
///
/// # Errors
/// Returns `MergeError::InvalidArgument` if the project holds stale ids.
pub fn merge_has_condition(
    project: &Project,
    item: Item,
    destination: &Destination,
    trace: &dyn MergeTrace,
) -> Result<PassOutcome> {
    if !item.is_unconditioned() || has_condition(&destination.chain) {
        return Ok(PassOutcome::skipped(item));
    }

    let candidates = find_candidates(project, &item, |id, _| {
        Ok(has_condition(&project.item_chain(id)?))
    })?;
    trace.record(TraceEvent::Candidates {
        pass: Pass::HasCondition,
        count: candidates.len(),
    });

    let mut edits = Vec::new();

    for id in candidates {
        let existing = project.item(id)?;
        let mut narrowed = existing.clone();
        let mut narrowing = Vec::new();
        let mut overlap = TargetSet::new();

        for kind in item.active_kinds() {
            let shared = existing.intersect(kind, &item);
            if shared.is_empty() {
                continue;
            }
            overlap.extend_from(&shared);

            let covered = existing.encompassed_by(&item, kind);
            if !covered.is_empty() {
                trace.record(TraceEvent::Encompassed {
                    pass: Pass::HasCondition,
                    kind,
                    targets: covered.clone(),
                });
                narrowed.subtract(kind, &covered);
                narrowing.push(Edit::SetTargets {
                    item: id,
                    kind,
                    targets: narrowed.targets(kind).clone(),
                });
            }
        }

        if !narrowed.has_targets() {
            trace.record(TraceEvent::Detached {
                pass: Pass::HasCondition,
                item: existing.to_string(),
            });
            edits.push(Edit::Detach { item: id });
            continue;
        }

        edits.extend(narrowing);
        if !overlap.is_empty() {
            trace.record(TraceEvent::RemoveEmitted {
                pass: Pass::HasCondition,
                targets: overlap.clone(),
            });
            edits.push(Edit::ExtendRemove {
                group: destination.group,
                item_type: item.item_type.clone(),
                targets: overlap,
            });
        }
    }

    Ok(PassOutcome {
        survivor: Some(item),
        edits,
    })
}

/// Attached items of the same type that overlap `item` and pass `filter`, in document order.
fn find_candidates<F>(project: &Project, item: &Item, filter: F) -> Result<Vec<ItemId>>
where
    F: Fn(ItemId, &Item) -> Result<bool>,
{
    let mut out = Vec::new();
    for id in project.items() {
        let existing = project.item(id)?;
        if existing.item_type == item.item_type
            && existing.intersects(item)
            && filter(id, existing)?
        {
            out.push(id);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::RecordingTrace;
    use pretty_assertions::assert_eq;

    const COND: &str = "'$(A)'=='x'";

    #[test]
    fn test_merge_items_folds_shared_targets() {
        let existing = Item::new("Compile")
            .with_include("f1;f2")
            .with_exclude("g0")
            .with_metadata("X", "a");
        let incoming = Item::new("Compile")
            .with_include("f2;f3")
            .with_exclude("g1")
            .with_metadata("X", "b");

        let result = merge_items(&incoming, &existing).unwrap();

        assert_eq!(result.kind, TargetKind::Include);
        let merged = result.merged.unwrap();
        assert_eq!(merged.include.to_string(), "f2");
        assert_eq!(merged.exclude.to_string(), "g0;g1");
        assert_eq!(merged.metadata.get("X"), Some("a;b"));
        assert_eq!(result.input.unwrap().include.to_string(), "f3");
        assert_eq!(result.existing.unwrap().include.to_string(), "f1");
    }

    #[test]
    fn test_merge_items_on_updates() {
        let existing = Item::new("None").with_update("a");
        let incoming = Item::new("None").with_update("a");

        let result = merge_items(&incoming, &existing).unwrap();

        assert_eq!(result.kind, TargetKind::Update);
        assert_eq!(result.merged.unwrap().update.to_string(), "a");
        assert!(result.input.is_none());
        assert!(result.existing.is_none());
    }

    #[test]
    fn test_merge_items_errors() {
        let existing = Item::new("Compile").with_include("a");

        assert_eq!(
            merge_items(&Item::new("Compile"), &existing),
            Err(MergeError::NoCommonTargetKind)
        );
        assert_eq!(
            merge_items(&Item::new("Content").with_include("a"), &existing),
            Err(MergeError::TypeMismatch {
                expected: "Compile".into(),
                actual: "Content".into(),
            })
        );
    }

    #[test]
    fn test_same_condition_ignores_other_scopes() {
        let mut project = Project::new();
        let plain = project.add_group("");
        let guarded = project.add_group(COND);
        project
            .append_item(guarded, Item::new("Compile").with_include("a"))
            .unwrap();
        project
            .append_item(plain, Item::new("Compile").with_condition(COND).with_include("a"))
            .unwrap();
        let destination = Destination::resolve(&project, plain).unwrap();
        let trace = RecordingTrace::new();

        let outcome = merge_same_condition(
            &project,
            Item::new("Compile").with_include("a"),
            &destination,
            &trace,
        )
        .unwrap();

        assert!(outcome.edits.is_empty());
        assert_eq!(outcome.survivor.unwrap().include.to_string(), "a");
    }

    #[test]
    fn test_same_condition_treats_blank_as_unconditioned() {
        let mut project = Project::new();
        let group = project.add_group("");
        let existing = project
            .append_item(group, Item::new("Compile").with_include("a"))
            .unwrap();
        let destination = Destination::resolve(&project, group).unwrap();

        let outcome = merge_same_condition(
            &project,
            Item::new("Compile").with_condition(" ").with_include("a"),
            &destination,
            &RecordingTrace::new(),
        )
        .unwrap();

        assert_eq!(outcome.survivor, None);
        assert_eq!(
            outcome.edits,
            vec![
                Edit::Detach { item: existing },
                Edit::Append {
                    group,
                    item: Item::new("Compile").with_include("a"),
                },
            ]
        );
    }

    #[test]
    fn test_same_condition_stops_once_consumed() {
        let mut project = Project::new();
        let group = project.add_group("");
        let first = project
            .append_item(group, Item::new("Compile").with_include("a;b"))
            .unwrap();
        let second = project
            .append_item(group, Item::new("Compile").with_include("a"))
            .unwrap();
        let destination = Destination::resolve(&project, group).unwrap();
        let trace = RecordingTrace::new();

        let outcome = merge_same_condition(
            &project,
            Item::new("Compile").with_include("a"),
            &destination,
            &trace,
        )
        .unwrap();

        assert_eq!(outcome.survivor, None);
        assert_eq!(
            outcome.edits,
            vec![
                Edit::SetTargets {
                    item: first,
                    kind: TargetKind::Include,
                    targets: TargetSet::parse("b"),
                },
                Edit::Append {
                    group,
                    item: Item::new("Compile").with_include("a"),
                },
            ]
        );
        assert!(!outcome.edits.contains(&Edit::Detach { item: second }));
    }

    #[test]
    fn test_no_condition_skips_unconditioned_scope() {
        let mut project = Project::new();
        let group = project.add_group("");
        project
            .append_item(group, Item::new("Compile").with_include("a"))
            .unwrap();
        let destination = Destination::resolve(&project, group).unwrap();
        let incoming = Item::new("Compile").with_include("a");

        let outcome =
            merge_no_condition(&project, incoming.clone(), &destination, &RecordingTrace::new())
                .unwrap();

        assert_eq!(outcome, PassOutcome::skipped(incoming));
    }

    #[test]
    fn test_no_condition_keeps_targets_with_new_metadata() {
        let mut project = Project::new();
        let plain = project.add_group("");
        project
            .append_item(plain, Item::new("Compile").with_include("a;b"))
            .unwrap();
        let guarded = project.add_group(COND);
        let destination = Destination::resolve(&project, guarded).unwrap();
        let incoming = Item::new("Compile")
            .with_include("a;c")
            .with_metadata("Visible", "false");

        let outcome =
            merge_no_condition(&project, incoming.clone(), &destination, &RecordingTrace::new())
                .unwrap();

        assert_eq!(outcome.survivor, Some(incoming));
        assert_eq!(
            outcome.edits,
            vec![Edit::ExtendRemove {
                group: guarded,
                item_type: "Compile".into(),
                targets: TargetSet::parse("a;c"),
            }]
        );
    }

    #[test]
    fn test_no_condition_partial_encompass() {
        let mut project = Project::new();
        let plain = project.add_group("");
        project
            .append_item(plain, Item::new("Compile").with_include("a"))
            .unwrap();
        let guarded = project.add_group(COND);
        let destination = Destination::resolve(&project, guarded).unwrap();
        let trace = RecordingTrace::new();

        let outcome = merge_no_condition(
            &project,
            Item::new("Compile").with_include("a;b"),
            &destination,
            &trace,
        )
        .unwrap();

        assert_eq!(outcome.survivor.unwrap().include.to_string(), "b");
        assert_eq!(
            outcome.edits,
            vec![Edit::ExtendRemove {
                group: guarded,
                item_type: "Compile".into(),
                targets: TargetSet::parse("a;b"),
            }]
        );
        assert!(trace.events().contains(&TraceEvent::Encompassed {
            pass: Pass::NoCondition,
            kind: TargetKind::Include,
            targets: TargetSet::parse("a"),
        }));
    }

    #[test]
    fn test_has_condition_detaches_fully_covered() {
        let mut project = Project::new();
        let plain = project.add_group("");
        let guarded = project.add_group(COND);
        let existing = project
            .append_item(guarded, Item::new("Compile").with_include("a"))
            .unwrap();
        let destination = Destination::resolve(&project, plain).unwrap();
        let incoming = Item::new("Compile").with_include("a;b");

        let outcome =
            merge_has_condition(&project, incoming.clone(), &destination, &RecordingTrace::new())
                .unwrap();

        assert_eq!(outcome.survivor, Some(incoming));
        assert_eq!(outcome.edits, vec![Edit::Detach { item: existing }]);
    }

    #[test]
    fn test_has_condition_keeps_differing_metadata() {
        let mut project = Project::new();
        let plain = project.add_group("");
        let guarded = project.add_group(COND);
        project
            .append_item(
                guarded,
                Item::new("Compile").with_include("a;b").with_metadata("Link", "x"),
            )
            .unwrap();
        let destination = Destination::resolve(&project, plain).unwrap();

        let outcome = merge_has_condition(
            &project,
            Item::new("Compile").with_include("a"),
            &destination,
            &RecordingTrace::new(),
        )
        .unwrap();

        assert_eq!(
            outcome.edits,
            vec![Edit::ExtendRemove {
                group: plain,
                item_type: "Compile".into(),
                targets: TargetSet::parse("a"),
            }]
        );
    }

    #[test]
    fn test_has_condition_skips_conditioned_incoming() {
        let mut project = Project::new();
        let plain = project.add_group("");
        let destination = Destination::resolve(&project, plain).unwrap();
        let incoming = Item::new("Compile").with_condition(COND).with_include("a");

        let outcome =
            merge_has_condition(&project, incoming.clone(), &destination, &RecordingTrace::new())
                .unwrap();

        assert_eq!(outcome, PassOutcome::skipped(incoming));
    }
}
