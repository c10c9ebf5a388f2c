//! Item model.

use crate::metadata::Metadata;
use crate::targets::{TargetKind, TargetSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single declarative rule: a typed, optionally guarded list of targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Category tag (e.g., "Compile", "Content"). Items only interact with same-typed items.
    #[serde(rename = "type")]
    pub item_type: String,

    /// Own guard expression; empty means unconditioned.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,

    /// Targets this item adds.
    #[serde(default, skip_serializing_if = "TargetSet::is_empty")]
    pub include: TargetSet,

    /// Targets this item modifies in place.
    #[serde(default, skip_serializing_if = "TargetSet::is_empty")]
    pub update: TargetSet,

    /// Targets subtracted from include/update evaluation.
    #[serde(default, skip_serializing_if = "TargetSet::is_empty")]
    pub exclude: TargetSet,

    /// Targets subtracted from every earlier item during evaluation.
    #[serde(default, skip_serializing_if = "TargetSet::is_empty")]
    pub remove: TargetSet,

    /// Named properties attached to the matched targets.
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Item {
    /// Create an empty item of the given type.
    #[must_use]
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            ..Self::default()
        }
    }

    /// Create a synthetic item that only removes `targets`.
    #[must_use]
    pub fn remove_only(item_type: impl Into<String>, targets: TargetSet) -> Self {
        Self {
            remove: targets,
            ..Self::new(item_type)
        }
    }

    /// Set the item's own condition.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Set include targets from a `;`-separated list.
    #[must_use]
    pub fn with_include(mut self, targets: &str) -> Self {
        self.include = TargetSet::parse(targets);
        self
    }

    /// Set update targets from a `;`-separated list.
    #[must_use]
    pub fn with_update(mut self, targets: &str) -> Self {
        self.update = TargetSet::parse(targets);
        self
    }

    /// Set exclude targets from a `;`-separated list.
    #[must_use]
    pub fn with_exclude(mut self, targets: &str) -> Self {
        self.exclude = TargetSet::parse(targets);
        self
    }

    /// Set remove targets from a `;`-separated list.
    #[must_use]
    pub fn with_remove(mut self, targets: &str) -> Self {
        self.remove = TargetSet::parse(targets);
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.set(name, value);
        self
    }

    /// The target list selected by `kind`.
    #[must_use]
    pub const fn targets(&self, kind: TargetKind) -> &TargetSet {
        match kind {
            TargetKind::Include => &self.include,
            TargetKind::Update => &self.update,
        }
    }

    /// Mutable access to the target list selected by `kind`.
    pub const fn targets_mut(&mut self, kind: TargetKind) -> &mut TargetSet {
        match kind {
            TargetKind::Include => &mut self.include,
            TargetKind::Update => &mut self.update,
        }
    }

    /// The kind a merge is driven by: include when present, else update.
    #[must_use]
    pub fn primary_kind(&self) -> Option<TargetKind> {
        if !self.include.is_empty() {
            Some(TargetKind::Include)
        } else if !self.update.is_empty() {
            Some(TargetKind::Update)
        } else {
            None
        }
    }

    /// Kinds with at least one target, include first.
    #[must_use]
    pub fn active_kinds(&self) -> Vec<TargetKind> {
        [TargetKind::Include, TargetKind::Update]
            .into_iter()
            .filter(|kind| !self.targets(*kind).is_empty())
            .collect()
    }

    /// True when the item still includes or updates something.
    #[must_use]
    pub fn has_targets(&self) -> bool {
        !self.include.is_empty() || !self.update.is_empty()
    }

    /// True when the item has no own guard. Blank conditions count as none.
    #[must_use]
    pub fn is_unconditioned(&self) -> bool {
        self.condition.trim().is_empty()
    }

    /// True when both items carry the same own guard, ignoring surrounding whitespace.
    #[must_use]
    pub fn same_condition(&self, other: &Self) -> bool {
        self.condition.trim() == other.condition.trim()
    }

    /// True for a synthetic removal record: unguarded, no metadata, only removes.
    #[must_use]
    pub fn is_remove_only(&self) -> bool {
        self.include.is_empty()
            && self.update.is_empty()
            && self.exclude.is_empty()
            && !self.remove.is_empty()
            && self.is_unconditioned()
            && self.metadata.is_empty()
    }

    /// Targets of `kind` shared with `other`, in this item's order.
    #[must_use]
    pub fn intersect(&self, kind: TargetKind, other: &Self) -> TargetSet {
        self.targets(kind).intersect(other.targets(kind))
    }

    /// True when the items share an include or an update target.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.include.overlaps(&other.include) || self.update.overlaps(&other.update)
    }

    /// Drop `targets` from the list selected by `kind`.
    pub fn subtract(&mut self, kind: TargetKind, targets: &TargetSet) {
        self.targets_mut(kind).subtract(targets);
    }

    /// Same type, same remove list and equivalent metadata.
    ///
    /// Conditions, targets and excludes are not compared.
    #[must_use]
    pub fn equivalent_except_targets(&self, other: &Self) -> bool {
        self.item_type == other.item_type
            && self.remove == other.remove
            && self.metadata.equivalent(&other.metadata)
    }

    /// Targets of `kind` in this item that `encompassing` already declares identically.
    ///
    /// Empty unless the two items are equivalent apart from their targets and
    /// `encompassing` excludes nothing this item does not also exclude.
    #[must_use]
    pub fn encompassed_by(&self, encompassing: &Self, kind: TargetKind) -> TargetSet {
        if encompassing.equivalent_except_targets(self)
            && encompassing.exclude.is_subset_of(&self.exclude)
        {
            self.intersect(kind, encompassing)
        } else {
            TargetSet::new()
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.item_type)?;
        let fields = [
            ("condition", self.condition.clone()),
            ("include", self.include.to_string()),
            ("update", self.update.to_string()),
            ("exclude", self.exclude.to_string()),
            ("remove", self.remove.to_string()),
        ];
        for (name, value) in fields.iter().filter(|(_, v)| !v.is_empty()) {
            write!(f, " {name}=\"{value}\"")?;
        }
        Ok(())
    }
}
