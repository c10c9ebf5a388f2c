//! Project tree stored as an arena of groups and items.
//!
//! Nodes are addressed by [`GroupId`] / [`ItemId`]; parent links are ids, not
//! pointers. Detaching an item unlinks it from its group but keeps its slot,
//! so ids stay stable for the lifetime of the project.

use crate::condition::ConditionChain;
use crate::error::{MergeError, Result};
use crate::item::Item;
use crate::targets::{TargetKind, TargetSet};
use serde::Serialize;
use tracing::debug;

/// Handle to a group in a [`Project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupId(usize);

/// Handle to an item in a [`Project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(usize);

/// A child slot of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Item(ItemId),
    Group(GroupId),
}

/// An ordered, optionally guarded container of items and nested groups.
#[derive(Debug, Clone, Default)]
pub struct Group {
    /// Name used to address the group from batch documents.
    pub label: Option<String>,
    /// Own guard expression; empty means unconditioned.
    pub condition: String,
    parent: Option<GroupId>,
    children: Vec<Child>,
}

impl Group {
    /// Children in document order.
    #[must_use]
    pub fn children(&self) -> &[Child] {
        &self.children
    }
}

#[derive(Debug, Clone)]
struct ItemNode {
    item: Item,
    parent: Option<GroupId>,
}

/// A single change to the tree, produced by the merge passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Replace one target list of an existing item.
    SetTargets {
        item: ItemId,
        kind: TargetKind,
        targets: TargetSet,
    },
    /// Unlink an existing item from its group.
    Detach { item: ItemId },
    /// Append a new item to a group.
    Append { group: GroupId, item: Item },
    /// Add targets to the group's remove-only record for `item_type`, creating it if needed.
    ExtendRemove {
        group: GroupId,
        item_type: String,
        targets: TargetSet,
    },
}

/// Root of the tree: owns every group and item.
#[derive(Debug, Clone, Default)]
pub struct Project {
    groups: Vec<Group>,
    items: Vec<ItemNode>,
    roots: Vec<GroupId>,
}

impl Project {
    /// Create an empty project.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level group.
    pub fn add_group(&mut self, condition: impl Into<String>) -> GroupId {
        let id = GroupId(self.groups.len());
        self.groups.push(Group {
            condition: condition.into(),
            ..Group::default()
        });
        self.roots.push(id);
        id
    }

    /// Add a group nested inside `parent`, after its current children.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` if `parent` is not a group of this project.
    pub fn add_nested_group(
        &mut self,
        parent: GroupId,
        condition: impl Into<String>,
    ) -> Result<GroupId> {
        self.group(parent)?;
        let id = GroupId(self.groups.len());
        self.groups.push(Group {
            condition: condition.into(),
            parent: Some(parent),
            ..Group::default()
        });
        self.groups[parent.0].children.push(Child::Group(id));
        Ok(id)
    }

    /// Top-level groups in document order.
    #[must_use]
    pub fn roots(&self) -> &[GroupId] {
        &self.roots
    }

    /// Look up a group.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` for an unknown id.
    pub fn group(&self, id: GroupId) -> Result<&Group> {
        self.groups
            .get(id.0)
            .ok_or_else(|| MergeError::InvalidArgument(format!("unknown group {id:?}")))
    }

    /// Mutable access to a group's label and condition.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` for an unknown id.
    pub fn group_mut(&mut self, id: GroupId) -> Result<&mut Group> {
        self.groups
            .get_mut(id.0)
            .ok_or_else(|| MergeError::InvalidArgument(format!("unknown group {id:?}")))
    }

    /// First group carrying `label`, in creation order.
    #[must_use]
    pub fn find_group(&self, label: &str) -> Option<GroupId> {
        self.groups
            .iter()
            .position(|g| g.label.as_deref() == Some(label))
            .map(GroupId)
    }

    /// Look up an item, attached or not.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` for an unknown id.
    pub fn item(&self, id: ItemId) -> Result<&Item> {
        self.node(id).map(|n| &n.item)
    }

    /// Mutable access to an item.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` for an unknown id.
    pub fn item_mut(&mut self, id: ItemId) -> Result<&mut Item> {
        self.items
            .get_mut(id.0)
            .map(|n| &mut n.item)
            .ok_or_else(|| MergeError::InvalidArgument(format!("unknown item {id:?}")))
    }

    /// The group holding `id`, or `None` once detached.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` for an unknown id.
    pub fn item_parent(&self, id: ItemId) -> Result<Option<GroupId>> {
        self.node(id).map(|n| n.parent)
    }

    /// Append a copy of `item` to `group`.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` if `group` is not a group of this project.
    pub fn append_item(&mut self, group: GroupId, item: Item) -> Result<ItemId> {
        self.group(group)?;
        let id = ItemId(self.items.len());
        debug!(group = group.0, item = %item, "Appending item");
        self.items.push(ItemNode {
            item,
            parent: Some(group),
        });
        self.groups[group.0].children.push(Child::Item(id));
        Ok(id)
    }

    /// Unlink an item from its group. Detaching twice is a no-op.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` for an unknown id.
    pub fn detach_item(&mut self, id: ItemId) -> Result<()> {
        let parent = self.node(id)?.parent;
        if let Some(group) = parent {
            self.groups[group.0]
                .children
                .retain(|c| *c != Child::Item(id));
            self.items[id.0].parent = None;
            debug!(group = group.0, item = %self.items[id.0].item, "Detached item");
        }
        Ok(())
    }

    /// Every attached item in document order (depth first over the root groups).
    #[must_use]
    pub fn items(&self) -> Vec<ItemId> {
        let mut out = Vec::new();
        for root in &self.roots {
            self.collect_items(*root, &mut out);
        }
        out
    }

    /// Items directly inside `group`, in order.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` for an unknown id.
    pub fn group_items(&self, group: GroupId) -> Result<Vec<ItemId>> {
        Ok(self
            .group(group)?
            .children
            .iter()
            .filter_map(|c| match c {
                Child::Item(id) => Some(*id),
                Child::Group(_) => None,
            })
            .collect())
    }

    /// Conditions of `group` and its ancestors, outermost first.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` for an unknown id.
    pub fn group_chain(&self, group: GroupId) -> Result<ConditionChain> {
        let mut conditions = Vec::new();
        let mut current = Some(group);
        while let Some(id) = current {
            let g = self.group(id)?;
            conditions.push(g.condition.as_str());
            current = g.parent;
        }
        Ok(conditions.into_iter().rev().collect())
    }

    /// Chain of the item's group followed by the item's own condition.
    /// A detached item only has its own condition.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` for an unknown id.
    pub fn item_chain(&self, id: ItemId) -> Result<ConditionChain> {
        let node = self.node(id)?;
        let chain = match node.parent {
            Some(group) => self.group_chain(group)?,
            None => ConditionChain::new(),
        };
        Ok(chain.with(&node.item.condition))
    }

    /// Apply edits in order.
    ///
    /// # Errors
    /// Returns `MergeError::InvalidArgument` if an edit names an unknown id.
    pub fn apply_edits(&mut self, edits: Vec<Edit>) -> Result<()> {
        for edit in edits {
            match edit {
                Edit::SetTargets {
                    item,
                    kind,
                    targets,
                } => {
                    *self.item_mut(item)?.targets_mut(kind) = targets;
                }
                Edit::Detach { item } => self.detach_item(item)?,
                Edit::Append { group, item } => {
                    self.append_item(group, item)?;
                }
                Edit::ExtendRemove {
                    group,
                    item_type,
                    targets,
                } => self.extend_remove(group, &item_type, &targets)?,
            }
        }
        Ok(())
    }

    fn extend_remove(
        &mut self,
        group: GroupId,
        item_type: &str,
        targets: &TargetSet,
    ) -> Result<()> {
        let existing = self.group_items(group)?.into_iter().find(|id| {
            let item = &self.items[id.0].item;
            item.item_type == item_type && item.is_remove_only()
        });

        match existing {
            Some(id) => {
                let item = &mut self.items[id.0].item;
                item.remove.extend_from(targets);
                debug!(
                    group = group.0,
                    added = targets.len(),
                    item = %item,
                    "Extended remove item"
                );
            }
            None => {
                self.append_item(group, Item::remove_only(item_type, targets.clone()))?;
            }
        }
        Ok(())
    }

    fn node(&self, id: ItemId) -> Result<&ItemNode> {
        self.items
            .get(id.0)
            .ok_or_else(|| MergeError::InvalidArgument(format!("unknown item {id:?}")))
    }

    fn collect_items(&self, group: GroupId, out: &mut Vec<ItemId>) {
        for child in &self.groups[group.0].children {
            match child {
                Child::Item(id) => out.push(*id),
                Child::Group(nested) => self.collect_items(*nested, out),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_items_in_document_order() {
        let mut project = Project::new();
        let outer = project.add_group("");
        let a = project.append_item(outer, Item::new("Compile").with_include("a")).unwrap();
        let nested = project.add_nested_group(outer, "'$(A)'=='x'").unwrap();
        let b = project.append_item(nested, Item::new("Compile").with_include("b")).unwrap();
        let c = project.append_item(outer, Item::new("Compile").with_include("c")).unwrap();
        let second = project.add_group("");
        let d = project.append_item(second, Item::new("Compile").with_include("d")).unwrap();

        assert_eq!(project.items(), vec![a, b, c, d]);
        assert_eq!(project.group_items(outer).unwrap(), vec![a, c]);
    }

    #[test]
    fn test_chains() {
        let mut project = Project::new();
        let outer = project.add_group("outer");
        let plain = project.add_nested_group(outer, "").unwrap();
        let inner = project.add_nested_group(plain, "inner").unwrap();
        let item = project
            .append_item(inner, Item::new("Compile").with_condition("own").with_include("a"))
            .unwrap();

        let chain = project.group_chain(inner).unwrap();
        assert_eq!(chain.conditions(), ["outer".to_string(), "inner".to_string()]);
        assert_eq!(project.item_chain(item).unwrap().conditions().len(), 3);
        let bare = project.add_group("");
        assert!(project.group_chain(bare).unwrap().is_empty());
    }

    #[test]
    fn test_detach() {
        let mut project = Project::new();
        let group = project.add_group("");
        let id = project.append_item(group, Item::new("Compile").with_include("a")).unwrap();

        project.detach_item(id).unwrap();
        assert!(project.items().is_empty());
        assert_eq!(project.item_parent(id).unwrap(), None);
        assert_eq!(project.item(id).unwrap().include.to_string(), "a");

        project.detach_item(id).unwrap();
        assert!(project.item_chain(id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_ids_are_invalid_arguments() {
        let mut other = Project::new();
        let foreign = other.add_group("");
        other.add_group("");
        let stray = other.append_item(foreign, Item::new("Compile")).unwrap();

        let mut project = Project::new();
        assert!(matches!(
            project.append_item(GroupId(1), Item::new("Compile")),
            Err(MergeError::InvalidArgument(_))
        ));
        assert!(matches!(project.item(stray), Err(MergeError::InvalidArgument(_))));
    }

    #[test]
    fn test_extend_remove_reuses_record() {
        let mut project = Project::new();
        let group = project.add_group("");
        project
            .apply_edits(vec![
                Edit::ExtendRemove {
                    group,
                    item_type: "Compile".into(),
                    targets: TargetSet::parse("a;b"),
                },
                Edit::ExtendRemove {
                    group,
                    item_type: "Compile".into(),
                    targets: TargetSet::parse("b;c"),
                },
                Edit::ExtendRemove {
                    group,
                    item_type: "Content".into(),
                    targets: TargetSet::parse("a"),
                },
            ])
            .unwrap();

        let items = project.items();
        assert_eq!(items.len(), 2);
        assert_eq!(project.item(items[0]).unwrap().remove.to_string(), "a;b;c");
        assert_eq!(project.item(items[1]).unwrap().item_type, "Content");
    }

    #[test]
    fn test_extend_remove_skips_guarded_or_described_records() {
        let mut project = Project::new();
        let group = project.add_group("");
        let guarded = Item::new("Compile")
            .with_condition("'$(B)'=='y'")
            .with_remove("z");
        let described = Item::new("Compile")
            .with_remove("w")
            .with_metadata("Visible", "false");
        project.append_item(group, guarded.clone()).unwrap();
        project.append_item(group, described.clone()).unwrap();

        project
            .apply_edits(vec![Edit::ExtendRemove {
                group,
                item_type: "Compile".into(),
                targets: TargetSet::parse("f1"),
            }])
            .unwrap();

        let items: Vec<Item> = project
            .items()
            .into_iter()
            .map(|id| project.item(id).unwrap().clone())
            .collect();
        assert_eq!(
            items,
            vec![guarded, described, Item::new("Compile").with_remove("f1")]
        );
    }

    #[test]
    fn test_find_group_by_label() {
        let mut project = Project::new();
        let first = project.add_group("");
        let second = project.add_group("c");
        project.group_mut(second).unwrap().label = Some("conditional".into());

        assert_eq!(project.find_group("conditional"), Some(second));
        assert_ne!(project.find_group("conditional"), Some(first));
        assert_eq!(project.find_group("missing"), None);
    }
}
