//! Ordered target sets and the algebra the merge passes run on.
//!
//! A target list is written as a `;`-separated string in documents
//! (`"a.cs;b.cs"`). Internally it is an ordered, duplicate-free list so
//! that intersect/union/subtract never have to re-split strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which target list of an item an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Targets the item adds.
    Include,
    /// Targets the item modifies in place.
    Update,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Include => write!(f, "include"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// An ordered, duplicate-free list of target strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TargetSet {
    entries: Vec<String>,
}

impl TargetSet {
    /// Create an empty target set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parse a `;`-separated target list. Blank entries are dropped.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        input.split(';').collect()
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `target` is in the set.
    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.entries.iter().any(|t| t == target)
    }

    /// Iterate targets in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Add a target at the end. Returns false if it was already present.
    pub fn insert(&mut self, target: impl Into<String>) -> bool {
        let target = target.into();
        let target = target.trim();
        if target.is_empty() || self.contains(target) {
            return false;
        }
        self.entries.push(target.to_string());
        true
    }

    /// Append every target of `other` not already present.
    pub fn extend_from(&mut self, other: &Self) {
        for target in other.iter() {
            self.insert(target);
        }
    }

    /// Targets present in both sets, in `self` order.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|t| other.contains(t))
                .cloned()
                .collect(),
        }
    }

    /// `self` followed by the targets of `other` it does not already hold.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.extend_from(other);
        out
    }

    /// Remove each target of `targets`. Targets not present are ignored.
    pub fn subtract(&mut self, targets: &Self) {
        self.entries.retain(|t| !targets.contains(t));
    }

    /// True when every target of `self` is also in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.iter().all(|t| other.contains(t))
    }

    /// True when the two sets share at least one target.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.iter().any(|t| other.contains(t))
    }
}

impl<S: AsRef<str>> FromIterator<S> for TargetSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for target in iter {
            set.insert(target.as_ref());
        }
        set
    }
}

impl From<&str> for TargetSet {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for TargetSet {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<TargetSet> for String {
    fn from(value: TargetSet) -> Self {
        value.entries.join(";")
    }
}

impl fmt::Display for TargetSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entries.join(";"))
    }
}
