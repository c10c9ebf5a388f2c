//! Item metadata and the rules for combining two metadata sets.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Metadata names with a "Never wins" conflict rule.
const COPY_DIRECTORY_NAMES: &[&str] = &["CopyToOutputDirectory", "CopyToPublishDirectory"];
const PACK_NAME: &str = "Pack";

/// Ordered name/value pairs attached to an item.
///
/// Lookup by name ignores ASCII case; the spelling of the first insertion is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    /// Create empty metadata.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value for `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    /// Set `name` to `value`, replacing an existing entry in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Iterate `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Same names (ignoring case) with identical values, regardless of order.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// Combine `incoming` into a copy of `existing`.
///
/// New names are appended, equal values are left alone, and differing values
/// go through [`resolve_conflict`].
#[must_use]
pub fn merge_metadata(existing: &Metadata, incoming: &Metadata) -> Metadata {
    let mut merged = existing.clone();
    for (name, value) in incoming.iter() {
        match merged.get(name) {
            None => merged.set(name, value),
            Some(current) if current == value => {}
            Some(current) => {
                let resolved = resolve_conflict(name, current, value);
                merged.set(name, resolved);
            }
        }
    }
    merged
}

/// Resolve two different values for the same metadata name.
#[must_use]
pub fn resolve_conflict(name: &str, existing: &str, incoming: &str) -> String {
    if COPY_DIRECTORY_NAMES.contains(&name) {
        if existing == "Never" || incoming == "Never" {
            "Never".to_string()
        } else {
            "PreserveNewest".to_string()
        }
    } else if name == PACK_NAME {
        if existing == "false" || incoming == "false" {
            "false".to_string()
        } else {
            "true".to_string()
        }
    } else {
        format!("{existing};{incoming}")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (name, value) in iter {
            metadata.set(name, value);
        }
        metadata
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetadataVisitor;

        impl<'de> Visitor<'de> for MetadataVisitor {
            type Value = Metadata;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of metadata names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Metadata, A::Error> {
                let mut metadata = Metadata::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    metadata.set(name, value);
                }
                Ok(metadata)
            }
        }

        deserializer.deserialize_map(MetadataVisitor)
    }
}
