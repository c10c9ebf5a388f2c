//! Project and batch documents.
//!
//! Both are stored as YAML (`.yml`, `.yaml`) or JSON (`.json`), chosen by
//! file extension. A project document nests groups; a group's `children`
//! keeps items and nested groups in document order:
//!
//! ```yaml
//! groups:
//!   - label: main
//!     children:
//!       - item: { type: Compile, include: "a.cs;b.cs" }
//!       - group:
//!           condition: "'$(Configuration)'=='Debug'"
//!           children:
//!             - item: { type: Compile, include: "debug.cs" }
//! ```

use crate::error::{FsError, Result};
use itemmerge_core::{Child, GroupId, Item, Project};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// On-disk encoding of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension.
    ///
    /// # Errors
    /// Returns `FsError::UnsupportedFormat` for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(FsError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// A whole project tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default)]
    pub groups: Vec<GroupDocument>,
}

/// One group and its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,

    #[serde(default)]
    pub children: Vec<ChildDocument>,
}

/// A child slot: an item or a nested group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildDocument {
    Item(Item),
    Group(GroupDocument),
}

impl ProjectDocument {
    /// Build the in-memory arena.
    ///
    /// # Errors
    /// Propagates arena errors.
    pub fn into_project(self) -> Result<Project> {
        let mut project = Project::new();
        for group in self.groups {
            let id = project.add_group(group.condition.clone());
            fill_group(&mut project, id, group)?;
        }
        Ok(project)
    }

    /// Capture the attached contents of `project`. Detached items are dropped.
    ///
    /// # Errors
    /// Propagates arena errors.
    pub fn from_project(project: &Project) -> Result<Self> {
        let groups = project
            .roots()
            .iter()
            .map(|id| capture_group(project, *id))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }
}

fn fill_group(project: &mut Project, id: GroupId, document: GroupDocument) -> Result<()> {
    project.group_mut(id)?.label = document.label;
    for child in document.children {
        match child {
            ChildDocument::Item(item) => {
                project.append_item(id, item)?;
            }
            ChildDocument::Group(nested) => {
                let nested_id = project.add_nested_group(id, nested.condition.clone())?;
                fill_group(project, nested_id, nested)?;
            }
        }
    }
    Ok(())
}

fn capture_group(project: &Project, id: GroupId) -> Result<GroupDocument> {
    let group = project.group(id)?;
    let children = group
        .children()
        .iter()
        .map(|child| match child {
            Child::Item(item) => Ok(ChildDocument::Item(project.item(*item)?.clone())),
            Child::Group(nested) => capture_group(project, *nested).map(ChildDocument::Group),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GroupDocument {
        label: group.label.clone(),
        condition: group.condition.clone(),
        children,
    })
}

/// Items to add to one destination group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDocument {
    /// Label of the destination group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Overrides the configured merge default when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_existing: Option<bool>,

    #[serde(default)]
    pub items: Vec<Item>,
}

/// Read a project document into an arena.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_project(path: &Path) -> Result<Project> {
    let document: ProjectDocument = read_document(path)?;
    debug!(path = %path.display(), groups = document.groups.len(), "Loaded project");
    document.into_project()
}

/// Write the attached contents of `project` to `path`.
///
/// # Errors
/// Returns an error if the file cannot be serialized or written.
pub fn save_project(path: &Path, project: &Project) -> Result<()> {
    let document = ProjectDocument::from_project(project)?;
    write_document(path, &document)?;
    debug!(path = %path.display(), "Saved project");
    Ok(())
}

/// Read a batch document.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_batch(path: &Path) -> Result<BatchDocument> {
    read_document(path)
}

/// Every yml, yaml or json file under `dir`, sorted by path.
///
/// # Errors
/// Returns an error if the directory cannot be walked.
pub fn collect_batches(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() && DocumentFormat::from_path(entry.path()).is_ok() {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = DocumentFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    Ok(match format {
        DocumentFormat::Yaml => serde_yaml::from_str(&content)?,
        DocumentFormat::Json => serde_json::from_str(&content)?,
    })
}

fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = match DocumentFormat::from_path(path)? {
        DocumentFormat::Yaml => serde_yaml::to_string(value)?,
        DocumentFormat::Json => serde_json::to_string_pretty(value)?,
    };
    fs::write(path, content)?;
    Ok(())
}
