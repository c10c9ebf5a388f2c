//! Workspace: a directory with an optional `itemmerge.yml`, and the runs made in it.

use crate::config::RunConfig;
use crate::document::{load_batch, load_project, save_project};
use crate::error::{FsError, Result};
use itemmerge_core::{Applicator, ApplyOutcome, MergeTrace};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration file name.
pub const CONFIG_FILE: &str = "itemmerge.yml";

/// A directory that project and batch paths are resolved against.
#[derive(Debug)]
pub struct Workspace {
    /// Root path of the workspace.
    root: PathBuf,
    /// Run configuration.
    config: RunConfig,
}

/// Per-run overrides.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Forces merging on or off for every batch.
    pub merge_existing: Option<bool>,
    /// Where to write the result; the project file itself when `None`.
    pub output: Option<PathBuf>,
}

/// What a run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub project: PathBuf,
    pub output: PathBuf,
    pub batches: Vec<BatchReport>,
}

/// What one batch did.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch: PathBuf,
    pub destination: String,
    pub merge_existing: bool,
    pub outcomes: Vec<ApplyOutcome>,
}

impl BatchReport {
    /// Number of items that were appended.
    #[must_use]
    pub fn appended(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ApplyOutcome::Appended(_)))
            .count()
    }

    /// Number of items absorbed by existing items.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.outcomes.len() - self.appended()
    }
}

impl Workspace {
    /// Write a default config into `path`.
    ///
    /// # Errors
    /// Returns error if a config already exists or IO fails.
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let config_path = root.join(CONFIG_FILE);

        if config_path.exists() {
            return Err(FsError::WorkspaceExists(root));
        }

        fs::create_dir_all(&root)?;
        let config = RunConfig::default();
        fs::write(&config_path, serde_yaml::to_string(&config)?)?;

        info!(path = %root.display(), "Initialized workspace");

        Ok(Self { root, config })
    }

    /// Open `path`, reading its config if present and using defaults otherwise.
    ///
    /// # Errors
    /// Returns error if the config exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let config_path = root.join(CONFIG_FILE);

        let config = if config_path.exists() {
            serde_yaml::from_str(&fs::read_to_string(&config_path)?)?
        } else {
            RunConfig::default()
        };

        debug!(path = %root.display(), "Opened workspace");

        Ok(Self { root, config })
    }

    /// Create a workspace with an explicit config and nothing on disk.
    #[must_use]
    pub fn with_config(path: impl AsRef<Path>, config: RunConfig) -> Self {
        Self {
            root: path.as_ref().to_path_buf(),
            config,
        }
    }

    /// Get the run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Resolve `path` against the workspace root unless it is absolute.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Apply `batches` to the project at `project_path`, in order, and save it.
    ///
    /// Nothing is written if any batch fails.
    ///
    /// # Errors
    /// Returns error if a document cannot be read, a destination is missing or
    /// unknown, or the merge engine rejects an item.
    pub fn run(
        &self,
        project_path: &Path,
        batches: &[PathBuf],
        options: &RunOptions,
        trace: &dyn MergeTrace,
    ) -> Result<RunReport> {
        let project_path = self.resolve(project_path);
        let mut project = load_project(&project_path)?;
        let applicator = Applicator::new(trace);
        let mut reports = Vec::with_capacity(batches.len());

        for batch_path in batches {
            let batch_path = self.resolve(batch_path);
            let batch = load_batch(&batch_path)?;

            let label = batch
                .destination
                .or_else(|| self.config.merge.default_destination.clone())
                .ok_or_else(|| FsError::MissingDestination(batch_path.clone()))?;
            let destination = project
                .find_group(&label)
                .ok_or_else(|| FsError::UnknownGroup(label.clone()))?;
            let merge_existing = options
                .merge_existing
                .or(batch.merge_existing)
                .unwrap_or(self.config.merge.merge_existing);

            let outcomes =
                applicator.apply_all(&mut project, batch.items, Some(destination), merge_existing)?;

            info!(
                batch = %batch_path.display(),
                destination = %label,
                items = outcomes.len(),
                "Applied batch"
            );

            reports.push(BatchReport {
                batch: batch_path,
                destination: label,
                merge_existing,
                outcomes,
            });
        }

        let output = options
            .output
            .as_deref()
            .map_or_else(|| project_path.clone(), |p| self.resolve(p));
        save_project(&output, &project)?;

        Ok(RunReport {
            project: project_path,
            output,
            batches: reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ChildDocument, ProjectDocument};
    use itemmerge_core::{Item, RecordingTrace};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const PROJECT: &str = r#"
groups:
  - label: main
    children:
      - item: { type: Compile, include: "f1;f2" }
  - label: debug
    condition: "'$(A)'=='x'"
"#;

    fn setup(project: &str) -> (TempDir, Workspace) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("project.yml"), project).unwrap();
        let ws = Workspace::open(tmp.path()).unwrap();
        (tmp, ws)
    }

    fn group_items(path: &Path, index: usize) -> Vec<Item> {
        let document: ProjectDocument =
            serde_yaml::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        document.groups[index]
            .children
            .iter()
            .filter_map(|c| match c {
                ChildDocument::Item(item) => Some(item.clone()),
                ChildDocument::Group(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_init_workspace() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();

        assert!(tmp.path().join(CONFIG_FILE).exists());
        assert_eq!(ws.config().version, 1);
        assert!(matches!(
            Workspace::init(tmp.path()),
            Err(FsError::WorkspaceExists(_))
        ));
        assert_eq!(Workspace::open(tmp.path()).unwrap().config(), ws.config());
    }

    #[test]
    fn test_run_applies_batches_in_order() {
        let (tmp, ws) = setup(PROJECT);
        fs::write(
            tmp.path().join("1.yml"),
            "destination: debug\nitems:\n  - { type: Compile, condition: \"'$(A)'=='x'\", include: f1 }\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("2.yml"),
            "destination: main\nitems:\n  - { type: Compile, include: f3 }\n",
        )
        .unwrap();

        let report = ws
            .run(
                Path::new("project.yml"),
                &[PathBuf::from("1.yml"), PathBuf::from("2.yml")],
                &RunOptions::default(),
                &RecordingTrace::new(),
            )
            .unwrap();

        assert_eq!(report.batches.len(), 2);
        assert_eq!(report.batches[0].consumed(), 1);
        assert_eq!(report.batches[1].appended(), 1);
        assert_eq!(report.output, tmp.path().join("project.yml"));

        let path = tmp.path().join("project.yml");
        assert_eq!(
            group_items(&path, 0),
            vec![
                Item::new("Compile").with_include("f1;f2"),
                Item::new("Compile").with_include("f3"),
            ]
        );
        assert_eq!(group_items(&path, 1), vec![Item::new("Compile").with_remove("f1")]);
    }

    #[test]
    fn test_no_merge_override_and_output_path() {
        let (tmp, ws) = setup(PROJECT);
        fs::write(
            tmp.path().join("batch.yml"),
            "destination: main\nmerge_existing: true\nitems:\n  - { type: Compile, include: f1 }\n",
        )
        .unwrap();

        let report = ws
            .run(
                Path::new("project.yml"),
                &[PathBuf::from("batch.yml")],
                &RunOptions {
                    merge_existing: Some(false),
                    output: Some(PathBuf::from("out.yml")),
                },
                &RecordingTrace::new(),
            )
            .unwrap();

        assert!(!report.batches[0].merge_existing);
        assert_eq!(group_items(&tmp.path().join("out.yml"), 0).len(), 2);
        assert_eq!(group_items(&tmp.path().join("project.yml"), 0).len(), 1);
    }

    #[test]
    fn test_default_destination_from_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("project.yml"), PROJECT).unwrap();
        fs::write(
            tmp.path().join("batch.yml"),
            "items:\n  - { type: Content, include: x }\n",
        )
        .unwrap();

        let ws = Workspace::with_config(tmp.path(), RunConfig::with_default_destination("main"));
        let report = ws
            .run(
                Path::new("project.yml"),
                &[PathBuf::from("batch.yml")],
                &RunOptions::default(),
                &RecordingTrace::new(),
            )
            .unwrap();
        assert_eq!(report.batches[0].destination, "main");

        let ws = Workspace::with_config(tmp.path(), RunConfig::default());
        let result = ws.run(
            Path::new("project.yml"),
            &[PathBuf::from("batch.yml")],
            &RunOptions::default(),
            &RecordingTrace::new(),
        );
        assert!(matches!(result, Err(FsError::MissingDestination(_))));
    }

    #[test]
    fn test_unknown_destination() {
        let (tmp, ws) = setup(PROJECT);
        fs::write(tmp.path().join("batch.yml"), "destination: nope\nitems: []\n").unwrap();

        let result = ws.run(
            Path::new("project.yml"),
            &[PathBuf::from("batch.yml")],
            &RunOptions::default(),
            &RecordingTrace::new(),
        );

        assert!(matches!(result, Err(FsError::UnknownGroup(label)) if label == "nope"));
    }
}
