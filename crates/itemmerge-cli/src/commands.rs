//! CLI command implementations.

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result, bail};
use itemmerge_core::{Metadata, TracingTrace};
use itemmerge_fs::{ProjectDocument, RunOptions, Workspace, collect_batches, load_project};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Arguments of `itemmerge apply`.
pub struct ApplyArgs {
    pub project: PathBuf,
    pub batches: Vec<PathBuf>,
    pub batch_dir: Option<PathBuf>,
    pub no_merge: bool,
    pub output: Option<PathBuf>,
}

/// Write a default config.
pub fn init(path: &Path, format: Option<OutputFormat>) -> Result<()> {
    let ws = Workspace::init(path).context("Failed to initialize workspace")?;
    output::print_success(
        &format!("Initialized workspace at {}", path.display()),
        resolve_format(format, &ws),
    );
    Ok(())
}

/// Apply batches to a project document.
pub fn apply(path: &Path, args: &ApplyArgs, format: Option<OutputFormat>) -> Result<()> {
    let ws = Workspace::open(path).context("Failed to open workspace")?;
    let format = resolve_format(format, &ws);

    let batches = match &args.batch_dir {
        Some(dir) => collect_batches(&ws.resolve(dir)).context("Failed to collect batches")?,
        None => args.batches.clone(),
    };
    if batches.is_empty() {
        bail!("No batch documents to apply");
    }
    debug!(batches = batches.len(), no_merge = args.no_merge, "Collected batches");

    let options = RunOptions {
        merge_existing: args.no_merge.then_some(false),
        output: args.output.clone(),
    };
    let report = ws
        .run(&args.project, &batches, &options, &TracingTrace)
        .context("Failed to apply batches")?;

    output::print(&report, format)
}

/// Print a project document.
pub fn show(path: &Path, project: &Path, format: Option<OutputFormat>) -> Result<()> {
    let ws = Workspace::open(path).context("Failed to open workspace")?;
    let project = load_project(&ws.resolve(project)).context("Failed to load project")?;
    let document = ProjectDocument::from_project(&project)?;
    output::print(&document, resolve_format(format, &ws))
}

/// Merge two metadata sets given as `name=value` lists.
pub fn merge_metadata(
    existing: &[String],
    incoming: &[String],
    format: Option<OutputFormat>,
) -> Result<()> {
    let existing = parse_metadata(existing).context("Failed to parse existing metadata")?;
    let incoming = parse_metadata(incoming).context("Failed to parse incoming metadata")?;
    let merged = itemmerge_core::merge_metadata(&existing, &incoming);
    output::print(&merged, format.unwrap_or_default())
}

fn resolve_format(format: Option<OutputFormat>, ws: &Workspace) -> OutputFormat {
    format.unwrap_or_else(|| ws.config().output.format.into())
}

fn parse_metadata(entries: &[String]) -> Result<Metadata> {
    entries
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .with_context(|| format!("expected 'name=value', got '{entry}'"))
        })
        .collect()
}
