//! Output formatting for the CLI.

use anyhow::Result;
use console::style;
use itemmerge_core::{ApplyOutcome, Metadata};
use itemmerge_fs::document::{ChildDocument, GroupDocument};
use itemmerge_fs::{ProjectDocument, ReportFormat, RunReport};
use serde::Serialize;
use std::fmt::Write;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl From<ReportFormat> for OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Human => Self::Human,
            ReportFormat::Json => Self::Json,
            ReportFormat::Yaml => Self::Yaml,
        }
    }
}

/// Print output in the specified format.
pub fn print<T: Serialize + HumanDisplay>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => print!("{}", value.human_display()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

/// Print a success message.
pub fn print_success(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Human => println!("{}", style(message).green()),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "status": "ok", "message": message }));
        }
        OutputFormat::Yaml => {
            println!("status: ok\nmessage: {message}");
        }
    }
}

/// Trait for human-readable display.
pub trait HumanDisplay {
    fn human_display(&self) -> String;
}

impl HumanDisplay for RunReport {
    fn human_display(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "{} {} → {}",
            style("✓").green().bold(),
            self.project.display(),
            self.output.display()
        );

        for batch in &self.batches {
            let mode = if batch.merge_existing { "merge" } else { "append" };
            let _ = writeln!(
                out,
                "  {} → {} ({mode}): {} appended, {} consumed",
                batch.batch.display(),
                style(&batch.destination).cyan(),
                batch.appended(),
                batch.consumed(),
            );
            for (index, outcome) in batch.outcomes.iter().enumerate() {
                if *outcome == ApplyOutcome::Consumed {
                    let note = style(format!("item {index} merged away")).dim();
                    let _ = writeln!(out, "    {note}");
                }
            }
        }

        out
    }
}

impl HumanDisplay for ProjectDocument {
    fn human_display(&self) -> String {
        let mut out = String::new();
        for group in &self.groups {
            write_group(&mut out, group, 0);
        }
        if out.is_empty() {
            out.push_str("(empty project)\n");
        }
        out
    }
}

fn write_group(out: &mut String, group: &GroupDocument, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut header = group
        .label
        .as_deref()
        .map_or_else(|| "group".to_string(), |label| format!("group {label}"));
    if !group.condition.is_empty() {
        let _ = write!(header, " if {}", group.condition);
    }
    let _ = writeln!(out, "{indent}{}", style(header).bold());

    for child in &group.children {
        match child {
            ChildDocument::Item(item) => {
                let _ = writeln!(out, "{indent}  {item}");
                for (name, value) in item.metadata.iter() {
                    let _ = writeln!(out, "{indent}    {}: {value}", style(name).dim());
                }
            }
            ChildDocument::Group(nested) => write_group(out, nested, depth + 1),
        }
    }
}

impl HumanDisplay for Metadata {
    fn human_display(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.iter() {
            let _ = writeln!(out, "{name}: {value}");
        }
        out
    }
}
