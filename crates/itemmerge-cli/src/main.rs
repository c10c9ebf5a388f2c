//! itemmerge CLI - merge item batches into project documents.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "itemmerge")]
#[command(author, version, about = "Merge conditional item batches into project documents")]
#[command(propagate_version = true)]
struct Cli {
    /// Output format (defaults to the workspace config)
    #[arg(long, global = true)]
    format: Option<output::OutputFormat>,

    /// Workspace path (defaults to current directory)
    #[arg(long, short = 'C', global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default itemmerge.yml
    Init,

    /// Apply item batches to a project document
    Apply {
        /// Project document (yml, yaml or json)
        #[arg(long, short = 'p')]
        project: PathBuf,

        /// Batch documents, applied in the order given
        #[arg(long, short = 'b', required_unless_present = "batch_dir")]
        batch: Vec<PathBuf>,

        /// Directory of batch documents, applied in path order
        #[arg(long, conflicts_with = "batch")]
        batch_dir: Option<PathBuf>,

        /// Append items without merging them into existing items
        #[arg(long)]
        no_merge: bool,

        /// Write the result here instead of over the project document
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print a project document's groups and items
    Show {
        /// Project document (yml, yaml or json)
        #[arg(long, short = 'p')]
        project: PathBuf,
    },

    /// Merge two metadata sets and print the result
    MergeMetadata {
        /// Existing entries (name=value)
        #[arg(long, short = 'e')]
        existing: Vec<String>,

        /// Incoming entries (name=value)
        #[arg(long, short = 'i')]
        incoming: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Determine workspace path
    let workspace_path = match cli.path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init => commands::init(&workspace_path, cli.format),
        Commands::Apply {
            project,
            batch,
            batch_dir,
            no_merge,
            output,
        } => commands::apply(
            &workspace_path,
            &commands::ApplyArgs {
                project,
                batches: batch,
                batch_dir,
                no_merge,
                output,
            },
            cli.format,
        ),
        Commands::Show { project } => commands::show(&workspace_path, &project, cli.format),
        Commands::MergeMetadata { existing, incoming } => {
            commands::merge_metadata(&existing, &incoming, cli.format)
        }
    }
}
