use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cmd::commands;
use cmd::common::ConfContext;
use confnav::DiffFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "confnav")]
struct Cli {
    /// Schema file (YAML, or JSON when the name ends in .json)
    #[arg(long)]
    schema: PathBuf,

    /// Datastore file; defaults to $CONFNAV_STORE
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Paths are dot-separated steps; list elements take their keys in brackets,
/// as in `outsidelist[one].insidelist[x]`.
#[derive(Subcommand)]
enum Commands {
    /// Print a leaf value, leaf-list entries or presence
    Get { path: String },
    /// Assign a leaf or add a leaf-list entry
    Set { path: String, value: String },
    /// Remove a leaf, list element, presence container or leaf-list entry
    Delete {
        path: String,
        /// Leaf-list entry to remove
        value: Option<String>,
    },
    /// Create a list element, presence container or empty leaf
    Create { path: String },
    /// List the elements of a list
    List {
        path: String,
        #[arg(long)]
        sorted: bool,
    },
    /// Child names of a node
    Children {
        #[arg(default_value = "")]
        path: String,
    },
    /// Describe the schema of a node
    Describe {
        #[arg(default_value = "")]
        path: String,
    },
    /// Print the whole datastore
    Dump {
        /// One line per path instead of a document
        #[arg(long)]
        paths: bool,
    },
    /// Replace the datastore with a document
    Load {
        file: PathBuf,
        /// Keep existing data and overlay the document
        #[arg(long)]
        merge: bool,
    },
    /// Check the datastore against the schema
    Validate,
    /// Show the edits that turn the datastore into a document
    Diff {
        file: PathBuf,
        /// Only paths starting with this prefix
        #[arg(long, default_value = "")]
        start: String,
        /// Only paths ending with this suffix
        #[arg(long, default_value = "")]
        end: String,
    },
}

impl Commands {
    fn writes(&self) -> bool {
        matches!(
            self,
            Commands::Set { .. }
                | Commands::Delete { .. }
                | Commands::Create { .. }
                | Commands::Load { .. }
        )
    }
}

#[allow(clippy::print_stdout)]
fn print_line(line: String) {
    println!("{}", line);
}

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init();

    let cli = Cli::parse();
    let ctx = ConfContext::new(cli.schema, cli.store)?.readonly(!cli.command.writes());

    match &cli.command {
        Commands::Get { path } => commands::get_command(&ctx, path, print_line).await,
        Commands::Set { path, value } => commands::set_command(&ctx, path, value).await,
        Commands::Delete { path, value } => {
            commands::delete_command(&ctx, path, value.as_deref()).await
        }
        Commands::Create { path } => commands::create_command(&ctx, path, print_line).await,
        Commands::List { path, sorted } => {
            commands::list_command(&ctx, path, *sorted, print_line).await
        }
        Commands::Children { path } => commands::children_command(&ctx, path, print_line).await,
        Commands::Describe { path } => commands::describe_command(&ctx, path, print_line).await,
        Commands::Dump { paths } => commands::dump_command(&ctx, *paths, print_line).await,
        Commands::Load { file, merge } => commands::load_command(&ctx, file, *merge).await,
        Commands::Validate => commands::validate_command(&ctx, print_line).await,
        Commands::Diff { file, start, end } => {
            let filter = DiffFilter::new(start.as_str(), end.as_str());
            commands::diff_command(&ctx, file, &filter, print_line).await
        }
    }
}
