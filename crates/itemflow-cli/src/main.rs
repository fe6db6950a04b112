//! itemflow CLI - Item management and batch processing from the command line.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use itemflow_core::ItemId;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "itemflow")]
#[command(author, version, about = "Item management and batch processing CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    format: output::OutputFormat,

    /// Workspace path (defaults to current directory)
    #[arg(long, short = 'C', global = true)]
    path: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new workspace
    Init {
        /// Workspace name
        #[arg(long)]
        name: Option<String>,
    },

    /// Create a new item
    New {
        /// Item name
        #[arg(long, short = 'n')]
        name: String,

        /// Item description
        #[arg(long, short = 'd')]
        description: String,

        /// Contact email
        #[arg(long, short = 'e')]
        email: String,

        /// Initial status (defaults to the workspace default)
        #[arg(long, short = 's')]
        status: Option<String>,
    },

    /// List items
    #[command(alias = "ls")]
    List {
        /// Filter by status
        #[arg(long, short = 's')]
        status: Option<String>,
    },

    /// Get an item by id
    Get {
        /// Item id
        id: ItemId,
    },

    /// Change fields of an item
    Set {
        /// Item id
        id: ItemId,

        /// New name
        #[arg(long, short = 'n')]
        name: Option<String>,

        /// New description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// New contact email
        #[arg(long, short = 'e')]
        email: Option<String>,

        /// New status
        #[arg(long, short = 's')]
        status: Option<String>,
    },

    /// Delete an item
    #[command(alias = "rm")]
    Delete {
        /// Item id
        id: ItemId,
    },

    /// Mark every item as processed
    Process {
        /// Maximum number of items processed at once
        #[arg(long, short = 'w', env = "ITEMFLOW_WORKERS")]
        workers: Option<usize>,

        /// Simulated work per item, in milliseconds
        #[arg(long, env = "ITEMFLOW_DELAY_MS")]
        delay_ms: Option<u64>,
    },

    /// Start the HTTP API
    Serve {
        /// Port to listen on
        #[arg(long, short = 'p', default_value = "8080")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Determine workspace path
    let workspace_path = match cli.path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Commands::Init { name } => commands::init(&workspace_path, name, cli.format),
        Commands::New {
            name,
            description,
            email,
            status,
        } => {
            commands::new_item(&workspace_path, name, description, email, status, cli.format)
                .await
        }
        Commands::List { status } => commands::list(&workspace_path, status, cli.format).await,
        Commands::Get { id } => commands::get(&workspace_path, id, cli.format).await,
        Commands::Set {
            id,
            name,
            description,
            email,
            status,
        } => {
            let changes = commands::FieldChanges {
                name,
                description,
                email,
                status,
            };
            commands::set(&workspace_path, id, changes, cli.format).await
        }
        Commands::Delete { id } => commands::delete(&workspace_path, id, cli.format).await,
        Commands::Process { workers, delay_ms } => {
            commands::process(&workspace_path, workers, delay_ms, cli.format).await
        }
        Commands::Serve { port, host } => {
            itemflow_server::serve(&workspace_path, &host, port).await
        }
    }
}
