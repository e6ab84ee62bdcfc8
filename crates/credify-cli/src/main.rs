//! Credify CLI
//!
//! Command-line interface for issuing and verifying soulbound academic
//! credentials.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "credify")]
#[command(author, version, about = "Credify: soulbound academic credentials", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue credentials for every student in a JSON rows file
    Issue {
        /// Rows file: an array of students or `{treeId, collectionId, rows}`
        #[arg(short, long)]
        input: PathBuf,

        /// Merkle tree receiving the leaves
        #[arg(long, env = "CREDIFY_TREE_ID")]
        tree: Option<String>,

        /// Collection the credentials belong to
        #[arg(long, env = "CREDIFY_COLLECTION")]
        collection: Option<String>,

        /// Write the batch outcome as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the confirmation prompt for the live backend
        #[arg(short, long)]
        yes: bool,
    },

    /// Verify a minted credential
    Verify {
        /// Asset id
        asset_id: String,

        /// DAS endpoint to query
        #[arg(long, env = "CREDIFY_DAS_URL")]
        das_url: Option<String>,
    },

    /// Render one certificate to a PNG file
    Render {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        major: String,

        /// Issue date, `YYYY-MM-DD` (default: today)
        #[arg(short, long)]
        date: Option<String>,

        /// Certificate id printed on the card
        #[arg(long)]
        id: Option<String>,

        #[arg(short, long, default_value = "certificate.png")]
        output: PathBuf,
    },

    /// Show the program authority every credential delegates to
    Authority {
        #[arg(long, env = "CREDIFY_PROGRAM_ID")]
        program_id: Option<String>,
    },

    /// Show configuration and status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("credify={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Issue {
            input,
            tree,
            collection,
            output,
            yes,
        } => {
            commands::issue::run(commands::issue::IssueArgs {
                input,
                tree,
                collection,
                output,
                yes,
            })
            .await?;
        }
        Commands::Verify { asset_id, das_url } => {
            commands::verify::run(&asset_id, das_url).await?;
        }
        Commands::Render {
            name,
            major,
            date,
            id,
            output,
        } => {
            commands::render::run(name, major, date, id, &output).await?;
        }
        Commands::Authority { program_id } => {
            commands::authority::show(program_id.as_deref())?;
        }
        Commands::Status => {
            commands::status::show()?;
        }
    }

    Ok(())
}
