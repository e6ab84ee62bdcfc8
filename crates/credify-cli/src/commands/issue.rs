//! Issue command - run a batch from a rows file

use anyhow::{bail, Context, Result};
use console::style;
use credify_core::{BatchOutcome, IssuanceStage, StudentRecord};
use credify_issuer::{build_stack, BatchRequest, ChainBackend, IssuanceConfig, ProgressObserver};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct IssueArgs {
    pub input: PathBuf,
    pub tree: Option<String>,
    pub collection: Option<String>,
    pub output: Option<PathBuf>,
    pub yes: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowsFile {
    Request {
        #[serde(rename = "treeId", default)]
        tree_id: Option<String>,
        #[serde(rename = "collectionId", default)]
        collection_id: Option<String>,
        rows: Vec<StudentRecord>,
    },
    Rows(Vec<StudentRecord>),
}

/// Parsed rows plus any tree/collection the file names
pub(crate) struct LoadedRows {
    pub tree_id: Option<String>,
    pub collection_id: Option<String>,
    pub rows: Vec<StudentRecord>,
}

pub(crate) fn load_rows(path: &Path) -> Result<LoadedRows> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: RowsFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a rows file", path.display()))?;

    Ok(match parsed {
        RowsFile::Request {
            tree_id,
            collection_id,
            rows,
        } => LoadedRows {
            tree_id,
            collection_id,
            rows,
        },
        RowsFile::Rows(rows) => LoadedRows {
            tree_id: None,
            collection_id: None,
            rows,
        },
    })
}

/// Progress bar advanced as students reach a terminal stage
struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressObserver for ProgressBarObserver {
    fn on_stage(&self, _index: usize, student: &str, stage: IssuanceStage) {
        self.bar.set_message(format!("{} {}", student, stage));
        if stage == IssuanceStage::Error {
            self.bar
                .println(format!("  {} {}", style("✗").red(), student));
        }
    }

    fn on_finished(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }
}

pub async fn run(args: IssueArgs) -> Result<()> {
    println!("\n{}", style("Issuing Credentials").bold().underlined());
    println!();

    let loaded = load_rows(&args.input)?;
    if loaded.rows.is_empty() {
        bail!("{} contains no students", args.input.display());
    }

    let config = IssuanceConfig::from_env()?;
    let stack = build_stack(&config).await?;
    tracing::debug!(rows = loaded.rows.len(), backend = %config.chain_backend, "issuance stack ready");

    let tree_id = args
        .tree
        .or(loaded.tree_id)
        .unwrap_or_else(|| stack.tree_id.to_base58());
    let collection_id = args
        .collection
        .or(loaded.collection_id)
        .unwrap_or_else(|| stack.collection_id.to_base58());

    println!("  Students:      {}", style(loaded.rows.len()).cyan());
    println!("  Backend:       {}", style(config.chain_backend).cyan());
    println!("  Tree:          {}", tree_id);
    println!("  Collection:    {}", collection_id);
    println!(
        "  Authority:     {}",
        style(stack.coordinator.authority().address).yellow()
    );
    println!();

    if config.chain_backend == ChainBackend::Live && !args.yes {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "Mint {} credentials on the live chain?",
                loaded.rows.len()
            ))
            .default(false)
            .interact()?;
        if !proceed {
            println!("{}", style("Aborted.").yellow());
            return Ok(());
        }
    }

    let bar = ProgressBar::new(loaded.rows.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let request = BatchRequest {
        tree_id,
        collection_id,
        rows: loaded.rows,
    };
    let observer = Arc::new(ProgressBarObserver { bar: bar.clone() });
    let coordinator = Arc::try_unwrap(stack.coordinator)
        .map_err(|_| anyhow::anyhow!("coordinator is shared"))?
        .with_observer(observer);

    let outcome = coordinator.issue(&request, &cancel).await?;
    bar.finish_with_message("done");
    coordinator.shutdown().await?;

    print_summary(&outcome);

    if let Some(path) = args.output {
        std::fs::write(&path, serde_json::to_string_pretty(&outcome)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("  Outcome:       {}", style(path.display()).yellow());
    }

    if config.chain_backend == ChainBackend::Mock {
        println!();
        println!(
            "{}",
            style("Mock backend: minted assets live only for this process.").dim()
        );
    }

    Ok(())
}

fn print_summary(outcome: &BatchOutcome) {
    println!();
    if outcome.failed == 0 {
        println!(
            "{}",
            style(format!("✓ Issued {} credentials", outcome.successful))
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            style(format!(
                "Issued {} of {} credentials, {} failed",
                outcome.successful, outcome.total, outcome.failed
            ))
            .yellow()
            .bold()
        );
    }
    if outcome.cancelled {
        println!("{}", style("Batch was cancelled").yellow());
    }
    println!("  Transport retries: {}", outcome.transport_retries);
    println!();

    for result in &outcome.results {
        match (&result.asset_id, &result.error_message) {
            (_, Some(err)) => println!(
                "  {} {:<32} {}",
                style("✗").red(),
                result.student_key,
                style(err).red()
            ),
            (asset, None) => println!(
                "  {} {:<32} {}",
                style("✓").green(),
                result.student_key,
                asset.as_deref().or(result.transaction_signature.as_deref()).unwrap_or("-")
            ),
        }
    }
}
