//! Verify command - check a minted credential through a DAS endpoint

use anyhow::{bail, Result};
use console::style;
use credify_verifier::{
    DasAssetQuery, PolicyStatus, VerificationEngine, VerificationOutcome, VerifierConfig,
};
use std::sync::Arc;

pub async fn run(asset_id: &str, das_url: Option<String>) -> Result<()> {
    let mut config = VerifierConfig::from_env()?;
    if das_url.is_some() {
        config.das_url = das_url;
    }
    let Some(url) = config.das_url.clone() else {
        bail!("verification needs a DAS endpoint: pass --das-url or set CREDIFY_DAS_URL");
    };

    let engine = VerificationEngine::from_config(&config, Arc::new(DasAssetQuery::new(&url)?))?;

    println!("\n{}", style("Verifying Credential").bold().underlined());
    println!();
    println!("  Asset:         {}", style(asset_id).cyan());
    println!("  Endpoint:      {}", url);
    println!();

    match engine.verify(asset_id).await {
        VerificationOutcome::Verified(v) => {
            println!("{}", style("✓ Credential is authentic").green().bold());
            println!();
            println!("  Owner:         {}", v.owner);
            println!("  Metadata:      {}", v.metadata_uri);
            println!("  Tree:          {}", v.tree_id);
            println!("  Root:          {}", v.root);
            let policy = match v.policy {
                PolicyStatus::Compliant => style("soulbound").green(),
                PolicyStatus::NonCompliant => style("NOT soulbound").red(),
                PolicyStatus::Unchecked => style("not checked").dim(),
            };
            println!("  Policy:        {}", policy);
            if let Some(matches) = v.collection_match {
                println!(
                    "  Collection:    {}",
                    if matches {
                        style("matches").green()
                    } else {
                        style("does not match").red()
                    }
                );
            }
            Ok(())
        }
        VerificationOutcome::Invalid { reason } => {
            println!("{}", style("✗ Credential is invalid").red().bold());
            bail!("{}", reason)
        }
        VerificationOutcome::Error { reason } => {
            bail!("could not determine authenticity: {}", reason)
        }
    }
}
