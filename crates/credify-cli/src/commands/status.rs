//! Status command - show configuration and status

use anyhow::Result;
use console::style;
use credify_issuer::{ChainBackend, IssuanceConfig};
use credify_verifier::VerifierConfig;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| format!("{} (default)", default))
}

pub fn show() -> Result<()> {
    println!("\n{}", style("Credify Status").bold().cyan());
    println!();

    println!("{}", style("Version").bold().underlined());
    println!("  credify-cli:     {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("{}", style("Issuance").bold().underlined());
    match IssuanceConfig::from_env() {
        Ok(config) => {
            println!(
                "  Backend:         {}",
                match config.chain_backend {
                    ChainBackend::Mock => style("mock (in-memory ledger)").yellow(),
                    ChainBackend::Live => style("live").green(),
                }
            );
            if let Some(relay) = &config.mint_relay_url {
                println!("  Mint relay:      {}", relay);
            }
            println!(
                "  Content store:   {}",
                config
                    .content_dir
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "in-memory".to_string())
            );
            println!("  Content base:    {}", config.content_base_uri);
            println!(
                "  Font:            {}",
                config
                    .font_path
                    .as_ref()
                    .map(|p| style(p.display().to_string()).green())
                    .unwrap_or_else(|| style("built-in ASCII bitmap".to_string()).yellow())
            );
            println!("  Tree:            {}", config.resolved_tree_id()?);
            println!("  Collection:      {}", config.resolved_collection_id()?);
            println!("  Concurrency:     {}", config.concurrency);
            println!(
                "  Group delay:     {} ms",
                config.inter_batch_delay.as_millis()
            );
            println!(
                "  Retries:         {} (initial {} ms, max {} ms, x{})",
                config.max_retries,
                config.initial_delay.as_millis(),
                config.max_delay.as_millis(),
                config.backoff_multiplier
            );
            println!("  Institution:     {}", config.institution);
            println!("  Symbol:          {}", config.symbol);
        }
        Err(err) => println!("  {}", style(err).red()),
    }
    println!();

    println!("{}", style("Verification").bold().underlined());
    match VerifierConfig::from_env() {
        Ok(config) => {
            println!(
                "  DAS endpoint:    {}",
                config
                    .das_url
                    .map(|u| style(u).green())
                    .unwrap_or_else(|| style("Not set".to_string()).yellow())
            );
            println!("  Soulbound mode:  {:?}", config.soulbound_mode);
            println!("  Program:         {}", config.program_id);
        }
        Err(err) => println!("  {}", style(err).red()),
    }
    println!();

    println!("{}", style("Server").bold().underlined());
    println!("  CREDIFY_BIND:    {}", env_or("CREDIFY_BIND", "0.0.0.0:3000"));
    println!(
        "  Admin key:       {}",
        if std::env::var("CREDIFY_ADMIN_KEY").is_ok() {
            style("Set").green()
        } else {
            style("Not set (admin routes disabled)").yellow()
        }
    );
    println!();

    Ok(())
}
