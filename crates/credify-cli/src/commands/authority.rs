//! Authority command - show the derived program authority

use anyhow::Result;
use console::style;
use credify_crypto::{ProgramAuthority, AUTHORITY_SEED, DEFAULT_PROGRAM_ID};

pub fn show(program_id: Option<&str>) -> Result<()> {
    let program_id = program_id.unwrap_or(DEFAULT_PROGRAM_ID);
    let authority = ProgramAuthority::for_program(program_id)?;

    println!("\n{}", style("Program Authority").bold().underlined());
    println!();
    println!("  Program:       {}", authority.program_id);
    println!(
        "  Seed:          {}",
        String::from_utf8_lossy(AUTHORITY_SEED)
    );
    println!("  Authority:     {}", style(authority.address).green());
    println!("  Bump:          {}", authority.bump);
    println!();
    println!(
        "{}",
        style("Credentials whose delegate is not this address are not soulbound.").dim()
    );
    Ok(())
}
