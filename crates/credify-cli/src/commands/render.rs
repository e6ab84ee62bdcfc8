//! Render command - draw one certificate without issuing it

use anyhow::{Context, Result};
use console::style;
use credify_core::StudentRecord;
use credify_issuer::IssuanceConfig;
use std::path::Path;

pub async fn run(
    name: String,
    major: String,
    date: Option<String>,
    id: Option<String>,
    output: &Path,
) -> Result<()> {
    let config = IssuanceConfig::from_env()?;
    let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    let mut student = StudentRecord::new(name, "", major, date, "");
    if let Some(id) = id {
        student = student.with_certificate_id(id);
    }

    let renderer = config.renderer()?;
    let font = renderer.font_name().to_string();
    let artifact = tokio::task::spawn_blocking(move || renderer.render(&student)).await??;

    std::fs::write(output, &artifact.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{} {}x{} PNG ({}) written to {}",
        style("✓").green().bold(),
        artifact.width,
        artifact.height,
        font,
        style(output.display()).yellow()
    );
    Ok(())
}
