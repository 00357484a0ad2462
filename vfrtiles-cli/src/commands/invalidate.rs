//! Invalidate command - force charts to be rebuilt.

use std::path::Path;

use console::style;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

pub fn run(config_path: Option<&Path>, charts: &[String]) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("invalidate");

    let mut orchestrator = runner.orchestrator()?;

    for chart in charts {
        let removed = orchestrator.invalidate(chart)?;
        info!(chart = %chart, removed = removed.len(), "Chart invalidated");
        if removed.is_empty() {
            println!("{}: nothing to remove", style(chart).cyan());
        } else {
            println!("{}: removed {} files", style(chart).cyan(), removed.len());
            for path in &removed {
                println!("  {}", path.display());
            }
        }
    }

    println!();
    println!("Run `vfrtiles run` to download and rebuild them.");
    Ok(())
}
