//! Run command - one full incremental update.

use std::path::Path;

use console::style;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the pipeline once and print the report.
///
/// Returns [`CliError::RunFailures`] when the run completed but a download,
/// a stage, or the tile build failed.
pub fn run(config_path: Option<&Path>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("run");

    let mut orchestrator = runner.orchestrator()?;

    println!("{}", style("Updating VFR sectional tiles").bold());
    println!("  Work dir: {}", orchestrator.layout().work_dir().display());
    println!("  Tiles:    {}", orchestrator.layout().tiles_dir().display());
    println!();

    let report = orchestrator.run()?;
    println!("{}", report);
    println!();

    if report.has_failures() {
        println!(
            "{} Some charts were not processed; they will be retried on the next run.",
            style("!").yellow().bold()
        );
        return Err(CliError::RunFailures);
    }

    println!("{} Tiles are up to date.", style("✓").green().bold());
    Ok(())
}
