//! Plan command - show pending downloads.

use std::path::Path;

use console::style;
use vfrtiles::state::VersionStore;

use crate::error::CliError;
use crate::runner::CliRunner;

pub fn run(config_path: Option<&Path>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("plan");

    let orchestrator = runner.orchestrator()?;
    let plan = orchestrator.plan_only()?;

    if plan.is_empty() {
        println!(
            "{} All {} charts are up to date.",
            style("✓").green().bold(),
            plan.up_to_date.len()
        );
        return Ok(());
    }

    println!("{}", style("Charts to download").bold());
    for task in &plan.tasks {
        let recorded = orchestrator
            .versions()
            .get(&task.identifier)
            .map_or_else(|| "none".to_string(), |v| v.to_string());
        println!(
            "  {:<32} {} -> {}",
            style(&task.identifier).cyan(),
            recorded,
            task.version
        );
    }
    println!();
    println!(
        "{} to download, {} up to date",
        plan.tasks.len(),
        plan.up_to_date.len()
    );

    Ok(())
}
