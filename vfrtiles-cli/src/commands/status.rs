//! Status command - per-chart processing state.

use std::path::Path;

use console::style;
use vfrtiles::pipeline::AssetState;

use crate::error::CliError;
use crate::runner::CliRunner;

pub fn run(config_path: Option<&Path>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    let orchestrator = runner.orchestrator()?;
    let charts = orchestrator.status()?;

    if charts.is_empty() {
        println!("No charts downloaded yet. Run `vfrtiles run` to start.");
        return Ok(());
    }

    println!("{:<32} {:>10}  State", style("Chart").bold(), style("Version").bold());
    for chart in &charts {
        let version = chart
            .version
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        let state = match chart.state {
            AssetState::Tiled => style(chart.state.to_string()).green(),
            AssetState::Missing => style(chart.state.to_string()).red(),
            _ => style(chart.state.to_string()).yellow(),
        };
        println!("{:<32} {:>10}  {}", chart.identifier, version, state);
    }

    let tiled = charts
        .iter()
        .filter(|c| c.state == AssetState::Tiled)
        .count();
    println!();
    println!("{} of {} charts in the tile set", tiled, charts.len());

    Ok(())
}
