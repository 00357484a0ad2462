//! vfrtiles CLI - Command-line interface
//!
//! Keeps a tile set of FAA VFR sectional charts up to date, downloading
//! and reprocessing only the charts that changed since the last run.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigAction;

#[derive(Parser)]
#[command(name = "vfrtiles")]
#[command(about = "Incrementally maintained map tiles from FAA VFR sectional charts", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file (default: ~/.vfrtiles/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download new chart editions and bring every stage and the tiles up to date
    Run,

    /// Show which charts the next run would download, without changing anything
    Plan,

    /// Show the processing state of every known chart
    Status,

    /// Delete every artifact of a chart so the next run rebuilds it
    Invalidate {
        /// Chart identifiers (e.g. Seattle, Western_Aleutian_Islands)
        #[arg(required = true)]
        charts: Vec<String>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Run => commands::run::run(config),
        Commands::Plan => commands::plan::run(config),
        Commands::Status => commands::status::run(config),
        Commands::Invalidate { charts } => commands::invalidate::run(config, &charts),
        Commands::Config { action } => commands::config::run(config, action),
    };

    if let Err(e) = result {
        e.exit();
    }
}
