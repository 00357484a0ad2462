//! Config command - manage the configuration file.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use console::style;
use vfrtiles::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

pub fn run(config_path: Option<&Path>, action: ConfigAction) -> Result<(), CliError> {
    let path = resolve(config_path);
    match action {
        ConfigAction::Init { force } => init(&path, force),
        ConfigAction::Show => show(&path),
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn resolve(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

fn init(path: &Path, force: bool) -> Result<(), CliError> {
    if force {
        ConfigFile::default().save_to(path)?;
    } else if !ConfigFile::ensure_exists(path)? {
        println!(
            "Config file already exists at {} (use --force to overwrite)",
            style(path.display()).cyan()
        );
        return Ok(());
    }

    println!(
        "{} Wrote default configuration to {}",
        style("✓").green().bold(),
        style(path.display()).cyan()
    );
    Ok(())
}

fn show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    if !path.exists() {
        println!("# {} does not exist, showing defaults", path.display());
    }
    print!("{}", config.to_ini_string());
    Ok(())
}
