//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use vfrtiles::catalog::CatalogError;
use vfrtiles::config::ConfigFileError;
use vfrtiles::fetch::FetchError;
use vfrtiles::orchestrator::RunError;

/// Exit code of a run that completed but had failures.
pub const EXIT_RUN_FAILURES: i32 = 2;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be loaded or saved
    Config(ConfigFileError),
    /// Catalog could not be created or listed
    Catalog(CatalogError),
    /// HTTP fetcher could not be created
    Fetcher(FetchError),
    /// A run aborted
    Run(RunError),
    /// A run completed, but some charts failed
    RunFailures,
}

impl CliError {
    /// Exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::RunFailures => EXIT_RUN_FAILURES,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in the configuration file, or recreate it with:");
                eprintln!("  vfrtiles config init --force");
            }
            CliError::Run(RunError::Store(_)) => {
                eprintln!();
                eprintln!("The state files in the work directory could not be used.");
                eprintln!("Removing version_index.json and completion_ledger.json forces");
                eprintln!("every chart to be downloaded and processed again.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Catalog(e) => write!(f, "Catalog error: {}", e),
            CliError::Fetcher(e) => write!(f, "Failed to create downloader: {}", e),
            CliError::Run(e) => write!(f, "Run aborted: {}", e),
            CliError::RunFailures => write!(f, "Run finished with failures"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Catalog(e) => Some(e),
            CliError::Fetcher(e) => Some(e),
            CliError::Run(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        CliError::Catalog(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetcher(e)
    }
}

impl From<RunError> for CliError {
    fn from(e: RunError) -> Self {
        CliError::Run(e)
    }
}
