//! User configuration (`~/.vfrtiles/config.ini`).
//!
//! Settings structs live in [`settings`], constants in [`defaults`],
//! parsing in `parser`, and serialization in `writer`.
//!
//! # Example
//!
//! ```
//! use vfrtiles::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! assert!(config.tiles.min_zoom <= config.tiles.max_zoom);
//! let layout = config.layout();
//! assert!(layout.work_dir().ends_with("tmp"));
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::*;
