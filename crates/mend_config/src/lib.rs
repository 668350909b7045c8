//! Parsing and validation of `mend.toml` configuration files.
//!
//! The configuration is a plain key/value structure: where the manifest lives,
//! which sources phase receives new files, the subdirectory allow-list used to
//! break duplicate ties, the backup suffix, and files to register.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{find_config_file, load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
