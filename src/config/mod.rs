//! Configuration module for pgbackup-manager
//!
//! This module handles loading and validating configuration from TOML files.
//! The configuration is loaded once at startup and never mutated afterwards;
//! everything downstream borrows it.
//!
//! ## Example Usage
//!
//! ```no_run
//! use pgbackup_manager::config;
//!
//! # fn main() -> config::Result<()> {
//! let config = config::load_config("backup-config.toml")?;
//! println!("Backing up from: {}", config.postgres.host);
//! # Ok(())
//! # }
//! ```

mod loader;
mod types;

pub use loader::{load_config, ConfigError, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
