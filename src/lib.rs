//! Pgbackup Manager Library
//!
//! This library provides backup orchestration for PostgreSQL servers:
//! scheduled `pg_dump` backups plus Grandfather-Father-Son pruning of the
//! resulting dump files.

pub mod config;
pub mod managers;
pub mod retention;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config, RetentionPolicy};
pub use managers::backup::BackupManager;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::notification::NotificationManager;
pub use retention::{evaluate, FilenameCodec, RetentionPlan};
pub use store::{BackupStore, LocalStore};
