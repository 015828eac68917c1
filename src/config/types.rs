use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Directory holding one subdirectory of dump files per database
    #[serde(default = "default_backup_directory")]
    pub backup_directory: PathBuf,

    /// strftime pattern for the date embedded in dump filenames
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Extension of dump files, including the leading dot
    #[serde(default = "default_backup_extension")]
    pub backup_extension: String,

    /// Default retention policy
    #[serde(default = "default_retention_daily")]
    pub retention_daily: u32,
    #[serde(default = "default_retention_weekly")]
    pub retention_weekly: u32,
    #[serde(default = "default_retention_monthly")]
    pub retention_monthly: u32,

    /// Timeout settings
    #[serde(default = "default_dump_timeout")]
    pub dump_timeout_seconds: u64,
    #[serde(default = "default_list_timeout")]
    pub list_timeout_seconds: u64,

    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            backup_directory: default_backup_directory(),
            date_format: default_date_format(),
            backup_extension: default_backup_extension(),
            retention_daily: default_retention_daily(),
            retention_weekly: default_retention_weekly(),
            retention_monthly: default_retention_monthly(),
            dump_timeout_seconds: default_dump_timeout(),
            list_timeout_seconds: default_list_timeout(),
            log_directory: default_log_directory(),
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
        }
    }
}

impl GlobalConfig {
    /// Retention quotas as a policy value
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            daily: self.retention_daily,
            weekly: self.retention_weekly,
            monthly: self.retention_monthly,
        }
    }
}

/// PostgreSQL server connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgresConfig {
    /// Server hostname
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    /// File containing the password, newline-trimmed on read
    pub password_file: PathBuf,

    /// Databases never backed up or pruned
    #[serde(default)]
    pub exclude_databases: Vec<String>,
}

impl PostgresConfig {
    pub fn is_excluded(&self, database: &str) -> bool {
        self.exclude_databases.iter().any(|d| d == database)
    }
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub webhook_url: String,

    #[serde(default = "default_notify_on")]
    pub notify_on: Vec<NotifyEvent>,

    #[serde(default = "default_rate_limit")]
    pub rate_limit_minutes: u64,

    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            notify_on: default_notify_on(),
            rate_limit_minutes: default_rate_limit(),
            cache_file: default_cache_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifyEvent {
    Failure,
    Warning,
    Success,
}

/// GFS retention quotas. A quota of zero disables its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
}

// Default value functions

fn default_backup_directory() -> PathBuf { PathBuf::from("/backup") }
fn default_date_format() -> String { "%Y-%m-%d".to_string() }
fn default_backup_extension() -> String { ".dump".to_string() }
fn default_retention_daily() -> u32 { 2 }
fn default_retention_weekly() -> u32 { 2 }
fn default_retention_monthly() -> u32 { 2 }
fn default_dump_timeout() -> u64 { 3600 }
fn default_list_timeout() -> u64 { 60 }
fn default_log_directory() -> PathBuf { PathBuf::from("~/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_port() -> u16 { 5432 }
fn default_user() -> String { "postgres".to_string() }
fn default_notify_on() -> Vec<NotifyEvent> { vec![NotifyEvent::Failure] }
fn default_rate_limit() -> u64 { 60 }
fn default_cache_file() -> PathBuf {
    std::env::temp_dir().join("pgbackup-manager-notify-cache.json")
}
