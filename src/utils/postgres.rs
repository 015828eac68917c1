//! PostgreSQL subprocess utilities
//!
//! Drives the system `psql` and `pg_dump` binaries. Connection settings are
//! passed through the standard libpq environment variables so the tools pick
//! them up without command-line plumbing.

use crate::config::PostgresConfig;
use crate::utils::command;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Catalog query for user-visible databases
const LIST_DATABASES_QUERY: &str =
    "SELECT datname FROM pg_database WHERE datistemplate = false;";

/// Environment variables for the postgres client tools
pub struct PgEnv {
    vars: HashMap<String, String>,
}

impl PgEnv {
    /// Build the client environment from connection settings.
    ///
    /// Reads the password file; a trailing newline (the usual way such files
    /// are written) is trimmed.
    pub fn from_config(config: &PostgresConfig) -> Result<Self> {
        let password = std::fs::read_to_string(&config.password_file).with_context(|| {
            format!(
                "Failed to read postgres password file: {:?}",
                config.password_file
            )
        })?;

        let mut vars = HashMap::new();
        vars.insert("PGHOST".to_string(), config.host.clone());
        vars.insert("PGPORT".to_string(), config.port.to_string());
        vars.insert("PGUSER".to_string(), config.user.clone());
        vars.insert("PGPASSWORD".to_string(), password.trim_end().to_string());
        Ok(Self { vars })
    }

    /// Add custom environment variable
    #[allow(dead_code)]
    pub fn add(&mut self, key: String, value: String) {
        self.vars.insert(key, value);
    }

    /// Get all environment variables
    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }
}

/// List databases on the server, minus the configured exclusions.
///
/// Failure here is fatal to a backup run: without the database set there is
/// nothing meaningful to back up or prune.
pub fn list_databases(env: &PgEnv, excludes: &[String], timeout: Duration) -> Result<Vec<String>> {
    info!("Listing databases");

    let stdout = command::run_command_stdout(
        "psql",
        &[
            "--dbname",
            "postgres",
            "--no-align",
            "--tuples-only",
            "--command",
            LIST_DATABASES_QUERY,
        ],
        env.vars(),
        Some(timeout),
    )
    .context("Failed to list databases")?;

    let mut databases: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|name| !excludes.iter().any(|excluded| excluded == name))
        .map(str::to_string)
        .collect();
    databases.sort_unstable();

    debug!("Found {} databases after exclusions", databases.len());
    Ok(databases)
}

/// Dump one database in custom format, returning the dump bytes.
pub fn dump_database(env: &PgEnv, database: &str, timeout: Duration) -> Result<Vec<u8>> {
    info!("Dumping database: {}", database);

    let output = command::run_command(
        "pg_dump",
        &["--format", "custom", database],
        env.vars(),
        Some(timeout),
    )
    .with_context(|| format!("pg_dump failed for database: {}", database))?;

    debug!(
        "pg_dump produced {} bytes for '{}'",
        output.stdout.len(),
        database
    );
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_with_password(dir: &tempfile::TempDir, password: &str) -> PostgresConfig {
        let password_path = dir.path().join("password");
        let mut file = std::fs::File::create(&password_path).unwrap();
        write!(file, "{}", password).unwrap();

        PostgresConfig {
            host: "db.internal".to_string(),
            port: 5433,
            user: "backup".to_string(),
            password_file: password_path,
            exclude_databases: vec![],
        }
    }

    #[test]
    fn test_env_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = config_with_password(&dir, "s3cret\n");
        let env = PgEnv::from_config(&config).unwrap();

        assert_eq!(env.vars().get("PGHOST").unwrap(), "db.internal");
        assert_eq!(env.vars().get("PGPORT").unwrap(), "5433");
        assert_eq!(env.vars().get("PGUSER").unwrap(), "backup");
        assert_eq!(env.vars().get("PGPASSWORD").unwrap(), "s3cret");
    }

    #[test]
    fn test_env_missing_password_file() {
        let config = PostgresConfig {
            host: "db.internal".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password_file: std::path::PathBuf::from("/nonexistent/password"),
            exclude_databases: vec![],
        };
        assert!(PgEnv::from_config(&config).is_err());
    }
}
