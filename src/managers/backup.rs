//! Backup manager - orchestrates dump and prune per database

use crate::config::Config;
use crate::managers::notification::NotificationManager;
use crate::retention::{evaluate, FilenameCodec, RetentionPlan};
use crate::store::{local_store_from, BackupStore};
use crate::utils::locker::BackupLock;
use crate::utils::postgres::PgEnv;
use crate::utils::postgres_ops::{PostgresOperations, RealPostgresOps};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub struct BackupManager {
    config: Config,
    store: Box<dyn BackupStore>,
    postgres: Box<dyn PostgresOperations>,
    notification_manager: Option<NotificationManager>,
}

impl BackupManager {
    /// Create new backup manager with the real collaborators
    pub fn new(config: Config) -> Self {
        let store = Box::new(local_store_from(&config.global.backup_directory));
        let postgres = Box::new(RealPostgresOps::new());
        Self::with_collaborators(config, store, postgres)
    }

    /// Create backup manager with injected collaborators (used by tests)
    pub fn with_collaborators(
        config: Config,
        store: Box<dyn BackupStore>,
        postgres: Box<dyn PostgresOperations>,
    ) -> Self {
        // Create notification manager if a webhook URL is configured
        let notification_manager = if !config.notifications.webhook_url.is_empty() {
            Some(NotificationManager::new(config.notifications.clone()))
        } else {
            None
        };

        Self {
            config,
            store,
            postgres,
            notification_manager,
        }
    }

    /// Filename codec for the configured date format and extension
    pub fn codec(&self) -> FilenameCodec {
        FilenameCodec::new(
            &self.config.global.date_format,
            &self.config.global.backup_extension,
        )
    }

    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    /// Send a failure notification (if manager is configured)
    fn notify_failure(&self, database: &str, error: &str, duration_secs: u64) {
        if let Some(ref manager) = self.notification_manager {
            if let Err(e) = manager.send_failure(database, error, Some(duration_secs)) {
                warn!("Failed to send failure notification: {}", e);
            }
        }
    }

    /// Send a warning notification (if manager is configured)
    fn notify_warning(&self, database: &str, message: &str) {
        if let Some(ref manager) = self.notification_manager {
            if let Err(e) = manager.send_warning(database, message) {
                warn!("Failed to send warning notification: {}", e);
            }
        }
    }

    /// Send a success notification (if manager is configured)
    fn notify_success(&self, database: &str, duration_secs: u64) {
        if let Some(ref manager) = self.notification_manager {
            if let Err(e) = manager.send_success(database, duration_secs) {
                warn!("Failed to send success notification: {}", e);
            }
        }
    }

    /// List databases eligible for backup (server set minus exclusions).
    ///
    /// Failure here is fatal to the run: the caller should exit non-zero.
    pub fn list_databases(&self) -> Result<Vec<String>> {
        let env = PgEnv::from_config(&self.config.postgres)?;
        self.postgres.list_databases(
            &env,
            &self.config.postgres.exclude_databases,
            Duration::from_secs(self.config.global.list_timeout_seconds),
        )
    }

    /// Dump one database and persist it under today's identifier
    pub fn backup_database(&self, database: &str, today: NaiveDate) -> Result<String> {
        let identifier = self.codec().encode(database, today);

        let env = PgEnv::from_config(&self.config.postgres)?;
        let bytes = self
            .postgres
            .dump_database(
                &env,
                database,
                Duration::from_secs(self.config.global.dump_timeout_seconds),
            )
            .context(format!("Failed to dump database '{}'", database))?;

        self.store
            .write(database, &identifier, &bytes)
            .context(format!("Failed to persist backup '{}'", identifier))?;

        info!("Wrote backup {} ({} bytes)", identifier, bytes.len());
        Ok(identifier)
    }

    /// Compute the retention plan for a database without touching anything
    pub fn plan_database(&self, database: &str, today: NaiveDate) -> Result<RetentionPlan> {
        let codec = self.codec();
        let listing = self
            .store
            .list(database)
            .context(format!("Failed to list backups for '{}'", database))?;
        let dates = codec.decode_all(database, &listing);
        Ok(evaluate(
            &dates,
            &self.config.global.retention_policy(),
            today,
        ))
    }

    /// Apply the retention policy to one database's backup files.
    ///
    /// Deletion is best-effort: every discarded identifier is attempted even
    /// if earlier removals fail, and the failures are reported together at
    /// the end.
    pub fn prune_database(&self, database: &str, today: NaiveDate) -> Result<RetentionPlan> {
        let codec = self.codec();
        let plan = self.plan_database(database, today)?;

        for date in &plan.retained {
            info!("Retaining {}", codec.encode(database, *date));
        }

        if plan.is_noop() {
            info!("No backups to prune for '{}'", database);
            return Ok(plan);
        }

        info!(
            "Pruning {} of {} backups for '{}'",
            plan.discarded.len(),
            plan.retained.len() + plan.discarded.len(),
            database
        );

        let mut failures = Vec::new();
        for date in &plan.discarded {
            let identifier = codec.encode(database, *date);
            match self.store.remove(database, &identifier) {
                Ok(()) => info!("Deleted {}", identifier),
                Err(e) => {
                    warn!("Failed to delete {}: {}", identifier, e);
                    failures.push(format!("{}: {}", identifier, e));
                }
            }
        }

        if !failures.is_empty() {
            self.notify_warning(
                database,
                &format!("{} backup file(s) could not be deleted", failures.len()),
            );
            anyhow::bail!(
                "Failed to delete {} backup(s) for '{}': {}",
                failures.len(),
                database,
                failures.join(", ")
            );
        }

        Ok(plan)
    }

    /// Run dump-then-prune for a single database.
    ///
    /// A dump failure does not skip pruning: pre-existing files still get
    /// their retention pass.
    pub fn run_database(&self, database: &str) -> Result<()> {
        // Prevent a slow run and the next scheduled run from interleaving
        let _lock = BackupLock::acquire(database)
            .context(format!("Failed to acquire lock for database '{}'", database))?;

        let start_time = Instant::now();
        let today = Self::today();

        info!("Starting backup for database: {}", database);

        let mut errors = Vec::new();

        match self.backup_database(database, today) {
            Ok(identifier) => {
                info!("Successfully backed up '{}' as {}", database, identifier);
            }
            Err(e) => {
                let error_msg = format!("{:#}", e);
                error!("Failed to back up '{}': {}", database, error_msg);
                self.notify_failure(database, &error_msg, start_time.elapsed().as_secs());
                errors.push(error_msg);
            }
        }

        match self.prune_database(database, today) {
            Ok(plan) => {
                info!(
                    "Retention for '{}': {} retained, {} discarded",
                    database,
                    plan.retained.len(),
                    plan.discarded.len()
                );
            }
            Err(e) => {
                let error_msg = format!("{:#}", e);
                error!("Failed to prune '{}': {}", database, error_msg);
                errors.push(error_msg);
            }
        }

        let duration = start_time.elapsed();
        info!(
            "Backup for database '{}' completed in {:.2}s",
            database,
            duration.as_secs_f64()
        );

        if !errors.is_empty() {
            anyhow::bail!(
                "Backup failed for database '{}': {}",
                database,
                errors.join("; ")
            );
        }

        self.notify_success(database, duration.as_secs());
        Ok(())
    }

    /// Run dump-then-prune for every database on the server
    pub fn run_all(&self) -> Result<()> {
        info!("Starting backup for all databases");

        let databases = self
            .list_databases()
            .context("Failed to list databases")?;

        if databases.is_empty() {
            warn!("No databases to back up");
            return Ok(());
        }

        info!("Found {} databases", databases.len());

        let mut success_count = 0;
        let mut failure_count = 0;
        let mut errors = Vec::new();

        for database in &databases {
            match self.run_database(database) {
                Ok(_) => {
                    success_count += 1;
                }
                Err(e) => {
                    failure_count += 1;
                    errors.push(format!("{}: {}", database, e));
                    error!("Failed to back up database '{}': {}", database, e);
                }
            }
        }

        info!(
            "Backup summary: {} succeeded, {} failed",
            success_count, failure_count
        );

        if failure_count > 0 {
            anyhow::bail!(
                "{} database(s) failed to back up:\n{}",
                failure_count,
                errors.join("\n")
            );
        }

        Ok(())
    }
}
