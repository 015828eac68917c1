//! File-based locking to prevent concurrent backups

use anyhow::{Context, Result};
use fd_lock::RwLock;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lock guard for one database's backup run
///
/// Holds an advisory write lock on a per-database lock file. The lock lives
/// as long as the file handle: `acquire` takes the lock and forgets the
/// guard, and dropping `BackupLock` closes the handle, which releases it.
pub struct BackupLock {
    _lock: RwLock<std::fs::File>,
    lock_path: PathBuf,
}

impl BackupLock {
    /// Acquire an exclusive lock for a database
    /// Returns an error if the database is already being backed up
    pub fn acquire(database: &str) -> Result<Self> {
        let lock_path = Self::lock_path(database);

        debug!("Attempting to acquire lock: {:?}", lock_path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&lock_path)
            .context(format!("Failed to open lock file: {:?}", lock_path))?;

        let mut lock = RwLock::new(file);
        {
            let guard = lock.try_write().context(format!(
                "Database '{}' is already being backed up (lock held)",
                database
            ))?;
            // Keep the flock held for the lifetime of the file handle.
            std::mem::forget(guard);
        }

        info!("Acquired backup lock for database: {}", database);

        Ok(Self {
            _lock: lock,
            lock_path,
        })
    }

    /// Get the lock file path for a database
    fn lock_path(database: &str) -> PathBuf {
        #[cfg(unix)]
        let base = Path::new("/tmp");

        #[cfg(windows)]
        let base = std::env::temp_dir();

        base.join(format!("pgbackup-manager-{}.lock", database))
    }

    /// Get the lock file path (for cleanup or inspection)
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for BackupLock {
    fn drop(&mut self) {
        info!("Released backup lock: {:?}", self.lock_path);

        // Try to remove the lock file (best effort)
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            debug!("Failed to remove lock file: {}", e);
        }
    }
}
