//! Backup store abstraction
//!
//! All filesystem access for dump files goes through the `BackupStore`
//! trait: one subdirectory per database under the backup root, one dump file
//! per (database, date). The manager consumes `list` and `remove` for
//! pruning and `write` for fresh dumps; tests substitute the in-memory mock.

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Abstraction over the directory of backup files, enabling mocking in tests
pub trait BackupStore: Send + Sync {
    /// List raw filenames present for a database, sorted.
    ///
    /// A database without a backup directory has no backups: empty list,
    /// not an error.
    fn list(&self, database: &str) -> Result<Vec<String>>;

    /// Remove a single backup file
    fn remove(&self, database: &str, identifier: &str) -> Result<()>;

    /// Whether the database has a backup directory at all
    fn exists(&self, database: &str) -> bool;

    /// Persist dump bytes, creating the database directory if needed
    fn write(&self, database: &str, identifier: &str, bytes: &[u8]) -> Result<()>;
}

/// Store rooted at the configured backup directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn database_dir(&self, database: &str) -> PathBuf {
        self.root.join(database)
    }

    /// Full path of one backup file (for logging and direct inspection)
    pub fn path_of(&self, database: &str, identifier: &str) -> PathBuf {
        self.database_dir(database).join(identifier)
    }
}

impl BackupStore for LocalStore {
    fn list(&self, database: &str) -> Result<Vec<String>> {
        let dir = self.database_dir(database);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to read backup directory: {:?}", dir))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            // Non-UTF-8 names can't be backup files we wrote; skip them.
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort_unstable();
        Ok(names)
    }

    fn remove(&self, database: &str, identifier: &str) -> Result<()> {
        let path = self.path_of(database, identifier);
        fs::remove_file(&path).with_context(|| format!("Failed to remove backup: {:?}", path))
    }

    fn exists(&self, database: &str) -> bool {
        self.database_dir(database).is_dir()
    }

    fn write(&self, database: &str, identifier: &str, bytes: &[u8]) -> Result<()> {
        let dir = self.database_dir(database);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create backup directory: {:?}", dir))?;

        let path = dir.join(identifier);
        fs::write(&path, bytes).with_context(|| format!("Failed to write backup: {:?}", path))
    }
}

/// Expand a possibly tilde-prefixed backup root into a store
pub fn local_store_from(root: &Path) -> LocalStore {
    LocalStore::new(crate::config::expand_tilde(root))
}

/// An in-memory store for testing that records calls and can fail on demand
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockStore {
        files: Arc<Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>>,
        failing_removals: Arc<Mutex<HashSet<String>>>,
        /// Recorded (database, identifier) removal attempts, including failed ones
        removals: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a database directory with (empty) backup files
        pub fn with_files(self, database: &str, identifiers: &[&str]) -> Self {
            {
                let mut files = self.files.lock().unwrap();
                let entries = files.entry(database.to_string()).or_default();
                for identifier in identifiers {
                    entries.insert(identifier.to_string(), Vec::new());
                }
            }
            self
        }

        /// Make `remove` fail for one identifier
        pub fn failing_removal(self, identifier: &str) -> Self {
            self.failing_removals
                .lock()
                .unwrap()
                .insert(identifier.to_string());
            self
        }

        /// All removal attempts, in order
        pub fn removal_attempts(&self) -> Vec<(String, String)> {
            self.removals.lock().unwrap().clone()
        }

        /// Filenames currently present for a database
        pub fn remaining(&self, database: &str) -> Vec<String> {
            self.files
                .lock()
                .unwrap()
                .get(database)
                .map(|entries| entries.keys().cloned().collect())
                .unwrap_or_default()
        }

        /// Bytes written for one identifier, if any
        pub fn contents(&self, database: &str, identifier: &str) -> Option<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(database)
                .and_then(|entries| entries.get(identifier).cloned())
        }
    }

    impl BackupStore for MockStore {
        fn list(&self, database: &str) -> Result<Vec<String>> {
            Ok(self
                .files
                .lock()
                .unwrap()
                .get(database)
                .map(|entries| entries.keys().cloned().collect())
                .unwrap_or_default())
        }

        fn remove(&self, database: &str, identifier: &str) -> Result<()> {
            self.removals
                .lock()
                .unwrap()
                .push((database.to_string(), identifier.to_string()));

            if self.failing_removals.lock().unwrap().contains(identifier) {
                anyhow::bail!("Injected removal failure: {}", identifier);
            }

            let mut files = self.files.lock().unwrap();
            let present = files
                .get_mut(database)
                .map(|entries| entries.remove(identifier).is_some())
                .unwrap_or(false);
            if !present {
                anyhow::bail!("No such backup: {}/{}", database, identifier);
            }
            Ok(())
        }

        fn exists(&self, database: &str) -> bool {
            self.files.lock().unwrap().contains_key(database)
        }

        fn write(&self, database: &str, identifier: &str, bytes: &[u8]) -> Result<()> {
            self.files
                .lock()
                .unwrap()
                .entry(database.to_string())
                .or_default()
                .insert(identifier.to_string(), bytes.to_vec());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        assert_eq!(store.list("nonexistent").unwrap(), Vec::<String>::new());
        assert!(!store.exists("nonexistent"));
    }

    #[test]
    fn test_write_creates_database_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        store.write("app", "app_2024-03-11.dump", b"dump bytes").unwrap();

        assert!(store.exists("app"));
        assert_eq!(store.list("app").unwrap(), vec!["app_2024-03-11.dump"]);
        assert_eq!(
            fs::read(temp_dir.path().join("app/app_2024-03-11.dump")).unwrap(),
            b"dump bytes"
        );
    }

    #[test]
    fn test_list_is_sorted_and_skips_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        store.write("app", "app_2024-03-11.dump", b"").unwrap();
        store.write("app", "app_2024-01-05.dump", b"").unwrap();
        fs::create_dir(temp_dir.path().join("app/nested")).unwrap();

        assert_eq!(
            store.list("app").unwrap(),
            vec!["app_2024-01-05.dump", "app_2024-03-11.dump"]
        );
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        store.write("app", "app_2024-03-11.dump", b"").unwrap();
        store.remove("app", "app_2024-03-11.dump").unwrap();
        assert_eq!(store.list("app").unwrap(), Vec::<String>::new());

        // Removing it again is an error
        assert!(store.remove("app", "app_2024-03-11.dump").is_err());
    }

    #[test]
    fn test_mock_records_and_injects_failures() {
        use mock::MockStore;

        let store = MockStore::new()
            .with_files("app", &["app_2024-03-11.dump", "app_2024-03-10.dump"])
            .failing_removal("app_2024-03-10.dump");

        assert!(store.remove("app", "app_2024-03-11.dump").is_ok());
        assert!(store.remove("app", "app_2024-03-10.dump").is_err());

        assert_eq!(store.removal_attempts().len(), 2);
        assert_eq!(store.remaining("app"), vec!["app_2024-03-10.dump"]);
    }
}
