//! Postgres operations abstraction for testability
//!
//! Trait-based seam over the `psql`/`pg_dump` subprocess calls, enabling
//! dependency injection and mocking for tests.

#![allow(dead_code)]

use super::postgres::{self, PgEnv};
use anyhow::Result;
use std::time::Duration;

/// Abstraction for postgres operations, enabling mocking in tests
pub trait PostgresOperations: Send + Sync {
    /// List databases on the server, minus the given exclusions
    fn list_databases(
        &self,
        env: &PgEnv,
        excludes: &[String],
        timeout: Duration,
    ) -> Result<Vec<String>>;

    /// Dump one database, returning the dump bytes
    fn dump_database(&self, env: &PgEnv, database: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Default implementation using the real client binaries
#[derive(Debug, Clone, Default)]
pub struct RealPostgresOps;

impl RealPostgresOps {
    pub fn new() -> Self {
        Self
    }
}

impl PostgresOperations for RealPostgresOps {
    fn list_databases(
        &self,
        env: &PgEnv,
        excludes: &[String],
        timeout: Duration,
    ) -> Result<Vec<String>> {
        postgres::list_databases(env, excludes, timeout)
    }

    fn dump_database(&self, env: &PgEnv, database: &str, timeout: Duration) -> Result<Vec<u8>> {
        postgres::dump_database(env, database, timeout)
    }
}

/// A mock for testing that serves a fixed database set and scripted failures
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockPostgresOps {
        databases: Vec<String>,
        failing_dumps: Arc<Mutex<HashSet<String>>>,
        list_fails: bool,
        /// Databases dumped so far, in order
        pub dumped: Arc<Mutex<Vec<String>>>,
    }

    impl MockPostgresOps {
        pub fn new(databases: &[&str]) -> Self {
            Self {
                databases: databases.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        /// Make `dump_database` fail for one database
        pub fn failing_dump(self, database: &str) -> Self {
            self.failing_dumps
                .lock()
                .unwrap()
                .insert(database.to_string());
            self
        }

        /// Make `list_databases` fail
        pub fn failing_list(mut self) -> Self {
            self.list_fails = true;
            self
        }

        pub fn dump_count(&self) -> usize {
            self.dumped.lock().unwrap().len()
        }
    }

    impl PostgresOperations for MockPostgresOps {
        fn list_databases(
            &self,
            _env: &PgEnv,
            excludes: &[String],
            _timeout: Duration,
        ) -> Result<Vec<String>> {
            if self.list_fails {
                anyhow::bail!("Injected list failure");
            }
            Ok(self
                .databases
                .iter()
                .filter(|name| !excludes.contains(name))
                .cloned()
                .collect())
        }

        fn dump_database(&self, _env: &PgEnv, database: &str, _timeout: Duration) -> Result<Vec<u8>> {
            self.dumped.lock().unwrap().push(database.to_string());
            if self.failing_dumps.lock().unwrap().contains(database) {
                anyhow::bail!("Injected dump failure: {}", database);
            }
            Ok(format!("dump of {}", database).into_bytes())
        }
    }
}
