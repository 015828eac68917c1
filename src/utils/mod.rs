pub mod command;
pub mod locker;
pub mod postgres;

// Trait-based abstraction for testability
pub mod postgres_ops;

// Re-export commonly used types and traits
#[allow(unused_imports)]
pub use postgres_ops::{PostgresOperations, RealPostgresOps};
