//! Storage side of the upstep migration engine
//!
//! This crate binds the storage-independent engine in `upstep-core` to a
//! relational database through SeaORM: it persists the installation's schema
//! version, runs each migration step inside its own transaction, and loads
//! migration steps authored as SQL script directories.

pub mod change;
pub mod connection;
pub mod error;
pub mod loader;
pub mod runner;
pub mod version_store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export core types for convenience
pub use change::{BoxedChange, Registry, SchemaChange, SqlFileScripts, SqlScript};
pub use connection::DatabaseConnection;
pub use error::{StorageError, StorageResult};
pub use loader::load_registry;
pub use runner::{AppliedStep, MigrationPlan, MigrationReport, MigrationRunner, MigrationStatus};
pub use version_store::{AppliedMigration, SchemaVersionRecord, SchemaVersionStore};
