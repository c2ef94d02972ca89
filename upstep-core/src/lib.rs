//! Core domain types for upstep
//!
//! This crate holds the storage-independent half of the migration engine:
//! the [`Version`] value type, the [`MigrationRegistry`] of schema steps, and
//! the [`VersionGraph`] that turns a current and a target version into an
//! ordered [`MigrationPath`]. It has no database dependencies; the procedure
//! attached to each step is a type parameter supplied by the storage layer.

pub mod error;
pub mod graph;
pub mod registry;
pub mod version;

// Re-export commonly used types at the crate root
pub use error::{BoxError, CoreResult, MigrationError};
pub use graph::{MigrationPath, VersionGraph};
pub use registry::{MigrationDescriptor, MigrationRegistry, RegistryBuilder};
pub use version::{TargetVersion, Version};
