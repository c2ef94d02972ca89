//! Domain-driven configuration management for upstep
//!
//! Configuration is split by functional domain (database, migrations,
//! logging), loaded from YAML, overridden from `UPSTEP_*` environment
//! variables, and validated per domain before use.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

// Re-export main types
pub use domains::{
    database::DatabaseConfig,
    logging::{LogFormat, LogLevel, LogTarget, LoggingConfig},
    migrations::MigrationsConfig,
    UpstepConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export utilities
pub use domains::utils::serde_duration;
