//! Logging initialisation for upstep
//!
//! Builds a `tracing-subscriber` registry from [`LoggingConfig`]: one `fmt`
//! layer per configured target, each with its own level filter.
//!
//! [`LoggingConfig`]: upstep_config::LoggingConfig

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing, LoggingGuard};
