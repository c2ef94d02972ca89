//! Migration source and bookkeeping configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use upstep_core::Version;
use crate::validation::{Validatable, validate_identifier, validate_required_string};
use crate::error::ConfigResult;

/// Where migrations come from and where progress is recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Root directory holding one `<from>-<to>` subdirectory per step
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Version recorded for a database that has never been migrated
    #[serde(default = "default_baseline_version")]
    pub baseline_version: String,

    /// Table holding the single current-version row
    #[serde(default = "default_version_table")]
    pub version_table: String,

    /// Table holding one row per applied step
    #[serde(default = "default_history_table")]
    pub history_table: String,
}

impl MigrationsConfig {
    pub fn directory_path(&self) -> PathBuf {
        PathBuf::from(&self.directory)
    }

    /// Parsed baseline version
    pub fn baseline(&self) -> ConfigResult<Version> {
        Version::parse(&self.baseline_version)
            .map_err(|e| self.validation_error(format!("baseline_version: {}", e)))
    }
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            baseline_version: default_baseline_version(),
            version_table: default_version_table(),
            history_table: default_history_table(),
        }
    }
}

impl Validatable for MigrationsConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.directory, "directory", self.domain_name())?;
        self.baseline()?;
        validate_identifier(&self.version_table, "version_table", self.domain_name())?;
        validate_identifier(&self.history_table, "history_table", self.domain_name())?;

        if self.version_table.eq_ignore_ascii_case(&self.history_table) {
            return Err(self.validation_error(
                "version_table and history_table must be different tables"
            ));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "migrations"
    }
}

fn default_directory() -> String {
    "migrations".to_string()
}

fn default_baseline_version() -> String {
    "0.0.0".to_string()
}

fn default_version_table() -> String {
    "schema_version".to_string()
}

fn default_history_table() -> String {
    "schema_version_history".to_string()
}
