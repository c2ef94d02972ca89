//! Command handlers

pub mod config;
pub mod inspect;
pub mod migrate;

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::ExitCode;
use tracing::debug;
use upstep_config::UpstepConfig;
use upstep_storage::{load_registry, DatabaseConnection, MigrationRunner, Registry, SchemaVersionStore};

/// How a command ended, mapped onto the process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NothingToDo,
    Failed,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success | Outcome::NothingToDo => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
        }
    }
}

/// Load the registry from the configured migrations directory
pub fn load_migrations(config: &UpstepConfig) -> Result<Registry> {
    let dir = config.migrations.directory_path();
    load_registry(&dir).with_context(|| format!("Failed to load migrations from {:?}", dir))
}

/// Registry, database and store wired into a runner
pub async fn open_runner(config: &UpstepConfig) -> Result<MigrationRunner> {
    let registry = load_migrations(config)?;
    debug!("Loaded {} migrations", registry.len());

    let db = DatabaseConnection::new(config.database.clone())
        .await
        .context("Failed to connect to database")?;
    let store = SchemaVersionStore::from_config(&config.migrations);

    MigrationRunner::new(registry, store, db).context("Invalid migration registry")
}

/// Every registered step, one per line
pub fn print_possible_migrations(registry: &Registry) {
    println!("Possible migrations:");
    if registry.is_empty() {
        println!("  (none)");
        return;
    }
    for line in registry.describe().lines() {
        println!("  {}", line);
    }
}

pub fn print_failure(message: impl std::fmt::Display, registry: &Registry) {
    println!("{} {}", "Migration failed:".red().bold(), message);
    print_possible_migrations(registry);
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use tempfile::TempDir;
    use upstep_config::UpstepConfig;

    /// Config pointing at a fresh SQLite file and a migrations directory
    /// containing the given `(step, file, sql)` scripts
    pub fn workspace(scripts: &[(&str, &str, &str)]) -> (TempDir, UpstepConfig) {
        let dir = TempDir::new().unwrap();
        let migrations = dir.path().join("migrations");
        std::fs::create_dir_all(&migrations).unwrap();
        for (step, file, sql) in scripts {
            write(&migrations.join(step), file, sql);
        }

        let mut config = UpstepConfig::default();
        config.database.url = format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display());
        config.migrations.directory = migrations.display().to_string();
        (dir, config)
    }

    fn write(step_dir: &Path, file: &str, sql: &str) {
        std::fs::create_dir_all(step_dir).unwrap();
        std::fs::write(step_dir.join(file), sql).unwrap();
    }
}
