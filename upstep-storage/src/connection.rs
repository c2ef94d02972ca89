//! Database connection wrapper

use crate::error::{StorageError, StorageResult};
use sea_orm::{ConnectOptions, Database, DatabaseConnection as SeaConnection};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use upstep_config::DatabaseConfig;

/// Database connection wrapper with configuration
#[derive(Clone)]
pub struct DatabaseConnection {
    connection: SeaConnection,
    config: DatabaseConfig,
}

impl DatabaseConnection {
    /// Create a new database connection with configuration
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        info!("Connecting to database: {}", config.url);

        Self::ensure_sqlite_file_exists(&config.url)?;

        let mut opts = ConnectOptions::new(config.url.clone());
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(config.connection_timeout)
            .acquire_timeout(config.connection_timeout)
            .sqlx_logging(config.sql_logging)
            .sqlx_logging_level(log::LevelFilter::Debug);

        if config.is_in_memory() {
            // Every pooled connection would otherwise open its own empty database
            opts.max_connections(1).min_connections(1);
        }

        if config.is_sqlite() {
            let busy_timeout = Duration::from_millis(u64::from(config.sqlite_busy_timeout_ms));
            opts.map_sqlx_sqlite_opts(move |sqlite| sqlite.busy_timeout(busy_timeout));
        }

        let connection = Database::connect(opts)
            .await
            .map_err(|e| StorageError::ConnectionFailed(format!("{}: {}", config.url, e)))?;

        debug!(
            "Database connection established with {} max connections",
            config.max_connections
        );

        Ok(Self { connection, config })
    }

    /// Connect to `url` with default pool settings
    pub async fn connect(url: impl Into<String>) -> StorageResult<Self> {
        Self::new(DatabaseConfig::with_url(url)).await
    }

    /// Ensure the parent directory of a file-based SQLite database exists
    fn ensure_sqlite_file_exists(database_url: &str) -> StorageResult<()> {
        if !database_url.starts_with("sqlite:") {
            debug!("Non-SQLite database detected, skipping file creation logic");
            return Ok(());
        }
        if database_url.contains(":memory:") {
            debug!("Using in-memory SQLite database");
            return Ok(());
        }

        let file_path = sqlite_file_path(database_url).ok_or_else(|| {
            StorageError::ConfigError(format!("Invalid SQLite URL format: {}", database_url))
        })?;
        let path = Path::new(file_path);

        if let Some(parent_dir) = path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                info!("Creating database directory: {:?}", parent_dir);
                std::fs::create_dir_all(parent_dir).map_err(|e| {
                    StorageError::ConfigError(format!(
                        "Failed to create database directory {:?}: {}",
                        parent_dir, e
                    ))
                })?;
            }
        }

        if path.exists() {
            debug!("Using existing database file: {:?}", path);
        } else {
            info!("Database file will be created by SQLite: {:?}", path);
        }

        Ok(())
    }

    /// Get the underlying Sea-ORM connection
    pub fn inner(&self) -> &SeaConnection {
        &self.connection
    }

    /// Get database configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Check database connectivity
    pub async fn ping(&self) -> StorageResult<()> {
        debug!("Pinging database");
        self.connection.ping().await?;
        Ok(())
    }

    /// Close the database connection
    pub async fn close(self) -> StorageResult<()> {
        info!("Closing database connection");
        self.connection.close().await?;
        debug!("Database connection closed");
        Ok(())
    }
}

impl From<DatabaseConnection> for SeaConnection {
    fn from(connection: DatabaseConnection) -> Self {
        connection.connection
    }
}

/// File path of a SQLite URL, query string removed
fn sqlite_file_path(database_url: &str) -> Option<&str> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}
