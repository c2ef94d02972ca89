//! Database testing utilities for upstep-storage
//!
//! Each [`TestDatabase`] is a SQLite file inside its own temporary directory,
//! removed when the value is dropped. A file is used rather than `:memory:`
//! because pooled connections to `:memory:` each see a separate database.

use crate::connection::DatabaseConnection;
use sea_orm::{ConnectionTrait, DatabaseConnection as SeaConnection, DbBackend, Statement};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use upstep_core::Version;

/// Test database errors
#[derive(Error, Debug)]
pub enum TestDatabaseError {
    #[error("Failed to create temporary directory: {0}")]
    TempDirCreation(String),

    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Failed to write fixture: {0}")]
    Fixture(String),
}

/// Test database for isolated testing
pub struct TestDatabase {
    temp_dir: TempDir,
    url: String,
    connection: SeaConnection,
}

impl TestDatabase {
    /// Create a new SQLite test database
    pub async fn new() -> Result<Self, TestDatabaseError> {
        let temp_dir =
            TempDir::new().map_err(|e| TestDatabaseError::TempDirCreation(e.to_string()))?;

        let db_path = temp_dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());

        let connection = DatabaseConnection::connect(url.clone())
            .await
            .map_err(|e| TestDatabaseError::Connection(e.to_string()))?;

        Ok(Self {
            temp_dir,
            url,
            connection: connection.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn connection(&self) -> &SeaConnection {
        &self.connection
    }

    /// Scratch directory that lives as long as the database
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Root for migration fixtures written by [`write_migration`](Self::write_migration)
    pub fn migrations_dir(&self) -> PathBuf {
        self.dir().join("migrations")
    }

    /// Write `sql` to `migrations/<from>-<to>/<file>`
    pub fn write_migration(
        &self,
        from: Version,
        to: Version,
        file: &str,
        sql: &str,
    ) -> Result<PathBuf, TestDatabaseError> {
        let path = self
            .migrations_dir()
            .join(format!("{}-{}", from, to))
            .join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TestDatabaseError::Fixture(e.to_string()))?;
        }
        std::fs::write(&path, sql).map_err(|e| TestDatabaseError::Fixture(e.to_string()))?;
        Ok(path)
    }

    /// Run raw SQL outside any transaction
    pub async fn execute(&self, sql: &str) -> Result<(), TestDatabaseError> {
        self.connection
            .execute_unprepared(sql)
            .await
            .map_err(|e| TestDatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, TestDatabaseError> {
        let row = self
            .connection
            .query_one(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                [table.into()],
            ))
            .await
            .map_err(|e| TestDatabaseError::Query(e.to_string()))?;
        Ok(row.is_some())
    }

    /// Get a count of records in a table
    pub async fn count_records(&self, table: &str) -> Result<u64, TestDatabaseError> {
        let result = self
            .connection
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                format!("SELECT COUNT(*) AS count FROM {}", table),
            ))
            .await
            .map_err(|e| TestDatabaseError::Query(e.to_string()))?;

        match result {
            Some(row) => {
                let count: i64 = row
                    .try_get("", "count")
                    .map_err(|e| TestDatabaseError::Query(e.to_string()))?;
                Ok(count as u64)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_helpers() {
        let db = TestDatabase::new().await.unwrap();
        assert!(db.url().starts_with("sqlite://"));
        assert!(!db.table_exists("items").await.unwrap());

        db.execute("CREATE TABLE items (id INTEGER)").await.unwrap();
        db.execute("INSERT INTO items VALUES (1), (2)").await.unwrap();
        assert!(db.table_exists("items").await.unwrap());
        assert_eq!(db.count_records("items").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_write_migration_fixture() {
        let db = TestDatabase::new().await.unwrap();
        let path = db
            .write_migration(Version::new(0, 1, 0), Version::new(0, 2, 0), "001.sql", "SELECT 1")
            .unwrap();
        assert!(path.ends_with("migrations/0.1.0-0.2.0/001.sql"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "SELECT 1");
    }
}
