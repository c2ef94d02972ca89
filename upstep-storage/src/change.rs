//! Schema-change procedures
//!
//! A [`SchemaChange`] is the procedure attached to one registry step. It
//! receives the step's open transaction and must do all of its work through
//! it, so the change and the version bump commit or roll back together.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseTransaction};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use upstep_core::MigrationRegistry;

/// Procedure that moves the schema across one step
#[async_trait]
pub trait SchemaChange: Send + Sync {
    /// Short human-readable name used in logs
    fn description(&self) -> String;

    /// Apply the change inside `txn`
    async fn apply(&self, txn: &DatabaseTransaction) -> StorageResult<()>;
}

impl fmt::Debug for dyn SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaChange({})", self.description())
    }
}

/// Shared handle to a procedure
pub type BoxedChange = Arc<dyn SchemaChange>;

/// Registry whose steps carry database procedures
pub type Registry = MigrationRegistry<BoxedChange>;

/// Inline SQL statements executed in order
#[derive(Debug, Clone)]
pub struct SqlScript {
    name: String,
    statements: Vec<String>,
}

impl SqlScript {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            statements: Vec::new(),
        }
    }

    /// Append a statement
    pub fn statement(mut self, sql: impl Into<String>) -> Self {
        self.statements.push(sql.into());
        self
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn boxed(self) -> BoxedChange {
        Arc::new(self)
    }
}

#[async_trait]
impl SchemaChange for SqlScript {
    fn description(&self) -> String {
        self.name.clone()
    }

    async fn apply(&self, txn: &DatabaseTransaction) -> StorageResult<()> {
        for sql in &self.statements {
            txn.execute_unprepared(sql)
                .await
                .map_err(|source| StorageError::ScriptFailed {
                    script: self.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// SQL script files run in the given order
///
/// File contents are read on first use and kept for the life of the value,
/// so retrying a step does not touch the disk again.
pub struct SqlFileScripts {
    label: String,
    files: Vec<PathBuf>,
    cache: OnceCell<Vec<(PathBuf, String)>>,
}

impl SqlFileScripts {
    pub fn new(label: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            label: label.into(),
            files,
            cache: OnceCell::new(),
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Script contents, reading them from disk only the first time
    pub async fn scripts(&self) -> StorageResult<&[(PathBuf, String)]> {
        let scripts = self
            .cache
            .get_or_try_init(|| async {
                let mut loaded = Vec::with_capacity(self.files.len());
                for path in &self.files {
                    let sql = tokio::fs::read_to_string(path).await.map_err(|source| {
                        StorageError::ScriptUnreadable {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    debug!("Loaded script {:?} ({} bytes)", path, sql.len());
                    loaded.push((path.clone(), sql));
                }
                Ok::<_, StorageError>(loaded)
            })
            .await?;
        Ok(scripts.as_slice())
    }

    pub fn boxed(self) -> BoxedChange {
        Arc::new(self)
    }
}

impl fmt::Debug for SqlFileScripts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlFileScripts")
            .field("label", &self.label)
            .field("files", &self.files)
            .field("loaded", &self.cache.initialized())
            .finish()
    }
}

#[async_trait]
impl SchemaChange for SqlFileScripts {
    fn description(&self) -> String {
        format!("{} ({} scripts)", self.label, self.files.len())
    }

    async fn apply(&self, txn: &DatabaseTransaction) -> StorageResult<()> {
        for (path, sql) in self.scripts().await? {
            debug!("Executing script {:?}", path);
            txn.execute_unprepared(sql)
                .await
                .map_err(|source| StorageError::ScriptFailed {
                    script: path.display().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}
