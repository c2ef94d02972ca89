//! Persistent record of the installation's schema version
//!
//! Two tables back the store: a single-row version table (`id = 1`) holding
//! the current version, and an append-only history table with one row per
//! applied step. Every method takes the connection to run on, so callers
//! choose whether a read or write joins an open step transaction.

use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, ColumnDef, Expr, Order, Query, Table};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, QueryResult, Statement};
use serde::Serialize;
use tracing::{debug, info};
use upstep_config::MigrationsConfig;
use upstep_core::{MigrationError, Version};

const ROW_ID: i32 = 1;
const COL_ID: &str = "id";
const COL_VERSION: &str = "version";
const COL_UPDATED_AT: &str = "updated_at";
const COL_FROM: &str = "from_version";
const COL_TO: &str = "to_version";
const COL_APPLIED_AT: &str = "applied_at";

/// Current version as stored, with the time it was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaVersionRecord {
    pub version: Version,
    pub recorded_at: DateTime<Utc>,
}

/// One applied step from the history table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub from: Version,
    pub to: Version,
    pub applied_at: DateTime<Utc>,
}

/// Table-backed current-version store
#[derive(Debug, Clone)]
pub struct SchemaVersionStore {
    version_table: String,
    history_table: String,
}

impl SchemaVersionStore {
    /// Table names are used verbatim and must already be valid identifiers
    pub fn new(version_table: impl Into<String>, history_table: impl Into<String>) -> Self {
        Self {
            version_table: version_table.into(),
            history_table: history_table.into(),
        }
    }

    pub fn from_config(config: &MigrationsConfig) -> Self {
        Self::new(&config.version_table, &config.history_table)
    }

    pub fn version_table(&self) -> &str {
        &self.version_table
    }

    pub fn history_table(&self) -> &str {
        &self.history_table
    }

    /// Create both tables if missing and seed the version row with `default`
    /// when none exists. Returns `true` if the row was seeded by this call.
    pub async fn ensure_initialized<C>(&self, default: Version, conn: &C) -> StorageResult<bool>
    where
        C: ConnectionTrait,
    {
        let backend = conn.get_database_backend();

        let version_table = Table::create()
            .table(Alias::new(&self.version_table))
            .if_not_exists()
            .col(ColumnDef::new(Alias::new(COL_ID)).integer().not_null().primary_key())
            .col(ColumnDef::new(Alias::new(COL_VERSION)).string().not_null())
            .col(ColumnDef::new(Alias::new(COL_UPDATED_AT)).string().not_null())
            .to_owned();
        conn.execute(backend.build(&version_table)).await?;

        let history_table = Table::create()
            .table(Alias::new(&self.history_table))
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new(COL_ID))
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Alias::new(COL_FROM)).string().not_null())
            .col(ColumnDef::new(Alias::new(COL_TO)).string().not_null())
            .col(ColumnDef::new(Alias::new(COL_APPLIED_AT)).string().not_null())
            .to_owned();
        conn.execute(backend.build(&history_table)).await?;

        if self.fetch_row(conn).await?.is_some() {
            debug!("Version table {} already initialized", self.version_table);
            return Ok(false);
        }

        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(&self.version_table))
            .columns([
                Alias::new(COL_ID),
                Alias::new(COL_VERSION),
                Alias::new(COL_UPDATED_AT),
            ]);
        insert
            .values([
                ROW_ID.into(),
                default.to_string().into(),
                Utc::now().to_rfc3339().into(),
            ])
            .map_err(build_error)?;
        conn.execute(backend.build(&insert)).await?;

        info!("Initialized {} at version {}", self.version_table, default);
        Ok(true)
    }

    /// Whether the version row exists
    pub async fn is_initialized<C>(&self, conn: &C) -> StorageResult<bool>
    where
        C: ConnectionTrait,
    {
        if !self.table_exists(&self.version_table, conn).await? {
            return Ok(false);
        }
        Ok(self.fetch_row(conn).await?.is_some())
    }

    /// Stored version; [`MigrationError::UninitializedStore`] if there is none
    pub async fn get_current<C>(&self, conn: &C) -> StorageResult<Version>
    where
        C: ConnectionTrait,
    {
        Ok(self.current_record(conn).await?.version)
    }

    /// Stored version together with its write time
    pub async fn current_record<C>(&self, conn: &C) -> StorageResult<SchemaVersionRecord>
    where
        C: ConnectionTrait,
    {
        if !self.table_exists(&self.version_table, conn).await? {
            return Err(MigrationError::UninitializedStore.into());
        }

        let row = self
            .fetch_row(conn)
            .await?
            .ok_or(StorageError::Migration(MigrationError::UninitializedStore))?;

        let version: String = row.try_get("", COL_VERSION)?;
        let recorded_at: String = row.try_get("", COL_UPDATED_AT)?;

        Ok(SchemaVersionRecord {
            version: parse_stored_version(&version)?,
            recorded_at: parse_timestamp(&recorded_at)?,
        })
    }

    /// Overwrite the stored version
    pub async fn record_version<C>(&self, version: Version, conn: &C) -> StorageResult<()>
    where
        C: ConnectionTrait,
    {
        let update = Query::update()
            .table(Alias::new(&self.version_table))
            .values([
                (Alias::new(COL_VERSION), version.to_string().into()),
                (Alias::new(COL_UPDATED_AT), Utc::now().to_rfc3339().into()),
            ])
            .and_where(Expr::col(Alias::new(COL_ID)).eq(ROW_ID))
            .to_owned();

        let result = conn
            .execute(conn.get_database_backend().build(&update))
            .await?;
        if result.rows_affected() == 0 {
            return Err(MigrationError::UninitializedStore.into());
        }

        debug!("Recorded schema version {}", version);
        Ok(())
    }

    /// Record that the step `from -> to` was applied: move the version and
    /// append a history row, both on `conn`
    pub async fn record_step<C>(&self, from: Version, to: Version, conn: &C) -> StorageResult<()>
    where
        C: ConnectionTrait,
    {
        self.record_version(to, conn).await?;

        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(&self.history_table))
            .columns([
                Alias::new(COL_FROM),
                Alias::new(COL_TO),
                Alias::new(COL_APPLIED_AT),
            ]);
        insert
            .values([
                from.to_string().into(),
                to.to_string().into(),
                Utc::now().to_rfc3339().into(),
            ])
            .map_err(build_error)?;
        conn.execute(conn.get_database_backend().build(&insert))
            .await?;

        Ok(())
    }

    /// Applied steps, oldest first; empty before initialization
    pub async fn history<C>(&self, conn: &C) -> StorageResult<Vec<AppliedMigration>>
    where
        C: ConnectionTrait,
    {
        if !self.table_exists(&self.history_table, conn).await? {
            return Ok(Vec::new());
        }

        let select = Query::select()
            .columns([
                Alias::new(COL_FROM),
                Alias::new(COL_TO),
                Alias::new(COL_APPLIED_AT),
            ])
            .from(Alias::new(&self.history_table))
            .order_by(Alias::new(COL_ID), Order::Asc)
            .to_owned();

        let rows = conn
            .query_all(conn.get_database_backend().build(&select))
            .await?;

        rows.iter()
            .map(|row| {
                let from: String = row.try_get("", COL_FROM)?;
                let to: String = row.try_get("", COL_TO)?;
                let applied_at: String = row.try_get("", COL_APPLIED_AT)?;
                Ok(AppliedMigration {
                    from: parse_stored_version(&from)?,
                    to: parse_stored_version(&to)?,
                    applied_at: parse_timestamp(&applied_at)?,
                })
            })
            .collect()
    }

    async fn fetch_row<C>(&self, conn: &C) -> StorageResult<Option<QueryResult>>
    where
        C: ConnectionTrait,
    {
        let select = Query::select()
            .columns([Alias::new(COL_VERSION), Alias::new(COL_UPDATED_AT)])
            .from(Alias::new(&self.version_table))
            .and_where(Expr::col(Alias::new(COL_ID)).eq(ROW_ID))
            .to_owned();

        Ok(conn
            .query_one(conn.get_database_backend().build(&select))
            .await?)
    }

    async fn table_exists<C>(&self, table: &str, conn: &C) -> StorageResult<bool>
    where
        C: ConnectionTrait,
    {
        let backend = conn.get_database_backend();
        let sql = match backend {
            DbBackend::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?"
            }
            DbBackend::Postgres => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1"
            }
            DbBackend::MySql => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?"
            }
        };

        let stmt = Statement::from_sql_and_values(backend, sql, [table.into()]);
        Ok(conn.query_one(stmt).await?.is_some())
    }
}

impl Default for SchemaVersionStore {
    fn default() -> Self {
        Self::from_config(&MigrationsConfig::default())
    }
}

fn parse_stored_version(raw: &str) -> StorageResult<Version> {
    Version::parse(raw)
        .map_err(|_| StorageError::CorruptRecord(format!("stored version '{}' is not x.y.z", raw)))
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRecord(format!("timestamp '{}': {}", raw, e)))
}

fn build_error(err: sea_orm::sea_query::error::Error) -> StorageError {
    StorageError::QueryFailed(DbErr::Custom(err.to_string()))
}
