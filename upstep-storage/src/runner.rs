//! Transactional migration runner
//!
//! Every step runs in its own transaction: the step's procedure and the
//! version-store update commit together or not at all. A failed step is
//! rolled back and ends the run, leaving the store at the last committed
//! version so a later run resumes from there.

use crate::change::{BoxedChange, Registry};
use crate::error::{StorageError, StorageResult};
use crate::version_store::{AppliedMigration, SchemaVersionStore};
use sea_orm::{DatabaseConnection as SeaConnection, TransactionTrait};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use upstep_core::{
    CoreResult, MigrationDescriptor, MigrationError, TargetVersion, Version, VersionGraph,
};

/// A step that committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStep {
    pub from: Version,
    pub to: Version,
    pub duration: Duration,
}

/// Outcome of a run that got as far as applying steps
#[derive(Debug)]
pub struct MigrationReport {
    pub start: Version,
    pub target: Version,
    pub applied: Vec<AppliedStep>,
    /// Version actually reached
    pub final_version: Version,
    /// Failure of the step that stopped the run, if any
    pub error: Option<MigrationError>,
}

impl MigrationReport {
    fn new(start: Version, target: Version) -> Self {
        Self {
            start,
            target,
            applied: Vec::new(),
            final_version: start,
            error: None,
        }
    }

    pub fn applied_steps(&self) -> usize {
        self.applied.len()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.final_version == self.target
    }

    /// The step failure as an `Err`, otherwise the report
    pub fn into_result(mut self) -> CoreResult<Self> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// Steps a run would apply, computed without writing anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub current: Version,
    pub target: Version,
    pub steps: Vec<(Version, Version)>,
}

impl fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} -> {} ({} steps)", self.current, self.target, self.steps.len())?;
        for (from, to) in &self.steps {
            writeln!(f, "  {} -> {}", from, to)?;
        }
        Ok(())
    }
}

/// Where the installation stands relative to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub current: Version,
    /// `None` for an empty registry
    pub highest: Option<Version>,
    /// Steps between `current` and `highest`
    pub pending: usize,
    /// Whether `highest` can be reached from `current`
    pub reachable: bool,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.highest.map_or(true, |highest| highest == self.current)
    }
}

/// Applies registry paths against one database
pub struct MigrationRunner {
    graph: VersionGraph<BoxedChange>,
    store: SchemaVersionStore,
    db: SeaConnection,
}

impl MigrationRunner {
    /// Fails with [`MigrationError::CyclicRegistry`] before touching the database
    pub fn new(
        registry: Registry,
        store: SchemaVersionStore,
        db: impl Into<SeaConnection>,
    ) -> CoreResult<Self> {
        Ok(Self {
            graph: VersionGraph::build(registry)?,
            store,
            db: db.into(),
        })
    }

    pub fn graph(&self) -> &VersionGraph<BoxedChange> {
        &self.graph
    }

    pub fn registry(&self) -> &Registry {
        self.graph.registry()
    }

    pub fn store(&self) -> &SchemaVersionStore {
        &self.store
    }

    pub fn connection(&self) -> &SeaConnection {
        &self.db
    }

    /// Create the version record at `baseline` unless one exists
    pub async fn initialize(&self, baseline: Version) -> CoreResult<bool> {
        let txn = self.db.begin().await.map_err(MigrationError::store)?;
        match self.store.ensure_initialized(baseline, &txn).await {
            Ok(seeded) => {
                txn.commit().await.map_err(MigrationError::store)?;
                Ok(seeded)
            }
            Err(err) => {
                rollback_quietly(txn).await;
                Err(err.into_migration_error())
            }
        }
    }

    pub async fn current_version(&self) -> CoreResult<Version> {
        self.store
            .get_current(&self.db)
            .await
            .map_err(StorageError::into_migration_error)
    }

    pub async fn history(&self) -> CoreResult<Vec<AppliedMigration>> {
        self.store
            .history(&self.db)
            .await
            .map_err(StorageError::into_migration_error)
    }

    /// Resolve `target` and the path to it exactly as [`migrate`](Self::migrate) would
    pub async fn plan(&self, target: TargetVersion) -> CoreResult<MigrationPlan> {
        let target = self.graph.resolve_target(target)?;
        let current = self.current_version().await?;
        let path = self.graph.find_path(current, target)?;

        Ok(MigrationPlan {
            current,
            target,
            steps: path
                .iter()
                .map(|step| (step.from_version(), step.to_version()))
                .collect(),
        })
    }

    pub async fn status(&self) -> CoreResult<MigrationStatus> {
        let current = self.current_version().await?;
        let highest = match self.graph.max_version() {
            Ok(version) => Some(version),
            Err(MigrationError::EmptyVersionSet) => None,
            Err(err) => return Err(err),
        };

        let (pending, reachable) = match highest {
            Some(highest) if highest != current => match self.graph.find_path(current, highest) {
                Ok(path) => (path.len(), true),
                Err(MigrationError::NoPathFound { .. }) => (0, false),
                Err(err) => return Err(err),
            },
            _ => (0, true),
        };

        Ok(MigrationStatus {
            current,
            highest,
            pending,
            reachable,
        })
    }

    /// Move the installation to `target`
    ///
    /// Outcomes decided before any step runs (bad target, already there, no
    /// path, unreadable store) come back as `Err` with nothing written. Once
    /// steps start, the run always yields a report; a failed step is recorded
    /// in [`MigrationReport::error`].
    pub async fn migrate(&self, target: TargetVersion) -> CoreResult<MigrationReport> {
        let target = self.graph.resolve_target(target)?;
        let current = self.current_version().await?;
        let path = self.graph.find_path(current, target)?;

        info!(from = %current, to = %target, steps = path.len(), "Starting migration: {}", path);

        let mut report = MigrationReport::new(current, target);
        for step in path.iter() {
            let (from, to) = (step.from_version(), step.to_version());
            let started = Instant::now();

            match self.apply_step(step).await {
                Ok(()) => {
                    let duration = started.elapsed();
                    info!(%from, %to, elapsed_ms = duration.as_millis(), "Applied migration step");
                    report.applied.push(AppliedStep { from, to, duration });
                    report.final_version = to;
                }
                Err(err) => {
                    error!(%from, %to, error = %err, "Migration step failed and was rolled back");
                    report.error = Some(MigrationError::step_failed(from, to, err));
                    break;
                }
            }
        }

        if report.error.is_none() {
            info!(version = %report.final_version, steps = report.applied_steps(), "Migration complete");
        }
        Ok(report)
    }

    async fn apply_step(&self, step: &MigrationDescriptor<BoxedChange>) -> StorageResult<()> {
        let txn = self.db.begin().await?;

        let outcome = async {
            step.procedure().apply(&txn).await?;
            self.store
                .record_step(step.from_version(), step.to_version(), &txn)
                .await
        }
        .await;

        match outcome {
            Ok(()) => {
                txn.commit().await?;
                Ok(())
            }
            Err(err) => {
                rollback_quietly(txn).await;
                Err(err)
            }
        }
    }
}

async fn rollback_quietly(txn: sea_orm::DatabaseTransaction) {
    if let Err(err) = txn.rollback().await {
        warn!("Rollback failed: {}", err);
    }
}
