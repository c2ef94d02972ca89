//! Configuration drives connection, registry and store wiring

use std::fs;
use tempfile::TempDir;
use upstep_config::{ConfigLoader, UpstepConfig};
use upstep_core::{TargetVersion, Version};
use upstep_storage::testing::TestDatabase;
use upstep_storage::{load_registry, DatabaseConnection, MigrationRunner, SchemaVersionStore};

fn config_from_env(dir: &TempDir) -> UpstepConfig {
    let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("data").join("app.db").display());
    let migrations = dir.path().join("migrations").display().to_string();

    temp_env::with_vars(
        [
            ("UPSTEP_DATABASE_URL", Some(db_url.as_str())),
            ("UPSTEP_MIGRATIONS_DIR", Some(migrations.as_str())),
            ("UPSTEP_BASELINE_VERSION", Some("1.0.0")),
            ("UPSTEP_VERSION_TABLE", Some("release_version")),
        ],
        || ConfigLoader::new().from_env().unwrap(),
    )
}

async fn runner(config: &UpstepConfig) -> MigrationRunner {
    let registry = load_registry(config.migrations.directory_path()).unwrap();
    let db = DatabaseConnection::new(config.database.clone()).await.unwrap();
    MigrationRunner::new(registry, SchemaVersionStore::from_config(&config.migrations), db).unwrap()
}

#[tokio::test]
async fn test_environment_configured_run() {
    let dir = TempDir::new().unwrap();
    let step = dir.path().join("migrations").join("1.0.0-1.1.0");
    fs::create_dir_all(&step).unwrap();
    fs::write(step.join("001.sql"), "CREATE TABLE widgets (id INTEGER PRIMARY KEY);").unwrap();

    let config = config_from_env(&dir);
    assert_eq!(config.migrations.version_table, "release_version");

    let runner = runner(&config).await;
    assert!(runner.initialize(config.migrations.baseline().unwrap()).await.unwrap());
    assert_eq!(runner.current_version().await.unwrap(), Version::new(1, 0, 0));

    let report = runner.migrate(TargetVersion::Highest).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.final_version, Version::new(1, 1, 0));

    // The database file was created under the nested data directory
    assert!(dir.path().join("data").join("app.db").exists());

    let status = runner.status().await.unwrap();
    assert!(status.is_up_to_date());
    assert_eq!(status.pending, 0);
}

#[tokio::test]
async fn test_custom_store_tables_are_used() {
    let db = TestDatabase::new().await.unwrap();
    db.write_migration(Version::new(0, 1, 0), Version::new(0, 2, 0), "001.sql", "CREATE TABLE x (id INTEGER);")
        .unwrap();

    let mut config = UpstepConfig::default();
    config.migrations.version_table = "app_schema".to_string();
    config.migrations.history_table = "app_schema_log".to_string();

    let registry = load_registry(db.migrations_dir()).unwrap();
    let runner = MigrationRunner::new(
        registry,
        SchemaVersionStore::from_config(&config.migrations),
        db.connection().clone(),
    )
    .unwrap();
    runner.initialize(Version::new(0, 1, 0)).await.unwrap();
    runner.migrate(TargetVersion::Highest).await.unwrap();

    assert!(db.table_exists("app_schema").await.unwrap());
    assert!(db.table_exists("app_schema_log").await.unwrap());
    assert!(!db.table_exists("schema_version").await.unwrap());
    assert_eq!(db.count_records("app_schema_log").await.unwrap(), 1);
}

#[test]
fn test_logging_init_is_repeatable() {
    let config = UpstepConfig::default();
    let _guard = upstep_logging::init_logging_from_config(&config.logging).unwrap();
    upstep_logging::init_simple_tracing("debug").unwrap();
}
