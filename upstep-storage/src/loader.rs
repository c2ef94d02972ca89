//! Directory-backed migration registry
//!
//! ```text
//! migrations/
//!   0.3.0-0.4.0/
//!     001_tables.sql
//!     002_indexes.sql
//!   0.4.0-0.5.0/
//!     ddl/accounts.sql
//! ```
//!
//! Each subdirectory is one step named `<from>-<to>`. Its `*.sql` files,
//! searched recursively, run in path order inside the step transaction.

use crate::change::{BoxedChange, Registry, SqlFileScripts};
use crate::error::{StorageError, StorageResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use upstep_core::{MigrationError, Version};

/// Build a registry from a migrations directory
pub fn load_registry(dir: impl AsRef<Path>) -> StorageResult<Registry> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(StorageError::InvalidMigrationDir {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut steps = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            debug!("Skipping non-directory entry {:?}", path);
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let (from, to) = parse_step_name(&name)?;
        let files = collect_scripts(&path)?;
        if files.is_empty() {
            return Err(StorageError::InvalidMigrationDir {
                path,
                message: "step directory contains no .sql scripts".to_string(),
            });
        }

        steps.push((from, to, files));
    }

    steps.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut builder = Registry::builder();
    for (from, to, files) in steps {
        let label = format!("{} -> {}", from, to);
        let change: BoxedChange = SqlFileScripts::new(label, files).boxed();
        builder = builder.register(from, to, change);
    }
    let registry = builder.build()?;

    info!("Loaded {} migrations from {:?}", registry.len(), dir);
    Ok(registry)
}

/// Split a `<from>-<to>` directory name into its two versions
fn parse_step_name(name: &str) -> StorageResult<(Version, Version)> {
    let (from, to) = name
        .split_once('-')
        .ok_or_else(|| MigrationError::InvalidVersionFormat(name.to_string()))?;
    Ok((Version::parse(from)?, Version::parse(to)?))
}

/// Every `*.sql` file under `step_dir`, sorted by path
fn collect_scripts(step_dir: &Path) -> StorageResult<Vec<PathBuf>> {
    let prefix = glob::Pattern::escape(&step_dir.to_string_lossy());
    let pattern = Path::new(&prefix).join("**").join("*.sql");
    let pattern = pattern.to_string_lossy();

    let entries = glob::glob(&pattern).map_err(|e| StorageError::InvalidMigrationDir {
        path: step_dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StorageError::Io(e.into_error()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::SchemaChange;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, sql: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, sql).unwrap();
    }

    #[test]
    fn test_parse_step_name() {
        let (from, to) = parse_step_name("0.3.0-0.4.0").unwrap();
        assert_eq!(from, Version::new(0, 3, 0));
        assert_eq!(to, Version::new(0, 4, 0));

        for bad in ["0.3.0", "0.3.0-", "0.3-0.4.0", "v0.3.0-0.4.0", "0.3.0-0.4.0-0.5.0"] {
            assert!(
                matches!(
                    parse_step_name(bad),
                    Err(StorageError::Migration(MigrationError::InvalidVersionFormat(_)))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_load_registry_from_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "0.4.0-0.5.0/001.sql", "SELECT 1");
        write(dir.path(), "0.3.0-0.4.0/002_indexes.sql", "SELECT 2");
        write(dir.path(), "0.3.0-0.4.0/001_tables.sql", "SELECT 1");
        write(dir.path(), "0.3.0-0.4.0/nested/003_data.sql", "SELECT 3");
        write(dir.path(), "0.3.0-0.4.0/README.md", "not a script");
        write(dir.path(), "notes.txt", "ignored");

        let registry = load_registry(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.describe(), "0.3.0 -> 0.4.0\n0.4.0 -> 0.5.0\n");

        let first = registry.descriptor_from(&Version::new(0, 3, 0)).unwrap();
        assert_eq!(first.procedure().description(), "0.3.0 -> 0.4.0 (3 scripts)");
    }

    #[test]
    fn test_collect_scripts_sorted_by_path() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.sql", "");
        write(dir.path(), "a.sql", "");
        write(dir.path(), "sub/c.sql", "");

        let names: Vec<String> = collect_scripts(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.sql", "b.sql", "sub/c.sql"]);
    }

    #[test]
    fn test_pattern_characters_in_parent_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("env[prod]").join("migrations");
        write(&root, "0.1.0-0.2.0/001.sql", "SELECT 1");
        write(&root, "0.2.0-0.3.0/sub*/002.sql", "SELECT 2");

        let registry = load_registry(&root).unwrap();
        assert_eq!(registry.len(), 2);
        let second = registry.descriptor_from(&Version::new(0, 2, 0)).unwrap();
        assert_eq!(second.procedure().description(), "0.2.0 -> 0.3.0 (1 scripts)");
    }

    #[test]
    fn test_empty_step_directory_rejected() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("0.1.0-0.2.0")).unwrap();
        assert!(matches!(
            load_registry(dir.path()),
            Err(StorageError::InvalidMigrationDir { .. })
        ));
    }

    #[test]
    fn test_malformed_step_directory_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "latest/001.sql", "SELECT 1");
        assert!(matches!(
            load_registry(dir.path()),
            Err(StorageError::Migration(MigrationError::InvalidVersionFormat(_)))
        ));
    }

    #[test]
    fn test_missing_directory_rejected() {
        assert!(matches!(
            load_registry("/no/such/migrations"),
            Err(StorageError::InvalidMigrationDir { .. })
        ));
    }

    #[test]
    fn test_duplicate_departure_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "0.1.0-0.2.0/a.sql", "SELECT 1");
        write(dir.path(), "0.1.0-0.3.0/a.sql", "SELECT 1");
        assert!(matches!(
            load_registry(dir.path()),
            Err(StorageError::Migration(MigrationError::DuplicateDescriptor { .. }))
        ));
    }
}
