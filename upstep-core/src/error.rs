//! Error taxonomy shared by every layer of the migration engine

use thiserror::Error;

use crate::version::Version;

/// Boxed cause carried by store and step failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for engine operations
pub type CoreResult<T> = std::result::Result<T, MigrationError>;

/// Every outcome of a migration request other than success
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A version string is not `MAJOR.MINOR.PATCH`
    #[error("Invalid version format: '{0}' (expected MAJOR.MINOR.PATCH)")]
    InvalidVersionFormat(String),

    /// Two registered steps depart the same version
    #[error("Duplicate migration departing {from}: {from} -> {first} and {from} -> {second}")]
    DuplicateDescriptor {
        from: Version,
        first: Version,
        second: Version,
    },

    /// Following the registered steps from this version leads back to it
    #[error("Migration registry contains a cycle through {0}")]
    CyclicRegistry(Version),

    /// The highest version was requested from an empty set
    #[error("Cannot determine the highest version: no versions are registered")]
    EmptyVersionSet,

    /// The highest version appears more than once
    #[error("Highest version {0} is not unique")]
    AmbiguousMaxVersion(Version),

    /// The installation is already at the requested version
    #[error("Already at version {0}")]
    AlreadyAtTarget(Version),

    /// No chain of registered steps connects the two versions
    #[error("No migration path from {from} to {to}")]
    NoPathFound { from: Version, to: Version },

    /// The schema version record was never created
    #[error("Schema version store has not been initialized")]
    UninitializedStore,

    /// A step's procedure or its version bookkeeping failed and was rolled back
    #[error("Migration {from} -> {to} failed: {source}")]
    StepFailed {
        from: Version,
        to: Version,
        #[source]
        source: BoxError,
    },

    /// The version store could not be read or written outside of a step
    #[error("Schema version store error: {0}")]
    Store(#[source] BoxError),
}

impl MigrationError {
    /// Wrap a store failure that happened outside of any step
    pub fn store(err: impl Into<BoxError>) -> Self {
        MigrationError::Store(err.into())
    }

    /// Wrap the failure of the step `from -> to`
    pub fn step_failed(from: Version, to: Version, err: impl Into<BoxError>) -> Self {
        MigrationError::StepFailed {
            from,
            to,
            source: err.into(),
        }
    }

    /// True for outcomes that mean "nothing to do" rather than a failure
    pub fn is_noop(&self) -> bool {
        matches!(self, MigrationError::AlreadyAtTarget(_))
    }

    /// The step this error belongs to, if it was raised while applying one
    pub fn failed_step(&self) -> Option<(Version, Version)> {
        match self {
            MigrationError::StepFailed { from, to, .. } => Some((*from, *to)),
            _ => None,
        }
    }

    /// Get error code for operator-facing output
    pub fn error_code(&self) -> &'static str {
        match self {
            MigrationError::InvalidVersionFormat(_) => "INVALID_VERSION_FORMAT",
            MigrationError::DuplicateDescriptor { .. } => "DUPLICATE_DESCRIPTOR",
            MigrationError::CyclicRegistry(_) => "CYCLIC_REGISTRY",
            MigrationError::EmptyVersionSet => "EMPTY_VERSION_SET",
            MigrationError::AmbiguousMaxVersion(_) => "AMBIGUOUS_MAX_VERSION",
            MigrationError::AlreadyAtTarget(_) => "ALREADY_AT_TARGET",
            MigrationError::NoPathFound { .. } => "NO_PATH_FOUND",
            MigrationError::UninitializedStore => "UNINITIALIZED_STORE",
            MigrationError::StepFailed { .. } => "STEP_FAILED",
            MigrationError::Store(_) => "STORE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_path_message_names_both_versions() {
        let err = MigrationError::NoPathFound {
            from: Version::new(0, 1, 0),
            to: Version::new(0, 9, 0),
        };
        let message = err.to_string();
        assert!(message.contains("0.1.0"));
        assert!(message.contains("0.9.0"));
    }

    #[test]
    fn test_step_failed_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = MigrationError::step_failed(Version::new(0, 2, 0), Version::new(0, 3, 0), cause);

        assert_eq!(
            err.failed_step(),
            Some((Version::new(0, 2, 0), Version::new(0, 3, 0)))
        );
        assert!(err.to_string().contains("0.2.0 -> 0.3.0"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.error_code(), "STEP_FAILED");
    }

    #[test]
    fn test_already_at_target_is_noop() {
        assert!(MigrationError::AlreadyAtTarget(Version::new(1, 0, 0)).is_noop());
        assert!(!MigrationError::UninitializedStore.is_noop());
        assert!(!MigrationError::EmptyVersionSet.is_noop());
    }
}
