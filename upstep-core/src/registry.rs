//! Migration registry
//!
//! The registry is the author-maintained catalog of schema steps. Each
//! [`MigrationDescriptor`] moves an installation from one version to the
//! next; what the step actually does is the opaque procedure `P`, supplied by
//! the storage layer. Adding a schema version means registering one more
//! descriptor, never editing an existing one.

use std::collections::{BTreeSet, HashMap};

use crate::error::{CoreResult, MigrationError};
use crate::version::Version;

/// One registered schema transition
#[derive(Debug, Clone)]
pub struct MigrationDescriptor<P> {
    from: Version,
    to: Version,
    procedure: P,
}

impl<P> MigrationDescriptor<P> {
    pub fn new(from: Version, to: Version, procedure: P) -> Self {
        Self {
            from,
            to,
            procedure,
        }
    }

    pub fn from_version(&self) -> Version {
        self.from
    }

    pub fn to_version(&self) -> Version {
        self.to
    }

    /// The change procedure run when this step is applied
    pub fn procedure(&self) -> &P {
        &self.procedure
    }

    /// `from -> to` label used in logs and reports
    pub fn label(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }
}

/// Immutable catalog of migration steps
///
/// Construction fails with [`MigrationError::DuplicateDescriptor`] if two
/// steps depart the same version, so a registry that exists is always
/// unambiguous.
#[derive(Debug, Clone)]
pub struct MigrationRegistry<P> {
    descriptors: Vec<MigrationDescriptor<P>>,
    by_from: HashMap<Version, usize>,
}

impl<P> MigrationRegistry<P> {
    /// Build a registry from descriptors in registration order
    pub fn new(descriptors: Vec<MigrationDescriptor<P>>) -> CoreResult<Self> {
        let mut by_from = HashMap::with_capacity(descriptors.len());

        for (index, descriptor) in descriptors.iter().enumerate() {
            if let Some(previous) = by_from.insert(descriptor.from, index) {
                return Err(MigrationError::DuplicateDescriptor {
                    from: descriptor.from,
                    first: descriptors[previous].to,
                    second: descriptor.to,
                });
            }
        }

        Ok(Self {
            descriptors,
            by_from,
        })
    }

    /// Start an empty registry builder
    pub fn builder() -> RegistryBuilder<P> {
        RegistryBuilder::new()
    }

    /// All descriptors, in registration order
    pub fn all(&self) -> &[MigrationDescriptor<P>] {
        &self.descriptors
    }

    /// Every version that appears as the source or target of a step
    pub fn unique_versions(&self) -> BTreeSet<Version> {
        self.descriptors
            .iter()
            .flat_map(|d| [d.from, d.to])
            .collect()
    }

    /// The step departing `version`, if one is registered
    pub fn descriptor_from(&self, version: &Version) -> Option<&MigrationDescriptor<P>> {
        self.by_from.get(version).map(|&index| &self.descriptors[index])
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// One `from -> to` line per registered step
    pub fn describe(&self) -> String {
        self.descriptors
            .iter()
            .map(|descriptor| format!("{}\n", descriptor.label()))
            .collect()
    }
}

/// Incremental registry construction
pub struct RegistryBuilder<P> {
    descriptors: Vec<MigrationDescriptor<P>>,
}

impl<P> RegistryBuilder<P> {
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Register the step `from -> to`
    pub fn register(mut self, from: Version, to: Version, procedure: P) -> Self {
        self.descriptors
            .push(MigrationDescriptor::new(from, to, procedure));
        self
    }

    /// Register a prebuilt descriptor
    pub fn add_descriptor(mut self, descriptor: MigrationDescriptor<P>) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn build(self) -> CoreResult<MigrationRegistry<P>> {
        MigrationRegistry::new(self.descriptors)
    }
}

impl<P> Default for RegistryBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_registry_preserves_registration_order() {
        let registry = MigrationRegistry::builder()
            .register(v("0.2.0"), v("0.3.0"), "b")
            .register(v("0.1.0"), v("0.2.0"), "a")
            .build()
            .unwrap();

        let labels: Vec<String> = registry.all().iter().map(|d| d.label()).collect();
        assert_eq!(labels, vec!["0.2.0 -> 0.3.0", "0.1.0 -> 0.2.0"]);
        assert_eq!(registry.describe(), "0.2.0 -> 0.3.0\n0.1.0 -> 0.2.0\n");
    }

    #[test]
    fn test_unique_versions_covers_both_ends() {
        let registry = MigrationRegistry::builder()
            .register(v("0.1.0"), v("0.2.0"), ())
            .register(v("0.2.0"), v("0.10.0"), ())
            .build()
            .unwrap();

        let versions: Vec<Version> = registry.unique_versions().into_iter().collect();
        assert_eq!(versions, vec![v("0.1.0"), v("0.2.0"), v("0.10.0")]);
    }

    #[test]
    fn test_descriptor_from_lookup() {
        let registry = MigrationRegistry::builder()
            .register(v("0.3.0"), v("0.4.0"), "step")
            .build()
            .unwrap();

        let step = registry.descriptor_from(&v("0.3.0")).unwrap();
        assert_eq!(step.to_version(), v("0.4.0"));
        assert_eq!(*step.procedure(), "step");
        assert!(registry.descriptor_from(&v("0.4.0")).is_none());
    }

    #[test]
    fn test_duplicate_departure_rejected_at_build() {
        let result = MigrationRegistry::builder()
            .register(v("0.3.0"), v("0.4.0"), ())
            .register(v("0.3.0"), v("0.5.0"), ())
            .build();

        match result {
            Err(MigrationError::DuplicateDescriptor { from, first, second }) => {
                assert_eq!(from, v("0.3.0"));
                assert_eq!(first, v("0.4.0"));
                assert_eq!(second, v("0.5.0"));
            }
            other => panic!("expected DuplicateDescriptor, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry: MigrationRegistry<()> = MigrationRegistry::new(Vec::new()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.unique_versions().is_empty());
        assert_eq!(registry.describe(), "");
    }
}
