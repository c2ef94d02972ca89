//! Version graph and path resolution
//!
//! Schema histories are chains, occasionally trees, and the registry forbids
//! two steps leaving the same version. Resolving a path is therefore a
//! deterministic walk along the single departing edge of each node, never a
//! search. Cycles are rejected once, when the graph is built.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::debug;

use crate::error::{CoreResult, MigrationError};
use crate::registry::{MigrationDescriptor, MigrationRegistry};
use crate::version::{TargetVersion, Version};

/// Read-only navigation structure over a registry
#[derive(Debug, Clone)]
pub struct VersionGraph<P> {
    registry: MigrationRegistry<P>,
    edges: BTreeMap<Version, Vec<usize>>,
}

impl<P> VersionGraph<P> {
    /// Build the graph, failing with [`MigrationError::CyclicRegistry`] if any
    /// chain of steps returns to a version it already passed through
    pub fn build(registry: MigrationRegistry<P>) -> CoreResult<Self> {
        let mut edges: BTreeMap<Version, Vec<usize>> = BTreeMap::new();
        for (index, descriptor) in registry.all().iter().enumerate() {
            edges
                .entry(descriptor.from_version())
                .or_default()
                .push(index);
        }

        let graph = Self { registry, edges };
        graph.check_acyclic()?;

        debug!(
            steps = graph.registry.len(),
            versions = graph.registry.unique_versions().len(),
            "Version graph built"
        );
        Ok(graph)
    }

    pub fn registry(&self) -> &MigrationRegistry<P> {
        &self.registry
    }

    /// Steps departing `version`
    pub fn departures(&self, version: &Version) -> impl Iterator<Item = &MigrationDescriptor<P>> {
        let descriptors = self.registry.all();
        self.edges
            .get(version)
            .into_iter()
            .flatten()
            .map(move |&index| &descriptors[index])
    }

    /// The single step departing `version`, if any
    fn departure(&self, version: &Version) -> Option<&MigrationDescriptor<P>> {
        self.departures(version).next()
    }

    /// Ordered steps leading from `current` to `target`
    pub fn find_path(&self, current: Version, target: Version) -> CoreResult<MigrationPath<'_, P>> {
        if current == target {
            return Err(MigrationError::AlreadyAtTarget(current));
        }

        let mut steps = Vec::new();
        let mut position = current;

        while position != target {
            let step = self
                .departure(&position)
                .ok_or(MigrationError::NoPathFound {
                    from: current,
                    to: target,
                })?;
            steps.push(step);
            position = step.to_version();
        }

        debug!(from = %current, to = %target, steps = steps.len(), "Resolved migration path");
        Ok(MigrationPath {
            start: current,
            target,
            steps,
        })
    }

    /// Highest version known to the registry
    pub fn max_version(&self) -> CoreResult<Version> {
        Version::max_of(self.registry.unique_versions())
    }

    /// Turn a request target into a concrete version
    pub fn resolve_target(&self, target: TargetVersion) -> CoreResult<Version> {
        match target {
            TargetVersion::Highest => self.max_version(),
            TargetVersion::Exact(version) => Ok(version),
        }
    }

    fn check_acyclic(&self) -> CoreResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        let mut marks: HashMap<Version, Mark> = HashMap::new();

        for &start in self.edges.keys() {
            if marks.contains_key(&start) {
                continue;
            }

            let mut trail = Vec::new();
            let mut position = start;
            loop {
                match marks.get(&position) {
                    Some(Mark::InProgress) => return Err(MigrationError::CyclicRegistry(position)),
                    Some(Mark::Done) => break,
                    None => {}
                }
                marks.insert(position, Mark::InProgress);
                trail.push(position);

                match self.departure(&position) {
                    Some(step) => position = step.to_version(),
                    None => break,
                }
            }

            for version in trail {
                marks.insert(version, Mark::Done);
            }
        }

        Ok(())
    }
}

/// Ordered, contiguous sequence of steps from a start version to a target
#[derive(Debug)]
pub struct MigrationPath<'g, P> {
    start: Version,
    target: Version,
    steps: Vec<&'g MigrationDescriptor<P>>,
}

impl<'g, P> MigrationPath<'g, P> {
    pub fn start(&self) -> Version {
        self.start
    }

    pub fn target(&self) -> Version {
        self.target
    }

    pub fn steps(&self) -> &[&'g MigrationDescriptor<P>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'g MigrationDescriptor<P>> + '_ {
        self.steps.iter().copied()
    }

    /// Every version visited, start and target included
    pub fn versions(&self) -> Vec<Version> {
        std::iter::once(self.start)
            .chain(self.steps.iter().map(|step| step.to_version()))
            .collect()
    }
}

impl<P> fmt::Display for MigrationPath<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let versions: Vec<String> = self.versions().iter().map(Version::to_string).collect();
        write!(f, "{}", versions.join(" -> "))
    }
}
