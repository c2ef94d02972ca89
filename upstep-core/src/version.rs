//! Schema version values
//!
//! A [`Version`] is a `MAJOR.MINOR.PATCH` triple compared numerically,
//! component by component. Comparing the raw strings would rank `0.10.0`
//! below `0.4.0`, so versions are always parsed before they are ordered.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreResult, MigrationError};

/// Sentinel accepted wherever a target version is expected
pub const HIGHEST: &str = "highest";

/// Parsed `MAJOR.MINOR.PATCH` schema version
///
/// Field order is significant: the derived `Ord` compares `major`, then
/// `minor`, then `patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a dotted version string
    pub fn parse(s: &str) -> CoreResult<Self> {
        let invalid = || MigrationError::InvalidVersionFormat(s.to_string());

        let mut parts = s.split('.');
        let mut next = || -> CoreResult<u64> {
            let part = parts.next().ok_or_else(invalid)?;
            // u64::from_str accepts a leading '+', so check the digits first
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }

    /// Highest version of a collection
    ///
    /// Fails on an empty collection, and when the greatest value occurs more
    /// than once rather than silently picking one of the duplicates.
    pub fn max_of<I>(versions: I) -> CoreResult<Version>
    where
        I: IntoIterator<Item = Version>,
    {
        let mut highest: Option<Version> = None;
        let mut tied = false;

        for version in versions {
            match highest {
                Some(current) if version < current => {}
                Some(current) if version == current => tied = true,
                _ => {
                    highest = Some(version);
                    tied = false;
                }
            }
        }

        match highest {
            None => Err(MigrationError::EmptyVersionSet),
            Some(version) if tied => Err(MigrationError::AmbiguousMaxVersion(version)),
            Some(version) => Ok(version),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// What a migration request is aiming for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetVersion {
    /// The highest version known to the registry
    Highest,
    /// An explicit version
    Exact(Version),
}

impl FromStr for TargetVersion {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(HIGHEST) {
            Ok(TargetVersion::Highest)
        } else {
            Version::parse(trimmed).map(TargetVersion::Exact)
        }
    }
}

impl From<Version> for TargetVersion {
    fn from(version: Version) -> Self {
        TargetVersion::Exact(version)
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetVersion::Highest => write!(f, "{}", HIGHEST),
            TargetVersion::Exact(version) => write!(f, "{}", version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_valid_versions() {
        assert_eq!(v("0.4.0"), Version::new(0, 4, 0));
        assert_eq!(v("10.20.30"), Version::new(10, 20, 30));
        assert_eq!(v("007.0.1"), Version::new(7, 0, 1));
    }

    #[test]
    fn test_parse_rejects_malformed_versions() {
        for raw in [
            "", "1", "1.2", "1.2.3.4", "1..3", "a.b.c", "-1.0.0", "+1.0.0", " 1.0.0", "1.0.0 ",
            "1.0.x", "99999999999999999999.0.0",
        ] {
            match Version::parse(raw) {
                Err(MigrationError::InvalidVersionFormat(input)) => assert_eq!(input, raw),
                other => panic!("expected InvalidVersionFormat for {:?}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_numeric_not_lexicographic_ordering() {
        assert_eq!(v("0.10.0").cmp(&v("0.4.0")), Ordering::Greater);
        assert_eq!(v("0.4.0").cmp(&v("0.4.0")), Ordering::Equal);
        assert_eq!(v("1.0.0").cmp(&v("0.99.99")), Ordering::Greater);
        assert_eq!(v("0.3.9").cmp(&v("0.3.10")), Ordering::Less);
    }

    #[test]
    fn test_max_of_uses_numeric_comparison() {
        let versions = vec![v("0.3.0"), v("0.4.0"), v("0.10.0")];
        assert_eq!(Version::max_of(versions).unwrap(), v("0.10.0"));
    }

    #[test]
    fn test_max_of_empty_set() {
        assert!(matches!(
            Version::max_of(Vec::new()),
            Err(MigrationError::EmptyVersionSet)
        ));
    }

    #[test]
    fn test_max_of_rejects_tied_maximum() {
        let versions = vec![v("0.4.0"), v("0.2.0"), v("0.4.0")];
        match Version::max_of(versions) {
            Err(MigrationError::AmbiguousMaxVersion(version)) => assert_eq!(version, v("0.4.0")),
            other => panic!("expected AmbiguousMaxVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_max_of_ignores_ties_below_maximum() {
        let versions = vec![v("0.2.0"), v("0.2.0"), v("0.5.0")];
        assert_eq!(Version::max_of(versions).unwrap(), v("0.5.0"));
    }

    #[test]
    fn test_target_version_parsing() {
        assert_eq!("highest".parse::<TargetVersion>().unwrap(), TargetVersion::Highest);
        assert_eq!("HIGHEST".parse::<TargetVersion>().unwrap(), TargetVersion::Highest);
        assert_eq!(
            "0.4.0".parse::<TargetVersion>().unwrap(),
            TargetVersion::Exact(v("0.4.0"))
        );
        assert!("latest".parse::<TargetVersion>().is_err());
    }

    #[test]
    fn test_serde_uses_dotted_string() {
        let json = serde_json::to_string(&v("0.10.2")).unwrap();
        assert_eq!(json, "\"0.10.2\"");
        assert!(serde_json::from_str::<Version>("\"0.10\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_ordering_matches_component_tuples(
            a in (0u64..50, 0u64..50, 0u64..50),
            b in (0u64..50, 0u64..50, 0u64..50),
        ) {
            let va = Version::new(a.0, a.1, a.2);
            let vb = Version::new(b.0, b.1, b.2);
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
        }

        #[test]
        fn prop_display_parses_back(major in 0u64..1000, minor in 0u64..1000, patch in 0u64..1000) {
            let version = Version::new(major, minor, patch);
            prop_assert_eq!(Version::parse(&version.to_string()).unwrap(), version);
        }
    }
}
