//! Project-wide version bumps.
//!
//! The `VERSION` file is the source of truth. A bump computes the new version,
//! renders every target file in memory and only then writes them in a fixed
//! order, so malformed input or an unexpected file layout never leaves a
//! half-updated tree.

mod targets;

pub use targets::{Rewrite, render_rewrites};

use crate::error::{ErrorExt, Result, VersionError};
use crate::project::ProjectLayout;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A strict `MAJOR.MINOR.PATCH` version.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VersionTriple {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
}

impl VersionTriple {
    /// Create a version from its components.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `X.Y.Z`, ignoring surrounding whitespace. Pre-release and build
    /// suffixes are rejected.
    pub fn parse(input: &str) -> std::result::Result<Self, VersionError> {
        let invalid = || VersionError::InvalidFormat {
            input: input.trim().to_string(),
        };
        let parsed = semver::Version::parse(input.trim()).map_err(|_| invalid())?;
        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// Apply a bump target. Fails instead of wrapping when the bumped
    /// component is already `u64::MAX`.
    pub fn bumped(self, target: &BumpTarget) -> std::result::Result<Self, VersionError> {
        let next = |value: u64, component: &'static str| {
            value.checked_add(1).ok_or_else(|| VersionError::Overflow {
                version: self.to_string(),
                component,
            })
        };
        Ok(match target {
            BumpTarget::Major => Self::new(next(self.major, "major")?, 0, 0),
            BumpTarget::Minor => Self::new(self.major, next(self.minor, "minor")?, 0),
            BumpTarget::Patch => Self::new(self.major, self.minor, next(self.patch, "patch")?),
            BumpTarget::Exact(version) => *version,
        })
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionTriple {
    type Err = VersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// How to compute the next version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BumpTarget {
    /// `X+1.0.0`
    Major,
    /// `X.Y+1.0`
    Minor,
    /// `X.Y.Z+1`
    Patch,
    /// A literal version
    Exact(VersionTriple),
}

impl FromStr for BumpTarget {
    type Err = VersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            other => VersionTriple::parse(other).map(Self::Exact),
        }
    }
}

/// Outcome of a bump.
#[derive(Clone, Debug)]
pub struct VersionBump {
    /// Version before the bump
    pub from: VersionTriple,
    /// Version after the bump
    pub to: VersionTriple,
    /// Whether files were left untouched
    pub dry_run: bool,
    /// Files rewritten, in write order (empty for a dry run)
    pub written: Vec<PathBuf>,
}

/// Reads and rewrites the version across the project.
#[derive(Clone, Debug)]
pub struct VersionCoordinator {
    layout: ProjectLayout,
}

impl VersionCoordinator {
    /// Coordinator for the project at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: ProjectLayout::new(root),
        }
    }

    /// Current version from the `VERSION` file.
    pub fn current(&self) -> Result<VersionTriple> {
        let path = self.layout.version_file();
        if !path.is_file() {
            return Err(VersionError::VersionFileMissing { path }.into());
        }
        let contents = std::fs::read_to_string(&path).fs_context("reading", &path)?;
        Ok(VersionTriple::parse(&contents)?)
    }

    /// Compute and, unless `dry_run`, apply a bump to every target file.
    pub fn bump(&self, target: &BumpTarget, dry_run: bool) -> Result<VersionBump> {
        let from = self.current()?;
        let to = from.bumped(target)?;
        log::info!("Version bump {} -> {} (dry run: {})", from, to, dry_run);

        if dry_run {
            return Ok(VersionBump {
                from,
                to,
                dry_run,
                written: Vec::new(),
            });
        }

        let rewrites = render_rewrites(&self.layout, to)?;
        let mut written = Vec::with_capacity(rewrites.len());
        for rewrite in rewrites {
            if let Err(source) = std::fs::write(&rewrite.path, &rewrite.contents) {
                return Err(VersionError::PartialWrite {
                    written,
                    failed: rewrite.path,
                    source,
                }
                .into());
            }
            log::debug!("Wrote {}", rewrite.path.display());
            written.push(rewrite.path);
        }

        Ok(VersionBump {
            from,
            to,
            dry_run,
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_resets_lower_components() {
        let v = VersionTriple::new(1, 2, 3);
        assert_eq!(v.bumped(&BumpTarget::Patch).unwrap().to_string(), "1.2.4");
        assert_eq!(v.bumped(&BumpTarget::Minor).unwrap().to_string(), "1.3.0");
        assert_eq!(v.bumped(&BumpTarget::Major).unwrap().to_string(), "2.0.0");
        assert_eq!(
            VersionTriple::new(0, 9, 9)
                .bumped(&BumpTarget::Minor)
                .unwrap()
                .to_string(),
            "0.10.0"
        );
    }

    #[test]
    fn bump_at_component_maximum_is_rejected() {
        let v = VersionTriple::parse("18446744073709551615.0.0").unwrap();
        assert!(matches!(
            v.bumped(&BumpTarget::Major),
            Err(VersionError::Overflow {
                component: "major",
                ..
            })
        ));
        assert_eq!(
            v.bumped(&BumpTarget::Patch).unwrap(),
            VersionTriple::new(u64::MAX, 0, 1)
        );
        assert!(
            VersionTriple::new(1, 2, u64::MAX)
                .bumped(&BumpTarget::Patch)
                .is_err()
        );
    }

    #[test]
    fn overflowing_bump_writes_nothing_even_on_dry_run() {
        let root = tempfile::tempdir().unwrap();
        let marker = root.path().join("VERSION");
        std::fs::write(&marker, "18446744073709551615.0.0\n").unwrap();

        let coordinator = VersionCoordinator::new(root.path());
        for dry_run in [true, false] {
            let err = coordinator.bump(&BumpTarget::Major, dry_run).unwrap_err();
            assert!(matches!(
                err,
                crate::error::BuildError::Version(VersionError::Overflow { .. })
            ));
        }
        assert_eq!(
            std::fs::read_to_string(&marker).unwrap(),
            "18446744073709551615.0.0\n"
        );
    }

    #[test]
    fn targets_parse_keywords_and_literals() {
        assert_eq!("patch".parse::<BumpTarget>().unwrap(), BumpTarget::Patch);
        assert_eq!(
            "9.9.9".parse::<BumpTarget>().unwrap(),
            BumpTarget::Exact(VersionTriple::new(9, 9, 9))
        );
        assert!(matches!(
            "1.2".parse::<BumpTarget>(),
            Err(VersionError::InvalidFormat { .. })
        ));
        assert!("1.2.3-beta.1".parse::<BumpTarget>().is_err());
        assert!("1.2.3+build".parse::<BumpTarget>().is_err());
        assert!("next".parse::<BumpTarget>().is_err());
    }

    #[test]
    fn version_file_is_trimmed() {
        assert_eq!(
            VersionTriple::parse(" 0.1.1\n").unwrap(),
            VersionTriple::new(0, 1, 1)
        );
    }

    #[test]
    fn missing_version_file_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let err = VersionCoordinator::new(root.path()).current().unwrap_err();
        assert!(matches!(
            err,
            crate::error::BuildError::Version(VersionError::VersionFileMissing { .. })
        ));
    }
}
