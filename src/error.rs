//! Error types for build orchestration.
//!
//! This module defines every failure the orchestrator can report, grouped the
//! way the user sees them: configuration problems, missing prerequisites,
//! external command failures and version-bump failures.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Main error type for all orchestrator operations
#[derive(Error, Debug)]
pub enum BuildError {
    /// CLI argument and project layout errors
    #[error("{0}")]
    Cli(#[from] CliError),

    /// Host operating system is not Windows, Linux or macOS
    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform {
        /// Operating system name reported by the host
        os: String,
    },

    /// One or more required tools could not be located or executed
    #[error("Missing prerequisites: {}", missing.join(", "))]
    PrerequisitesMissing {
        /// Names of the unavailable tools, in declaration order
        missing: Vec<String>,
    },

    /// External command exited with a non-zero status
    #[error("{description} failed ({})", exit_label(*exit_code))]
    CommandFailed {
        /// Human description of the step
        description: String,
        /// Full command line
        command: String,
        /// Exit code, absent when the process was killed by a signal
        exit_code: Option<i32>,
    },

    /// External command executable could not be found
    #[error("Command not found: {program}")]
    CommandNotFound {
        /// Executable name or path that failed to spawn
        program: String,
    },

    /// A build step succeeded but its expected output is absent
    #[error("Binary not found: {}", path.display())]
    MissingOutput {
        /// Path where the output was expected
        path: PathBuf,
    },

    /// Test-only run without a prior build
    #[error("Build directory not found: {}\nRun a build first with: vayu_build -e -t", path.display())]
    BuildDirMissing {
        /// Expected build directory
        path: PathBuf,
    },

    /// Test-only run against a build configured without tests
    #[error("Tests not found at {}. Build with tests first:\nvayu_build -e -t", path.display())]
    TestsNotBuilt {
        /// Expected test binary
        path: PathBuf,
    },

    /// Test-only run completed with failing tests
    #[error("Tests failed")]
    TestsFailed,

    /// Ctrl-C received during the run
    #[error("Build interrupted")]
    Interrupted,

    /// Version bump errors
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Filesystem errors with the action and path that caused them
    #[error("Failed {action} ({}): {source}", path.display())]
    Fs {
        /// What was being done
        action: String,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Conflicting arguments
    #[error("Cannot use {} together{}", arguments.join(" and "), hint.as_deref().map(|h| format!(" ({h})")).unwrap_or_default())]
    ConflictingArguments {
        /// Arguments that conflict
        arguments: Vec<String>,
        /// Optional explanation
        hint: Option<String>,
    },

    /// A project directory the requested run depends on is absent
    #[error("{what} directory not found: {}", path.display())]
    MissingDirectory {
        /// Component name ("App", "Engine")
        what: String,
        /// Expected location
        path: PathBuf,
    },
}

/// Version bump errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Version string is not strictly `X.Y.Z`
    #[error("Invalid version format: {input} (expected: X.Y.Z)")]
    InvalidFormat {
        /// Offending input
        input: String,
    },

    /// The plain version marker file does not exist
    #[error("VERSION file not found: {}", path.display())]
    VersionFileMissing {
        /// Expected marker path
        path: PathBuf,
    },

    /// A text target does not contain the expected version declaration
    #[error("No {what} found in {}", file.display())]
    PatternNotFound {
        /// File searched
        file: PathBuf,
        /// Description of the missing declaration
        what: String,
    },

    /// A structured manifest could not be parsed or is not an object
    #[error("Cannot update {}: {reason}", file.display())]
    Manifest {
        /// Manifest path
        file: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Incrementing a component would exceed `u64::MAX`
    #[error("Cannot bump {component} version of {version}: component is at its maximum")]
    Overflow {
        /// Version being bumped
        version: String,
        /// Component that overflowed
        component: &'static str,
    },

    /// Writing stopped part-way; earlier files keep the new version
    #[error(
        "Failed to write {}: {source}\nAlready updated: {}",
        failed.display(),
        list_paths(written)
    )]
    PartialWrite {
        /// Files rewritten before the failure
        written: Vec<PathBuf>,
        /// File whose write failed
        failed: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn list_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "none".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl BuildError {
    /// Configuration errors are reported before any stage runs.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            BuildError::Cli(_) | BuildError::Version(VersionError::InvalidFormat { .. })
        )
    }

    /// Command failures print their report where they happen.
    pub fn already_reported(&self) -> bool {
        matches!(self, BuildError::CommandFailed { .. })
    }

    /// Whether re-running with `-v` would show more detail.
    pub fn suggests_verbose(&self) -> bool {
        matches!(
            self,
            BuildError::CommandFailed { .. } | BuildError::TestsFailed
        )
    }
}

/// Attaches an action and path to filesystem errors.
pub trait ErrorExt<T> {
    /// Wrap the error as [`BuildError::Fs`].
    fn fs_context(self, action: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::io::Result<T> {
    fn fs_context(self, action: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| BuildError::Fs {
            action: action.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}
