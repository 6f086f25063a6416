//! Build orchestrator for the Vayu native engine and desktop app.
//!
//! This library provides the orchestration core behind the `vayu_build` binary:
//! - toolchain discovery for CMake, Ninja, pnpm and vcpkg
//! - a staged pipeline that builds the engine, then packages the app
//! - subprocess execution with captured, keyword-highlighted failure output
//! - project-wide version bumps
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod project;
pub mod runner;
pub mod toolchain;
pub mod version;

// Re-export commonly used types
pub use error::{BuildError, CliError, Result, VersionError};
