//! Command line argument parsing and validation.
//!
//! Parsing is done by clap; cross-flag rules live in [`Args::validate`] so they
//! are reported as configuration errors before anything runs.

use crate::error::{CliError, ErrorExt, Result};
use crate::pipeline::BuildContext;
use crate::platform::Platform;
use crate::version::BumpTarget;
use clap::{Parser, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use termcolor::ColorChoice;

/// Build orchestrator for the Vayu engine and desktop app
#[derive(Parser, Debug, Clone)]
#[command(
    name = "vayu_build",
    version,
    about = "Build orchestrator for the Vayu engine and desktop app",
    long_about = "Builds the native engine with CMake and the desktop app with pnpm, then collects the produced binaries and installers.

Examples:
  vayu_build                       build everything (production)
  vayu_build --dev                 build everything (development)
  vayu_build -e                    build engine only
  vayu_build -a                    build app only
  vayu_build -e -t                 build engine and run tests
  vayu_build --test-only           run tests without rebuilding
  vayu_build -c -v                 clean build with full output
  vayu_build --bump-version patch  bump patch version (0.1.1 -> 0.1.2)
  vayu_build --bump-version 2.0.0  set a specific version"
)]
pub struct Args {
    /// Development build (Debug engine, dev app)
    #[arg(long)]
    pub dev: bool,

    /// Production build (default)
    #[arg(long)]
    pub prod: bool,

    /// Build the engine only
    #[arg(short = 'e', long)]
    pub engine_only: bool,

    /// Build the app only
    #[arg(short = 'a', long)]
    pub app_only: bool,

    /// Remove the engine build directory before configuring
    #[arg(short = 'c', long)]
    pub clean: bool,

    /// Build and run the engine tests
    #[arg(short = 't', long)]
    pub tests: bool,

    /// Run existing tests without rebuilding
    #[arg(long)]
    pub test_only: bool,

    /// Bump the project version: major, minor, patch or X.Y.Z
    #[arg(long, value_name = "VERSION")]
    pub bump_version: Option<String>,

    /// Show the version change without writing files (with --bump-version)
    #[arg(long)]
    pub dry_run: bool,

    /// Stream full command output instead of progress spinners
    #[arg(short, long)]
    pub verbose: bool,

    /// Project root containing engine/ and app/
    #[arg(long, value_name = "DIR", env = "VAYU_PROJECT_ROOT", default_value = ".")]
    pub project_root: PathBuf,

    /// When to use colored output
    #[arg(long, value_enum, value_name = "WHEN", default_value_t = ColorMode::Auto)]
    pub color: ColorMode,
}

/// Terminal color preference.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

impl ColorMode {
    /// Resolve to a `termcolor` choice for stdout.
    pub fn choice(self) -> ColorChoice {
        match self {
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
            ColorMode::Auto if std::io::stdout().is_terminal() => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
        }
    }
}

/// What a validated invocation asks for.
#[derive(Clone, Debug)]
pub enum RunCommand {
    /// Run the build pipeline
    Build(BuildContext),
    /// Run tests against an existing build
    TestOnly(BuildContext),
    /// Rewrite the project version
    BumpVersion {
        /// Project root
        root: PathBuf,
        /// Requested bump
        target: BumpTarget,
        /// Preview only
        dry_run: bool,
    },
}

fn conflict(arguments: &[&str], hint: Option<&str>) -> CliError {
    CliError::ConflictingArguments {
        arguments: arguments.iter().map(|a| a.to_string()).collect(),
        hint: hint.map(str::to_string),
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check flag combinations.
    ///
    /// A version bump ignores every build flag; otherwise the test-only rules
    /// are checked before the component rules.
    pub fn validate(&self) -> std::result::Result<(), CliError> {
        if self.bump_version.is_some() {
            return Ok(());
        }
        if self.dry_run {
            return Err(CliError::InvalidArguments {
                reason: "--dry-run requires --bump-version".to_string(),
            });
        }
        if self.dev && self.prod {
            return Err(conflict(&["--dev", "--prod"], None));
        }
        if self.test_only {
            if self.tests {
                return Err(conflict(
                    &["--test-only", "-t"],
                    Some("tests will run automatically"),
                ));
            }
            if self.app_only {
                return Err(conflict(
                    &["--test-only", "-a"],
                    Some("tests run against the engine build"),
                ));
            }
        }
        if self.engine_only && self.app_only {
            return Err(conflict(&["-e", "-a"], None));
        }
        Ok(())
    }

    /// Validate and turn the arguments into a command for `platform`.
    pub fn into_command(self, platform: Platform) -> Result<RunCommand> {
        self.validate()?;
        let root = std::path::absolute(&self.project_root)
            .fs_context("resolving project root", &self.project_root)?;

        if let Some(target) = &self.bump_version {
            return Ok(RunCommand::BumpVersion {
                target: target.parse()?,
                root,
                dry_run: self.dry_run,
            });
        }

        let mut context = BuildContext::new(platform, root, self.dev);
        context.verbose = self.verbose;
        context.skip_engine = self.app_only;
        context.skip_app = self.engine_only || self.test_only;
        context.run_tests = self.tests;
        context.clean = self.clean;

        if self.test_only {
            Ok(RunCommand::TestOnly(context))
        } else {
            Ok(RunCommand::Build(context))
        }
    }
}
