//! Command line interface for the Vayu build orchestrator.
//!
//! Parses and validates arguments, then dispatches to the build pipeline,
//! the test-only runner or the version coordinator.

mod args;

pub use args::{Args, ColorMode, RunCommand};

use crate::error::{BuildError, Result};
use crate::output::OutputManager;
use crate::pipeline::{BuildContext, Pipeline, display_path, next_steps, run_tests_only};
use crate::platform::Platform;
use crate::toolchain::ToolchainLocator;
use crate::version::{BumpTarget, VersionCoordinator};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Output manager matching the parsed color and verbosity flags.
pub fn output_for(args: &Args) -> OutputManager {
    OutputManager::new(args.color.choice(), args.verbose)
}

/// Main CLI entry point
pub async fn run(args: Args, output: OutputManager) -> Result<()> {
    let platform = Platform::current()?;
    log::debug!("Host platform: {}", platform);

    let command = args.into_command(platform)?;
    output.header()?;

    match command {
        RunCommand::BumpVersion {
            root,
            target,
            dry_run,
        } => bump_version(&output, platform, &root, &target, dry_run),
        RunCommand::TestOnly(context) => test_only(&output, &context).await,
        RunCommand::Build(context) => build(&output, context).await,
    }
}

async fn build(output: &OutputManager, context: BuildContext) -> Result<()> {
    let cwd = current_dir();
    let locator = ToolchainLocator::from_env(context.platform);
    let mut pipeline = Pipeline::new(context.clone(), output.clone(), locator)
        .with_display_root(&cwd);
    let report = pipeline.run().await?;
    log::debug!("Pipeline history: {:?}", report.history);

    output.build_complete("Build complete", report.elapsed, &report.artifacts)?;
    output.next_steps(&next_steps(
        &context,
        &context.layout(),
        &report.artifacts,
        &cwd,
    ))?;
    Ok(())
}

async fn test_only(output: &OutputManager, context: &BuildContext) -> Result<()> {
    let started = Instant::now();
    output.step(1, 1, "Tests")?;
    let locator = ToolchainLocator::from_env(context.platform);
    run_tests_only(context, &locator, output).await?;
    output.build_complete("Tests complete", started.elapsed(), &[])?;
    Ok(())
}

fn bump_version(
    output: &OutputManager,
    platform: Platform,
    root: &Path,
    target: &BumpTarget,
    dry_run: bool,
) -> Result<()> {
    let bump = VersionCoordinator::new(root).bump(target, dry_run)?;
    let to = bump.to.to_string();
    output.version_transition(&bump.from.to_string(), &to)?;

    if bump.dry_run {
        output.info("Dry run - no changes will be made")?;
        output.blank()?;
        return Ok(());
    }

    for path in &bump.written {
        output.success(&format!("Updated {}", display_path(path, root)))?;
    }
    output.blank()?;
    output.success(&format!("Version bumped to {to}"))?;
    output.blank()?;
    output.next_steps(&[
        ("Review changes".to_string(), vec!["git diff".to_string()]),
        (
            "Commit and tag".to_string(),
            vec![
                format!("git commit -am \"chore: bump version to {to}\""),
                format!("git tag v{to}"),
                format!("git push {} git push --tags", platform.command_separator()),
            ],
        ),
    ])?;
    Ok(())
}

/// Print a fatal error. Command failures have already printed their report.
pub fn report_error(output: &OutputManager, error: &BuildError) {
    if error.already_reported() {
        return;
    }
    let _ = output.error(&error.to_string());
    if error.suggests_verbose() && !output.is_verbose() {
        let _ = output.verbose_hint();
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
