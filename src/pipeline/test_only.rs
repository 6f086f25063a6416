//! Run the engine tests against an existing build.

use super::BuildContext;
use crate::error::{BuildError, Result};
use crate::output::OutputManager;
use crate::progress;
use crate::runner::{CommandRunner, classify_lines, path_arg};
use crate::toolchain::ToolchainLocator;

/// First output line mentioning "tests passed", trimmed.
pub fn tests_passed_line(output: &str) -> Option<&str> {
    output
        .lines()
        .find(|line| line.to_lowercase().contains("tests passed"))
        .map(str::trim)
}

/// Run `ctest --preset <preset> --output-on-failure` on a prior build.
pub async fn run_tests_only(
    context: &BuildContext,
    locator: &ToolchainLocator,
    output: &OutputManager,
) -> Result<()> {
    let layout = context.layout();
    let build_dir = layout.engine_build_dir(context.development_mode);
    if !build_dir.is_dir() {
        return Err(BuildError::BuildDirMissing { path: build_dir });
    }
    let test_binary = layout.test_binary(context.platform, context.development_mode);
    if !test_binary.is_file() {
        return Err(BuildError::TestsNotBuilt { path: test_binary });
    }

    output.dim(&format!("Build directory: {}", build_dir.display()))?;
    output.dim(&format!("Preset: {}", context.preset))?;
    output.blank()?;

    let ctest = match locator.locate_ctest().await {
        Some(path) => path_arg(&path),
        None => {
            log::debug!("ctest not located, relying on PATH");
            "ctest".to_string()
        }
    };
    let argv = vec![
        ctest,
        "--preset".to_string(),
        context.preset.clone(),
        "--output-on-failure".to_string(),
    ];

    let runner = CommandRunner::new(context.verbose, output.clone());
    let result = progress::track(
        output,
        !context.verbose,
        "Running tests",
        runner.run(&argv, &layout.engine_dir(), "Unit tests"),
    )
    .await?;

    if result.succeeded {
        if let Some(summary) = tests_passed_line(&result.output) {
            output.success(summary)?;
        }
        return Ok(());
    }

    if !context.verbose {
        output.blank()?;
        output.failure("Tests failed")?;
        output.blank()?;
        let lines = classify_lines(&result.output);
        output.highlighted_lines(
            lines
                .iter()
                .filter(|l| !l.text.trim().is_empty())
                .map(|l| (l.is_error, l.text.as_str())),
        )?;
    }
    Err(BuildError::TestsFailed)
}
