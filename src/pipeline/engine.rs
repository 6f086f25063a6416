//! Engine stage: clean, configure, build, verify and optionally test.

use super::BuildContext;
use crate::error::{BuildError, ErrorExt, Result};
use crate::progress;
use crate::project::{BUILD_TESTS_OPTION, ProjectLayout, build_type};
use crate::runner::CommandRunner;
use crate::toolchain::Toolchain;
use std::path::PathBuf;

/// Argv for `cmake --preset <preset>`.
pub(super) fn configure_argv(context: &BuildContext, toolchain: &Toolchain) -> Vec<String> {
    let mut argv = vec![
        toolchain.cmake_program(),
        "--preset".to_string(),
        context.preset.clone(),
    ];
    argv.extend(toolchain.cmake_configure_args());
    if context.run_tests {
        argv.push(BUILD_TESTS_OPTION.to_string());
    }
    argv
}

/// Build the engine and return the verified binary path.
pub(super) async fn build(
    context: &BuildContext,
    layout: &ProjectLayout,
    toolchain: &Toolchain,
    runner: &CommandRunner,
) -> Result<PathBuf> {
    let output = runner.output();
    let engine_dir = layout.engine_dir();
    let build_dir = layout.engine_build_dir(context.development_mode);
    let build_type = build_type(context.development_mode);

    output.dim(&format!("Build type: {build_type}"))?;
    output.dim(&format!("Preset: {}", context.preset))?;
    output.blank()?;

    if context.clean && build_dir.exists() {
        progress::track(output, !context.verbose, "Cleaning build directory", async {
            tokio::fs::remove_dir_all(&build_dir)
                .await
                .fs_context("removing build directory", &build_dir)
        })
        .await?;
        log::info!("Removed {}", build_dir.display());
        output.blank()?;
    }

    runner
        .step(
            "Configuring CMake",
            &configure_argv(context, toolchain),
            &engine_dir,
            "CMake configuration",
        )
        .await?;
    output.blank()?;

    let build_argv = vec![
        toolchain.cmake_program(),
        "--build".to_string(),
        "--preset".to_string(),
        context.preset.clone(),
    ];
    runner
        .step(&format!("Building {build_type}"), &build_argv, &engine_dir, "Build")
        .await?;

    let binary = layout.engine_binary(context.platform, context.development_mode);
    if !binary.is_file() {
        return Err(BuildError::MissingOutput { path: binary });
    }
    log::info!("Engine binary: {}", binary.display());

    if context.run_tests {
        output.blank()?;
        let test_argv = vec![
            toolchain.ctest_program(),
            "--preset".to_string(),
            context.preset.clone(),
        ];
        runner
            .step("Running tests", &test_argv, &engine_dir, "Unit tests")
            .await?;
    }

    Ok(binary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    #[test]
    fn configure_requests_tests_only_when_asked() {
        let mut context = BuildContext::new(Platform::Linux, "/p", true);
        let toolchain = Toolchain {
            cmake: Some(PathBuf::from("/usr/bin/cmake")),
            ..Toolchain::default()
        };
        assert_eq!(
            configure_argv(&context, &toolchain),
            ["/usr/bin/cmake", "--preset", "linux-dev"]
        );

        context.run_tests = true;
        assert_eq!(
            configure_argv(&context, &toolchain).last().map(String::as_str),
            Some(BUILD_TESTS_OPTION)
        );
    }

    #[test]
    fn configure_names_ninja_found_off_path() {
        let context = BuildContext::new(Platform::Windows, "C:/vayu", false);
        let toolchain = Toolchain {
            ninja: Some(PathBuf::from("C:/VS/Ninja/ninja.exe")),
            ninja_off_path: true,
            ..Toolchain::default()
        };
        assert_eq!(
            configure_argv(&context, &toolchain),
            [
                "cmake",
                "--preset",
                "windows-prod",
                "-DCMAKE_MAKE_PROGRAM=C:/VS/Ninja/ninja.exe"
            ]
        );
    }
}
