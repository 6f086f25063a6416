//! App stage: dependencies, icons, compile and (production) package.

use super::{BuildContext, files_with_extension};
use crate::error::{ErrorExt, Result};
use crate::platform::Platform;
use crate::progress;
use crate::project::{ENGINE_BINARY, ICON_ICO_256, ICON_PNG_256, ICON_PNG_512, ProjectLayout};
use crate::runner::CommandRunner;
use std::path::{Path, PathBuf};
use tokio::fs;

fn pnpm(args: &[&str]) -> Vec<String> {
    std::iter::once("pnpm")
        .chain(args.iter().copied())
        .map(str::to_string)
        .collect()
}

pub(super) async fn build(
    context: &BuildContext,
    layout: &ProjectLayout,
    runner: &CommandRunner,
    engine_binary: Option<&Path>,
) -> Result<()> {
    let output = runner.output();
    let app_dir = layout.app_dir();
    let spinners = !context.verbose;

    if layout.app_dependencies_dir().is_dir() {
        log::debug!("node_modules present, skipping install");
    } else {
        runner
            .step(
                "Installing dependencies",
                &pnpm(&["install"]),
                &app_dir,
                "pnpm install",
            )
            .await?;
        output.blank()?;
    }

    progress::track(output, spinners, "Setting up icons", prepare_icons(layout)).await?;
    output.blank()?;

    runner
        .step(
            "Compiling TypeScript",
            &pnpm(&["run", "electron:compile"]),
            &app_dir,
            "TypeScript compilation",
        )
        .await?;

    if context.development_mode {
        return Ok(());
    }

    output.blank()?;
    runner
        .step(
            "Building React app",
            &pnpm(&["run", "build"]),
            &app_dir,
            "React build",
        )
        .await?;
    output.blank()?;

    if let Some(binary) = engine_binary.filter(|b| b.is_file()) {
        progress::track(
            output,
            spinners,
            "Copying engine binary",
            async {
                stage_engine_binary(context.platform, binary, layout)
                    .await
                    .map(|_| ())
            },
        )
        .await?;
        output.blank()?;
    } else {
        log::warn!("No engine binary available; packaging without it");
        output.warn("No engine binary found; packaging without it")?;
    }

    runner
        .step(
            "Packaging application",
            &pnpm(&["run", "electron:pack"]),
            &app_dir,
            "Electron packaging",
        )
        .await?;

    Ok(())
}

/// Copy the app icons into the build tree. Absent sizes are skipped.
pub(super) async fn prepare_icons(layout: &ProjectLayout) -> Result<()> {
    let build_dir = layout.app_build_dir();
    fs::create_dir_all(&build_dir)
        .await
        .fs_context("creating app build directory", &build_dir)?;

    let png_dir = layout.icon_png_dir();
    let ico_dir = layout.icon_ico_dir();

    // Copied in order so the 512px PNG overwrites the 256px one
    let copies = [
        (png_dir.join(ICON_PNG_256), build_dir.join("icon.png")),
        (ico_dir.join(ICON_ICO_256), build_dir.join("icon.ico")),
        (png_dir.join(ICON_PNG_512), build_dir.join("icon.png")),
    ];
    for (source, target) in &copies {
        if source.is_file() {
            copy_file(source, target).await?;
        } else {
            log::warn!("Icon not found: {}", source.display());
        }
    }

    let icon_set = build_dir.join("icons");
    fs::create_dir_all(&icon_set)
        .await
        .fs_context("creating icon directory", &icon_set)?;
    for png in files_with_extension(&png_dir, "png") {
        if let Some(name) = png.file_name() {
            copy_file(&png, &icon_set.join(name)).await?;
        }
    }
    Ok(())
}

/// Place the engine binary (and Windows DLLs) where the packager picks it up.
pub(super) async fn stage_engine_binary(
    platform: Platform,
    binary: &Path,
    layout: &ProjectLayout,
) -> Result<PathBuf> {
    let resources = layout.app_resources_bin_dir();
    fs::create_dir_all(&resources)
        .await
        .fs_context("creating resources directory", &resources)?;

    if platform.ships_sibling_libraries() {
        if let Some(binary_dir) = binary.parent() {
            for dll in files_with_extension(binary_dir, "dll") {
                if let Some(name) = dll.file_name() {
                    copy_file(&dll, &resources.join(name)).await?;
                }
            }
        }
    }

    let target = resources.join(platform.executable_name(ENGINE_BINARY));
    copy_file(binary, &target).await?;
    make_executable(&target).await?;
    log::info!("Staged engine binary at {}", target.display());
    Ok(target)
}

async fn copy_file(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)
        .await
        .fs_context(&format!("copying {}", source.display()), target)?;
    Ok(())
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .fs_context("marking executable", path)
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
