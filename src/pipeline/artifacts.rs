//! Artifact collection and follow-up hints.

use super::{Artifact, BuildContext, files_with_extension};
use crate::platform::Platform;
use crate::project::ProjectLayout;
use std::path::Path;

const ENGINE_LABEL: &str = "Engine";

/// `path` relative to `cwd` when it lies beneath it, otherwise unchanged.
pub fn display_path(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Files produced by the run: the engine binary first, then installers in
/// the platform's declared order.
pub fn collect_artifacts(
    context: &BuildContext,
    layout: &ProjectLayout,
    engine_binary: Option<&Path>,
    cwd: &Path,
) -> Vec<Artifact> {
    let mut artifacts = Vec::new();

    if let Some(binary) = engine_binary.filter(|b| b.is_file()) {
        artifacts.push(Artifact {
            label: ENGINE_LABEL.to_string(),
            path: display_path(binary, cwd),
        });
    }

    if context.skip_app || context.development_mode {
        return artifacts;
    }

    let release = layout.app_release_dir();
    if !release.is_dir() {
        log::warn!("Release directory {} not found", release.display());
        return artifacts;
    }
    for kind in context.platform.installer_kinds() {
        for installer in files_with_extension(&release, kind.extension) {
            artifacts.push(Artifact {
                label: kind.label.to_string(),
                path: display_path(&installer, cwd),
            });
        }
    }
    artifacts
}

fn run_local(path: &str) -> String {
    if Path::new(path).is_absolute() {
        path.to_string()
    } else {
        format!("./{path}")
    }
}

/// Suggested commands after a successful build, as (description, commands).
///
/// Development builds suggest starting the dev app; otherwise only the first
/// artifact gets a hint.
pub fn next_steps(
    context: &BuildContext,
    layout: &ProjectLayout,
    artifacts: &[Artifact],
    cwd: &Path,
) -> Vec<(String, Vec<String>)> {
    let platform = context.platform;

    if context.development_mode && !context.skip_app {
        let app = display_path(&layout.app_dir(), cwd);
        return vec![(
            "Run the development app".to_string(),
            vec![format!(
                "cd {app} {} pnpm run electron:dev",
                platform.command_separator()
            )],
        )];
    }

    let Some(first) = artifacts.first() else {
        return Vec::new();
    };
    let path = first.path.as_str();
    let step = match (first.label.as_str(), platform) {
        (ENGINE_LABEL, _) => Some(("Run the engine", run_local(path))),
        (_, Platform::Windows) => Some(("Run the installer", run_local(path))),
        ("AppImage", Platform::Linux) => Some((
            "Run the AppImage",
            format!("chmod +x {path} && {}", run_local(path)),
        )),
        ("Debian", Platform::Linux) => Some(("Install the package", format!("sudo dpkg -i {path}"))),
        (_, Platform::MacOs) => Some(("Open the DMG", format!("open {path}"))),
        _ => None,
    };
    step.map(|(description, command)| vec![(description.to_string(), vec![command])])
        .unwrap_or_default()
}
