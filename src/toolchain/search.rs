//! Executable search for CMake, Ninja and pnpm.
//!
//! Search order: PATH, Visual Studio bundled copies (Windows), npm global
//! locations (pnpm only), then fixed install directories. The first existing
//! candidate wins; a candidate that later fails its version probe does not
//! cause the search to continue.

use super::probe::{self, QUERY_TIMEOUT};
use super::{Discovery, Tool, ToolchainLocator};
use crate::platform::Platform;
use std::path::{Path, PathBuf};

const VSWHERE_RELATIVE: &str = "Microsoft Visual Studio/Installer/vswhere.exe";
const VC_TOOLS_COMPONENT: &str = "Microsoft.VisualStudio.Component.VC.Tools.x86.x64";
const VS_CMAKE_ROOT: &str = "Common7/IDE/CommonExtensions/Microsoft/CMake";

/// Find a candidate executable for `tool`.
pub(super) async fn find_executable(
    locator: &ToolchainLocator,
    tool: Tool,
) -> Option<(PathBuf, Discovery)> {
    if let Some(path) = locator.on_path(tool.program()) {
        return Some((path, Discovery::Path));
    }

    if locator.system_locations && locator.platform == Platform::Windows {
        if let Some(path) = ide_bundled(locator, tool).await {
            return Some((path, Discovery::Ide));
        }
    }

    if tool == Tool::Pnpm {
        if let Some(path) = npm_global(locator).await {
            return Some((path, Discovery::PackageManager));
        }
    }

    well_known(locator, tool).map(|path| (path, Discovery::WellKnown))
}

/// Visual Studio installation directory with C++ tools, looked up once per locator.
pub(super) async fn visual_studio(locator: &ToolchainLocator) -> Option<PathBuf> {
    if !locator.system_locations || locator.platform != Platform::Windows {
        return None;
    }
    locator
        .visual_studio
        .get_or_init(|| query_visual_studio(locator))
        .await
        .clone()
}

async fn query_visual_studio(locator: &ToolchainLocator) -> Option<PathBuf> {
    let program_files = locator
        .env_var("ProgramFiles(x86)")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("C:/Program Files (x86)"));
    let vswhere = program_files.join(VSWHERE_RELATIVE);
    if !vswhere.is_file() {
        log::debug!("vswhere not found at {}", vswhere.display());
        return None;
    }

    let stdout = probe::query(
        &vswhere,
        &[
            "-latest",
            "-requires",
            VC_TOOLS_COMPONENT,
            "-property",
            "installationPath",
        ],
        QUERY_TIMEOUT,
    )
    .await?;

    let install = stdout.lines().next().map(str::trim).filter(|l| !l.is_empty())?;
    log::debug!("Visual Studio installation: {}", install);
    Some(PathBuf::from(install))
}

async fn ide_bundled(locator: &ToolchainLocator, tool: Tool) -> Option<PathBuf> {
    let relative = match tool {
        Tool::CMake => "CMake/bin/cmake.exe",
        Tool::Ninja => "Ninja/ninja.exe",
        Tool::Pnpm | Tool::Vcpkg => return None,
    };
    let candidate = visual_studio(locator)
        .await?
        .join(VS_CMAKE_ROOT)
        .join(relative);
    candidate.is_file().then_some(candidate)
}

async fn npm_global(locator: &ToolchainLocator) -> Option<PathBuf> {
    let npm = locator.on_path("npm")?;
    let names = pnpm_file_names(locator.platform);

    if let Some(prefix) = probe::query(&npm, &["config", "get", "prefix"], QUERY_TIMEOUT).await {
        let prefix = prefix.trim();
        if !prefix.is_empty() && prefix != "undefined" {
            let found = prefix_dirs(locator.platform, Path::new(prefix))
                .iter()
                .find_map(|dir| first_file(dir, names));
            if found.is_some() {
                return found;
            }
        }
    }

    let root = probe::query(&npm, &["root", "-g"], QUERY_TIMEOUT).await?;
    root_dirs(Path::new(root.trim()))
        .iter()
        .find_map(|dir| first_file(dir, names))
}

/// Directories under `npm config get prefix` that may hold the pnpm shim.
fn prefix_dirs(platform: Platform, prefix: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![prefix.join("node_modules").join(".bin"), prefix.to_path_buf()];
    if platform != Platform::Windows {
        dirs.push(prefix.join("bin"));
    }
    dirs
}

/// Directories around `npm root -g`, which points at the global node_modules.
fn root_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(parent) = root.parent() {
        dirs.push(parent.join("node_modules").join(".bin"));
        dirs.push(parent.to_path_buf());
        if let Some(grandparent) = parent.parent() {
            dirs.push(grandparent.join("bin"));
        }
    }
    dirs.push(root.join("pnpm").join("bin"));
    dirs
}

fn pnpm_file_names(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Windows => &["pnpm.cmd", "pnpm.exe", "pnpm"],
        Platform::Linux | Platform::MacOs => &["pnpm"],
    }
}

fn first_file(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Fixed install directories for the platform, in search order.
pub(super) fn well_known_dirs(locator: &ToolchainLocator) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    match locator.platform {
        Platform::Windows => {
            if locator.system_locations {
                dirs.push(PathBuf::from("C:/Program Files/CMake/bin"));
                dirs.push(PathBuf::from("C:/Program Files (x86)/CMake/bin"));
            }
            if let Some(appdata) = locator.env_var("APPDATA") {
                dirs.push(Path::new(appdata).join("npm"));
            }
            if let Some(program_files) = locator.env_var("ProgramFiles") {
                dirs.push(Path::new(program_files).join("nodejs"));
            }
            if let Some(local) = locator.env_var("LOCALAPPDATA") {
                dirs.push(Path::new(local).join("pnpm"));
            }
        }
        Platform::Linux | Platform::MacOs => {
            if locator.system_locations {
                dirs.push(PathBuf::from("/usr/local/bin"));
                dirs.push(PathBuf::from("/opt/homebrew/bin"));
                dirs.push(PathBuf::from("/usr/bin"));
            }
            if let Some(home) = &locator.home {
                dirs.push(home.join(".local/bin"));
                dirs.push(home.join(".local/share/pnpm"));
                dirs.push(home.join("Library/pnpm"));
            }
        }
    }
    dirs
}

fn well_known(locator: &ToolchainLocator, tool: Tool) -> Option<PathBuf> {
    let names: Vec<String> = match (tool, locator.platform) {
        (Tool::Pnpm, platform) => pnpm_file_names(platform)
            .iter()
            .map(|n| n.to_string())
            .collect(),
        (tool, platform) => vec![platform.executable_name(tool.program())],
    };
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    well_known_dirs(locator)
        .iter()
        .find_map(|dir| first_file(dir, &names))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_home_directories_are_searched() {
        let locator = ToolchainLocator::isolated(Platform::Linux).with_home("/home/dev");
        assert_eq!(
            well_known_dirs(&locator),
            [
                PathBuf::from("/home/dev/.local/bin"),
                PathBuf::from("/home/dev/.local/share/pnpm"),
                PathBuf::from("/home/dev/Library/pnpm"),
            ]
        );
    }

    #[test]
    fn windows_directories_come_from_environment() {
        let locator = ToolchainLocator::isolated(Platform::Windows)
            .with_env_var("APPDATA", "C:/Users/dev/AppData/Roaming")
            .with_env_var("LOCALAPPDATA", "C:/Users/dev/AppData/Local");
        assert_eq!(
            well_known_dirs(&locator),
            [
                PathBuf::from("C:/Users/dev/AppData/Roaming/npm"),
                PathBuf::from("C:/Users/dev/AppData/Local/pnpm"),
            ]
        );
    }

    #[test]
    fn pnpm_names_prefer_cmd_shim_on_windows() {
        assert_eq!(pnpm_file_names(Platform::Windows)[0], "pnpm.cmd");
        assert_eq!(pnpm_file_names(Platform::Linux), ["pnpm"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn path_wins_over_well_known() {
        use std::os::unix::fs::PermissionsExt;

        let on_path = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        for dir in [on_path.path().to_path_buf(), home.path().join(".local/bin")] {
            std::fs::create_dir_all(&dir).unwrap();
            let tool = dir.join("ninja");
            std::fs::write(&tool, "#!/bin/sh\necho 1.11.1\n").unwrap();
            std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let locator = ToolchainLocator::isolated(Platform::Linux)
            .with_path(on_path.path())
            .with_home(home.path());
        let (path, via) = find_executable(&locator, Tool::Ninja).await.unwrap();
        assert_eq!(path, on_path.path().join("ninja"));
        assert_eq!(via, Discovery::Path);

        let locator = ToolchainLocator::isolated(Platform::Linux).with_home(home.path());
        let (path, via) = find_executable(&locator, Tool::Ninja).await.unwrap();
        assert_eq!(path, home.path().join(".local/bin/ninja"));
        assert_eq!(via, Discovery::WellKnown);
    }

    #[test]
    fn npm_candidates_include_node_modules_bin() {
        assert_eq!(
            prefix_dirs(Platform::Windows, Path::new("C:/npm")),
            [PathBuf::from("C:/npm/node_modules/.bin"), PathBuf::from("C:/npm")]
        );
        assert_eq!(
            prefix_dirs(Platform::Linux, Path::new("/usr/local"))[2],
            PathBuf::from("/usr/local/bin")
        );
        assert_eq!(
            root_dirs(Path::new("/usr/local/lib/node_modules")),
            [
                PathBuf::from("/usr/local/lib/node_modules/.bin"),
                PathBuf::from("/usr/local/lib"),
                PathBuf::from("/usr/local/bin"),
                PathBuf::from("/usr/local/lib/node_modules/pnpm/bin"),
            ]
        );
    }

    #[cfg(unix)]
    fn executable(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Fake `npm` answering `config get prefix` and `root -g`.
    #[cfg(unix)]
    fn fake_npm(bin: &Path, prefix: &str, root: &str) {
        executable(
            &bin.join("npm"),
            &format!(
                "case \"$1\" in\n  config) echo \"{prefix}\" ;;\n  root) echo \"{root}\" ;;\n  *) exit 1 ;;\nesac"
            ),
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pnpm_found_under_npm_prefix() {
        let bin = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        executable(&prefix.path().join("bin/pnpm"), "echo 9.1.0");
        fake_npm(bin.path(), &prefix.path().display().to_string(), "/nonexistent");

        let locator = ToolchainLocator::isolated(Platform::Linux).with_path(bin.path());
        let (path, via) = find_executable(&locator, Tool::Pnpm).await.unwrap();
        assert_eq!(path, prefix.path().join("bin/pnpm"));
        assert_eq!(via, Discovery::PackageManager);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pnpm_found_beside_npm_global_root() {
        let bin = tempfile::tempdir().unwrap();
        let lib = tempfile::tempdir().unwrap();
        let root = lib.path().join("node_modules");
        executable(&root.join(".bin/pnpm"), "echo 9.1.0");
        fake_npm(bin.path(), "undefined", &root.display().to_string());

        let locator = ToolchainLocator::isolated(Platform::Linux).with_path(bin.path());
        let (path, via) = find_executable(&locator, Tool::Pnpm).await.unwrap();
        assert_eq!(path, root.join(".bin/pnpm"));
        assert_eq!(via, Discovery::PackageManager);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_npm_falls_through_to_well_known() {
        let bin = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        executable(&bin.path().join("npm"), "exit 1");
        executable(&home.path().join(".local/share/pnpm/pnpm"), "echo 9.1.0");

        let locator = ToolchainLocator::isolated(Platform::Linux)
            .with_path(bin.path())
            .with_home(home.path());
        let (path, via) = find_executable(&locator, Tool::Pnpm).await.unwrap();
        assert_eq!(path, home.path().join(".local/share/pnpm/pnpm"));
        assert_eq!(via, Discovery::WellKnown);
    }
}
