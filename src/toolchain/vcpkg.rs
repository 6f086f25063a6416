//! vcpkg root discovery.
//!
//! vcpkg is identified by its root directory rather than an executable: the
//! CMake presets read `VCPKG_ROOT` to find the toolchain file.

use super::{Discovery, ToolchainLocator, search};
use crate::platform::Platform;
use std::path::{Path, PathBuf};

/// Environment variables naming a vcpkg root, in priority order
pub const ROOT_VARIABLES: [&str; 2] = ["VCPKG_ROOT", "VCPKG_INSTALLATION_ROOT"];

/// A located vcpkg installation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct VcpkgRoot {
    pub root: PathBuf,
    pub via: Discovery,
}

pub(super) async fn locate(locator: &ToolchainLocator) -> Option<VcpkgRoot> {
    for variable in ROOT_VARIABLES {
        let Some(value) = locator.env_var(variable) else {
            continue;
        };
        let root = PathBuf::from(value);
        if root.is_dir() {
            log::debug!("vcpkg root from {}: {}", variable, root.display());
            return Some(VcpkgRoot {
                root,
                via: Discovery::EnvVar(variable.to_string()),
            });
        }
        log::warn!(
            "{} is set to {} but that directory does not exist",
            variable,
            root.display()
        );
    }

    if let Some(exe) = locator.on_path("vcpkg") {
        let exe = exe.canonicalize().unwrap_or(exe);
        if let Some(root) = exe.parent() {
            return Some(VcpkgRoot {
                root: root.to_path_buf(),
                via: Discovery::Path,
            });
        }
    }

    if let Some(vs) = search::visual_studio(locator).await {
        let root = vs.join("VC").join("vcpkg");
        if root.join("vcpkg.exe").is_file() {
            return Some(VcpkgRoot {
                root,
                via: Discovery::Ide,
            });
        }
    }

    let executable = locator.platform.executable_name("vcpkg");
    common_roots(locator)
        .into_iter()
        .find(|root| root.join(&executable).is_file())
        .map(|root| VcpkgRoot {
            root,
            via: Discovery::WellKnown,
        })
}

fn common_roots(locator: &ToolchainLocator) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    match locator.platform {
        Platform::Windows => {
            if locator.system_locations {
                roots.push(PathBuf::from("C:/vcpkg"));
                roots.push(PathBuf::from("C:/tools/vcpkg"));
            }
            if let Some(profile) = locator.env_var("USERPROFILE") {
                roots.push(Path::new(profile).join("vcpkg"));
            }
            if let Some(program_files) = locator.env_var("ProgramFiles") {
                roots.push(Path::new(program_files).join("vcpkg"));
            }
        }
        Platform::Linux | Platform::MacOs => {
            if let Some(home) = &locator.home {
                roots.push(home.join("vcpkg"));
            }
            if locator.system_locations {
                roots.push(PathBuf::from("/opt/vcpkg"));
                roots.push(PathBuf::from("/usr/local/vcpkg"));
            }
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::Tool;

    #[tokio::test]
    async fn primary_variable_wins() {
        let primary = tempfile::tempdir().unwrap();
        let secondary = tempfile::tempdir().unwrap();
        let locator = ToolchainLocator::isolated(Platform::Linux)
            .with_env_var("VCPKG_ROOT", primary.path())
            .with_env_var("VCPKG_INSTALLATION_ROOT", secondary.path());

        let found = locate(&locator).await.unwrap();
        assert_eq!(found.root, primary.path());
        assert_eq!(found.via, Discovery::EnvVar("VCPKG_ROOT".to_string()));
    }

    #[tokio::test]
    async fn stale_variable_falls_through() {
        let secondary = tempfile::tempdir().unwrap();
        let locator = ToolchainLocator::isolated(Platform::Linux)
            .with_env_var("VCPKG_ROOT", "/definitely/not/a/vcpkg/root")
            .with_env_var("VCPKG_INSTALLATION_ROOT", secondary.path());

        let found = locate(&locator).await.unwrap();
        assert_eq!(found.root, secondary.path());
    }

    #[tokio::test]
    async fn home_checkout_needs_executable() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join("vcpkg")).unwrap();
        let locator = ToolchainLocator::isolated(Platform::Linux).with_home(home.path());
        assert_eq!(locate(&locator).await, None);

        std::fs::write(home.path().join("vcpkg/vcpkg"), "").unwrap();
        let found = locate(&locator).await.unwrap();
        assert_eq!(found.root, home.path().join("vcpkg"));
        assert_eq!(found.via, Discovery::WellKnown);
    }

    #[tokio::test]
    async fn status_info_is_root_path() {
        let root = tempfile::tempdir().unwrap();
        let locator = ToolchainLocator::isolated(Platform::Linux)
            .with_env_var("VCPKG_ROOT", root.path());
        let status = locator.locate(Tool::Vcpkg).await;
        assert!(status.available);
        assert_eq!(status.info, root.path().display().to_string());
    }
}
