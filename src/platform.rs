//! Host platform identity.
//!
//! The platform is resolved once per run and answers every platform-specific
//! question the later stages ask: preset naming, executable suffixes, build
//! tree layout and which installer kinds to collect.

use crate::error::{BuildError, Result};

/// Supported host platform.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Platform {
    /// Microsoft Windows
    Windows,
    /// Linux distributions
    Linux,
    /// Apple macOS
    MacOs,
}

/// Display name and CMake preset prefix for a platform.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlatformInfo {
    /// Human-readable name ("Windows", "Linux", "macOS")
    pub display_name: String,
    /// Preset name fragment ("windows", "linux", "macos")
    pub preset_prefix: String,
}

/// Installer kind the packager produces on a platform.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InstallerKind {
    /// Artifact label shown to the user
    pub label: &'static str,
    /// File extension without the dot
    pub extension: &'static str,
}

impl Platform {
    /// Resolve the host platform.
    pub fn current() -> Result<Self> {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map an operating system name (as in `std::env::consts::OS`) to a platform.
    pub fn from_os_name(os: &str) -> Result<Self> {
        match os {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            other => Err(BuildError::UnsupportedPlatform {
                os: other.to_string(),
            }),
        }
    }

    /// Display name and preset prefix.
    pub fn info(self) -> PlatformInfo {
        let (display_name, preset_prefix) = match self {
            Self::Windows => ("Windows", "windows"),
            Self::Linux => ("Linux", "linux"),
            Self::MacOs => ("macOS", "macos"),
        };
        PlatformInfo {
            display_name: display_name.to_string(),
            preset_prefix: preset_prefix.to_string(),
        }
    }

    /// Preset name for a build mode, e.g. `linux-prod`.
    pub fn preset(self, development_mode: bool) -> String {
        let suffix = if development_mode { "dev" } else { "prod" };
        format!("{}-{}", self.info().preset_prefix, suffix)
    }

    /// Append the platform executable suffix to a file stem.
    pub fn executable_name(self, stem: &str) -> String {
        match self {
            Self::Windows => format!("{stem}.exe"),
            Self::Linux | Self::MacOs => stem.to_string(),
        }
    }

    /// Multi-config generators place outputs in a per-build-type subdirectory.
    pub fn uses_config_subdir(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Whether dynamic libraries next to the engine must be shipped with it.
    pub fn ships_sibling_libraries(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Windows cannot execute shebang scripts by bare name through `CreateProcess`.
    pub fn lacks_shebang_execution(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Installer kinds collected from the packager's release directory, in order.
    pub fn installer_kinds(self) -> &'static [InstallerKind] {
        match self {
            Self::Windows => &[InstallerKind {
                label: "Installer",
                extension: "exe",
            }],
            Self::Linux => &[
                InstallerKind {
                    label: "AppImage",
                    extension: "AppImage",
                },
                InstallerKind {
                    label: "Debian",
                    extension: "deb",
                },
            ],
            Self::MacOs => &[InstallerKind {
                label: "DMG",
                extension: "dmg",
            }],
        }
    }

    /// Separator for chaining shell commands in printed hints.
    pub fn command_separator(self) -> &'static str {
        match self {
            Self::Windows => ";",
            Self::Linux | Self::MacOs => "&&",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.info().display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_platforms_have_distinct_stable_pairs() {
        let pairs: Vec<PlatformInfo> = ["windows", "linux", "macos"]
            .iter()
            .map(|os| Platform::from_os_name(os).unwrap().info())
            .collect();

        assert_eq!(pairs[0].display_name, "Windows");
        assert_eq!(pairs[0].preset_prefix, "windows");
        assert_eq!(pairs[1].display_name, "Linux");
        assert_eq!(pairs[1].preset_prefix, "linux");
        assert_eq!(pairs[2].display_name, "macOS");
        assert_eq!(pairs[2].preset_prefix, "macos");

        for (i, a) in pairs.iter().enumerate() {
            for b in &pairs[i + 1..] {
                assert_ne!(a, b);
            }
        }

        // Stable across calls
        assert_eq!(Platform::Linux.info(), Platform::Linux.info());
    }

    #[test]
    fn unknown_os_is_rejected() {
        for os in ["freebsd", "android", ""] {
            let err = Platform::from_os_name(os).unwrap_err();
            assert!(matches!(err, BuildError::UnsupportedPlatform { .. }));
        }
    }

    #[test]
    fn preset_combines_prefix_and_mode() {
        assert_eq!(Platform::Linux.preset(true), "linux-dev");
        assert_eq!(Platform::Windows.preset(false), "windows-prod");
        assert_eq!(Platform::MacOs.preset(false), "macos-prod");
    }

    #[test]
    fn executable_names_follow_platform() {
        assert_eq!(Platform::Windows.executable_name("vayu-engine"), "vayu-engine.exe");
        assert_eq!(Platform::MacOs.executable_name("vayu-engine"), "vayu-engine");
    }

    #[test]
    fn linux_collects_appimage_before_deb() {
        let labels: Vec<_> = Platform::Linux
            .installer_kinds()
            .iter()
            .map(|k| k.label)
            .collect();
        assert_eq!(labels, ["AppImage", "Debian"]);
    }

    #[test]
    fn current_platform_resolves_on_supported_hosts() {
        if cfg!(any(windows, target_os = "linux", target_os = "macos")) {
            assert!(Platform::current().is_ok());
        }
    }
}
