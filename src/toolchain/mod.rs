//! External toolchain discovery.
//!
//! Each required tool is searched in strict priority order (PATH, IDE-bundled
//! copies, package-manager globals, well-known install directories) and must
//! pass a version probe before it counts as available. All tools are probed
//! before any verdict is reached, so the user sees the full picture at once.

mod probe;
mod search;
mod vcpkg;

pub use probe::{PROBE_TIMEOUT, QUERY_TIMEOUT};
pub use vcpkg::ROOT_VARIABLES as VCPKG_ROOT_VARIABLES;

use crate::error::{BuildError, Result};
use crate::platform::Platform;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// External tools the pipeline depends on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Tool {
    /// Native build configuration driver
    CMake,
    /// Build accelerator used by the CMake presets
    Ninja,
    /// App package manager client
    Pnpm,
    /// Native dependency manager
    Vcpkg,
}

impl Tool {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Tool::CMake => "CMake",
            Tool::Ninja => "Ninja",
            Tool::Pnpm => "pnpm",
            Tool::Vcpkg => "vcpkg",
        }
    }

    /// Executable name without extension.
    pub fn program(self) -> &'static str {
        match self {
            Tool::CMake => "cmake",
            Tool::Ninja => "ninja",
            Tool::Pnpm => "pnpm",
            Tool::Vcpkg => "vcpkg",
        }
    }

    /// Tools needed for a run, in display order.
    pub fn required(build_engine: bool, build_app: bool) -> Vec<Tool> {
        let mut tools = Vec::new();
        if build_engine {
            tools.extend([Tool::CMake, Tool::Ninja]);
        }
        if build_app {
            tools.push(Tool::Pnpm);
        }
        if build_engine {
            tools.push(Tool::Vcpkg);
        }
        tools
    }
}

/// Where a tool was found.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Discovery {
    /// Named by an environment variable
    EnvVar(String),
    /// On the search PATH
    Path,
    /// Bundled with Visual Studio
    Ide,
    /// Under the npm global prefix or root
    PackageManager,
    /// In a fixed install directory
    WellKnown,
}

/// Availability of one tool.
#[derive(Clone, Debug)]
pub struct ToolStatus {
    /// Which tool this is
    pub tool: Tool,
    /// Display name
    pub name: String,
    /// Resolved executable (or root directory for vcpkg); present iff available
    pub resolved_path: Option<PathBuf>,
    /// Whether the tool can be used
    pub available: bool,
    /// Version line, or root path for vcpkg
    pub info: String,
    /// Search step that found it
    pub discovered_via: Option<Discovery>,
}

impl ToolStatus {
    /// A located, working tool.
    pub fn found(tool: Tool, path: PathBuf, info: String, via: Discovery) -> Self {
        Self {
            tool,
            name: tool.name().to_string(),
            resolved_path: Some(path),
            available: true,
            info,
            discovered_via: Some(via),
        }
    }

    /// A tool that could not be located or executed.
    pub fn missing(tool: Tool) -> Self {
        Self {
            tool,
            name: tool.name().to_string(),
            resolved_path: None,
            available: false,
            info: String::new(),
            discovered_via: None,
        }
    }
}

/// Statuses for every required tool, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct Prerequisites {
    statuses: Vec<ToolStatus>,
}

impl Prerequisites {
    /// Wrap collected statuses.
    pub fn new(statuses: Vec<ToolStatus>) -> Self {
        Self { statuses }
    }

    /// All statuses, available or not.
    pub fn statuses(&self) -> &[ToolStatus] {
        &self.statuses
    }

    /// Whether every required tool is usable.
    pub fn all_available(&self) -> bool {
        self.statuses.iter().all(|s| s.available)
    }

    /// Names of the unavailable tools.
    pub fn missing(&self) -> Vec<String> {
        self.statuses
            .iter()
            .filter(|s| !s.available)
            .map(|s| s.name.clone())
            .collect()
    }

    fn status(&self, tool: Tool) -> Option<&ToolStatus> {
        self.statuses.iter().find(|s| s.tool == tool && s.available)
    }

    /// Convert into a [`Toolchain`], failing if anything is missing.
    pub fn into_toolchain(self, platform: Platform) -> Result<Toolchain> {
        if !self.all_available() {
            return Err(BuildError::PrerequisitesMissing {
                missing: self.missing(),
            });
        }
        Ok(Toolchain::from_prerequisites(&self, platform))
    }
}

/// Resolved tool locations threaded through the pipeline stages.
#[derive(Clone, Debug, Default)]
pub struct Toolchain {
    /// cmake executable
    pub cmake: Option<PathBuf>,
    /// ctest executable (next to cmake when present there)
    pub ctest: Option<PathBuf>,
    /// ninja executable
    pub ninja: Option<PathBuf>,
    /// ninja must be named explicitly because CMake will not find it on PATH
    pub ninja_off_path: bool,
    /// pnpm executable
    pub pnpm: Option<PathBuf>,
    /// pnpm must be invoked by path rather than bare name
    pub pnpm_needs_rewrite: bool,
    /// vcpkg root directory
    pub vcpkg_root: Option<PathBuf>,
}

impl Toolchain {
    fn from_prerequisites(prerequisites: &Prerequisites, platform: Platform) -> Self {
        let path_of = |tool| {
            prerequisites
                .status(tool)
                .and_then(|s| s.resolved_path.clone())
        };
        let off_path = |tool| {
            prerequisites
                .status(tool)
                .is_some_and(|s| s.discovered_via != Some(Discovery::Path))
        };

        let cmake = path_of(Tool::CMake);
        let ctest = cmake.as_deref().and_then(|cmake| sibling_ctest(cmake, platform));
        let pnpm = path_of(Tool::Pnpm);
        let pnpm_needs_rewrite = match &pnpm {
            Some(path) if platform.lacks_shebang_execution() => {
                path.as_os_str() != OsStr::new(Tool::Pnpm.program())
            }
            Some(_) => off_path(Tool::Pnpm),
            None => false,
        };

        Self {
            cmake,
            ctest,
            ninja: path_of(Tool::Ninja),
            ninja_off_path: off_path(Tool::Ninja),
            pnpm,
            pnpm_needs_rewrite,
            vcpkg_root: path_of(Tool::Vcpkg),
        }
    }

    /// Program to invoke for cmake.
    pub fn cmake_program(&self) -> String {
        program_or_bare(self.cmake.as_deref(), Tool::CMake.program())
    }

    /// Program to invoke for ctest.
    pub fn ctest_program(&self) -> String {
        program_or_bare(self.ctest.as_deref(), "ctest")
    }

    /// Extra configure arguments needed for tools CMake cannot find by itself.
    pub fn cmake_configure_args(&self) -> Vec<String> {
        match &self.ninja {
            Some(ninja) if self.ninja_off_path => {
                vec![format!("-DCMAKE_MAKE_PROGRAM={}", ninja.display())]
            }
            _ => Vec::new(),
        }
    }

    /// Bare-name rewrites the command runner must apply.
    pub fn command_rewrites(&self) -> Vec<(String, PathBuf)> {
        match &self.pnpm {
            Some(path) if self.pnpm_needs_rewrite => {
                vec![(Tool::Pnpm.program().to_string(), path.clone())]
            }
            _ => Vec::new(),
        }
    }

    /// Environment every child process inherits.
    pub fn child_env(&self) -> Vec<(String, OsString)> {
        match &self.vcpkg_root {
            Some(root) => vec![(
                vcpkg::ROOT_VARIABLES[0].to_string(),
                root.as_os_str().to_os_string(),
            )],
            None => Vec::new(),
        }
    }
}

fn program_or_bare(path: Option<&Path>, bare: &str) -> String {
    path.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| bare.to_string())
}

fn sibling_ctest(cmake: &Path, platform: Platform) -> Option<PathBuf> {
    let candidate = cmake.parent()?.join(platform.executable_name("ctest"));
    candidate.is_file().then_some(candidate)
}

/// Searches the host for required tools.
#[derive(Debug)]
pub struct ToolchainLocator {
    platform: Platform,
    path_var: Option<OsString>,
    env: HashMap<String, OsString>,
    home: Option<PathBuf>,
    cwd: PathBuf,
    system_locations: bool,
    visual_studio: OnceCell<Option<PathBuf>>,
}

impl ToolchainLocator {
    /// Locator over the current process environment.
    pub fn from_env(platform: Platform) -> Self {
        let env = std::env::vars_os()
            .filter_map(|(k, v)| k.into_string().ok().map(|k| (k, v)))
            .collect::<HashMap<_, _>>();
        Self {
            platform,
            path_var: std::env::var_os("PATH"),
            env,
            home: dirs::home_dir(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            system_locations: true,
            visual_studio: OnceCell::new(),
        }
    }

    /// Locator that sees nothing but what is configured on it: no PATH, no
    /// environment, no home directory, no IDE or well-known install locations.
    pub fn isolated(platform: Platform) -> Self {
        Self {
            platform,
            path_var: None,
            env: HashMap::new(),
            home: None,
            cwd: PathBuf::from("."),
            system_locations: false,
            visual_studio: OnceCell::new(),
        }
    }

    /// Override the search PATH.
    pub fn with_path(mut self, path: impl Into<OsString>) -> Self {
        self.path_var = Some(path.into());
        self
    }

    /// Set one environment variable as seen by discovery.
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Override the home directory.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Platform being searched.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn env_var(&self, key: &str) -> Option<&OsStr> {
        self.env
            .get(key)
            .map(OsString::as_os_str)
            .filter(|v| !v.is_empty())
    }

    fn on_path(&self, program: &str) -> Option<PathBuf> {
        let path_var = self.path_var.as_ref()?;
        which::which_in(program, Some(path_var), &self.cwd).ok()
    }

    /// Locate one tool and verify it runs.
    pub async fn locate(&self, tool: Tool) -> ToolStatus {
        if tool == Tool::Vcpkg {
            return match vcpkg::locate(self).await {
                Some(found) => {
                    let info = found.root.display().to_string();
                    ToolStatus::found(tool, found.root, info, found.via)
                }
                None => ToolStatus::missing(tool),
            };
        }

        let Some((path, via)) = search::find_executable(self, tool).await else {
            log::debug!("{} not found", tool.name());
            return ToolStatus::missing(tool);
        };
        log::debug!("{} candidate: {} ({:?})", tool.name(), path.display(), via);

        match probe::version(&path).await {
            Some(version) => ToolStatus::found(tool, path, version, via),
            None => {
                log::warn!(
                    "{} found at {} but `--version` failed; treating it as missing",
                    tool.name(),
                    path.display()
                );
                ToolStatus::missing(tool)
            }
        }
    }

    /// Locate every tool, one at a time, without stopping at the first miss.
    pub async fn check(&self, tools: &[Tool]) -> Prerequisites {
        let mut statuses = Vec::with_capacity(tools.len());
        for tool in tools {
            statuses.push(self.locate(*tool).await);
        }
        Prerequisites::new(statuses)
    }

    /// Resolve ctest without a full prerequisite check (test-only runs).
    pub async fn locate_ctest(&self) -> Option<PathBuf> {
        if let Some(path) = self.on_path("ctest") {
            return Some(path);
        }
        let cmake = search::find_executable(self, Tool::CMake).await?.0;
        sibling_ctest(&cmake, self.platform)
    }
}
