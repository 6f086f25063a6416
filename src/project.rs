//! Fixed layout of a Vayu checkout.
//!
//! Every path and name the orchestrator relies on is derived here from the
//! project root, so stages never assemble paths by hand.

use crate::platform::Platform;
use std::path::{Path, PathBuf};

/// Engine executable stem
pub const ENGINE_BINARY: &str = "vayu-engine";

/// Engine unit test executable stem
pub const TEST_BINARY: &str = "vayu_tests";

/// CMake cache option enabling the unit test target
pub const BUILD_TESTS_OPTION: &str = "-DVAYU_BUILD_TESTS=ON";

/// Prefix of the version macros in the engine header
pub const VERSION_MACRO_PREFIX: &str = "VAYU_VERSION";

/// 256px app icon in the PNG icon set
pub const ICON_PNG_256: &str = "vayu_icon_256x256.png";

/// 512px app icon in the PNG icon set, preferred when present
pub const ICON_PNG_512: &str = "vayu_icon_512x512.png";

/// 256px app icon in the ICO icon set
pub const ICON_ICO_256: &str = "vayu_icon_256x256.ico";

/// Resolved paths for one project root.
#[derive(Clone, Debug)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Create a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// CMake project directory.
    pub fn engine_dir(&self) -> PathBuf {
        self.root.join("engine")
    }

    /// pnpm project directory.
    pub fn app_dir(&self) -> PathBuf {
        self.root.join("app")
    }

    /// Dependency marker: present once `pnpm install` has run.
    pub fn app_dependencies_dir(&self) -> PathBuf {
        self.app_dir().join("node_modules")
    }

    /// App build output tree (icons, bundled resources).
    pub fn app_build_dir(&self) -> PathBuf {
        self.app_dir().join("build")
    }

    /// Where the engine binary is staged inside the packaged app.
    pub fn app_resources_bin_dir(&self) -> PathBuf {
        self.app_build_dir().join("resources").join("bin")
    }

    /// Packager output directory.
    pub fn app_release_dir(&self) -> PathBuf {
        self.app_dir().join("release")
    }

    /// Source PNG icon set.
    pub fn icon_png_dir(&self) -> PathBuf {
        self.root.join("shared").join("icon_png")
    }

    /// Source ICO icon set.
    pub fn icon_ico_dir(&self) -> PathBuf {
        self.root.join("shared").join("icon_ico")
    }

    /// CMake binary directory for a build mode.
    pub fn engine_build_dir(&self, development_mode: bool) -> PathBuf {
        let name = if development_mode { "build" } else { "build-release" };
        self.engine_dir().join(name)
    }

    /// Engine executable inside the build tree.
    pub fn engine_binary(&self, platform: Platform, development_mode: bool) -> PathBuf {
        self.build_output(platform, development_mode, ENGINE_BINARY)
    }

    /// Unit test executable inside the build tree.
    pub fn test_binary(&self, platform: Platform, development_mode: bool) -> PathBuf {
        self.build_output(platform, development_mode, TEST_BINARY)
    }

    fn build_output(&self, platform: Platform, development_mode: bool, stem: &str) -> PathBuf {
        let mut dir = self.engine_build_dir(development_mode);
        if platform.uses_config_subdir() {
            dir.push(build_type(development_mode));
        }
        dir.join(platform.executable_name(stem))
    }

    /// Plain-text version marker.
    pub fn version_file(&self) -> PathBuf {
        self.root.join("VERSION")
    }

    /// CMake project manifest.
    pub fn engine_cmake_lists(&self) -> PathBuf {
        self.engine_dir().join("CMakeLists.txt")
    }

    /// C++ header carrying the version macros.
    pub fn engine_version_header(&self) -> PathBuf {
        self.engine_dir()
            .join("include")
            .join("vayu")
            .join("version.hpp")
    }

    /// vcpkg manifest.
    pub fn engine_vcpkg_manifest(&self) -> PathBuf {
        self.engine_dir().join("vcpkg.json")
    }

    /// npm package manifest.
    pub fn app_package_manifest(&self) -> PathBuf {
        self.app_dir().join("package.json")
    }
}

/// CMake build type for a mode.
pub fn build_type(development_mode: bool) -> &'static str {
    if development_mode { "Debug" } else { "Release" }
}
