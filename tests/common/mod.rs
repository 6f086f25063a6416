#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fixture project under tests/fixtures/project.
pub fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/project")
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// Scratch copy of the fixture project.
pub fn fixture_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    copy_tree(&fixture_root(), dir.path());
    dir
}

/// The five version targets of a project, relative to its root.
pub const VERSION_TARGETS: [&str; 5] = [
    "VERSION",
    "engine/CMakeLists.txt",
    "engine/include/vayu/version.hpp",
    "engine/vcpkg.json",
    "app/package.json",
];

/// Contents of every version target.
pub fn snapshot(root: &Path) -> Vec<Vec<u8>> {
    VERSION_TARGETS
        .iter()
        .map(|rel| fs::read(root.join(rel)).unwrap())
        .collect()
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
