//! In-memory rendering of the files that carry the project version.

use super::VersionTriple;
use crate::error::{BuildError, ErrorExt, Result, VersionError};
use crate::project::{ProjectLayout, VERSION_MACRO_PREFIX};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};

/// New contents for one file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rewrite {
    /// File to replace
    pub path: PathBuf,
    /// Full new contents
    pub contents: String,
}

/// Render every version target, in write order. Nothing is written.
pub fn render_rewrites(layout: &ProjectLayout, version: VersionTriple) -> Result<Vec<Rewrite>> {
    let mut rewrites = vec![Rewrite {
        path: layout.version_file(),
        contents: format!("{version}\n"),
    }];

    let cmake = layout.engine_cmake_lists();
    let contents = read(&cmake)?;
    rewrites.push(Rewrite {
        contents: cmake_project_version(&contents, version)
            .ok_or_else(|| pattern_missing(&cmake, "project(... VERSION X.Y.Z) declaration"))?,
        path: cmake,
    });

    let header = layout.engine_version_header();
    let contents = read(&header)?;
    rewrites.push(Rewrite {
        contents: header_macros(&contents, version, &header)?,
        path: header,
    });

    let vcpkg = layout.engine_vcpkg_manifest();
    let contents = read(&vcpkg)?;
    rewrites.push(Rewrite {
        contents: json_version(&contents, version, b"  ", &vcpkg)?,
        path: vcpkg,
    });

    let package = layout.app_package_manifest();
    let contents = read(&package)?;
    rewrites.push(Rewrite {
        contents: json_version(&contents, version, b"\t", &package)?,
        path: package,
    });

    Ok(rewrites)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).fs_context("reading", path)
}

fn pattern_missing(file: &Path, what: &str) -> BuildError {
    VersionError::PatternNotFound {
        file: file.to_path_buf(),
        what: what.to_string(),
    }
    .into()
}

/// Replace the `VERSION X.Y.Z` inside the `project(...)` call only.
pub(super) fn cmake_project_version(contents: &str, version: VersionTriple) -> Option<String> {
    let pattern = Regex::new(r"(?i)\bproject\s*\([^)]*?\bVERSION\s+(\d+\.\d+\.\d+)").ok()?;
    let range = pattern.captures(contents)?.get(1)?.range();
    let mut updated = String::with_capacity(contents.len());
    updated.push_str(&contents[..range.start]);
    updated.push_str(&version.to_string());
    updated.push_str(&contents[range.end..]);
    Some(updated)
}

/// Replace the numeric `*_MAJOR/MINOR/PATCH` macros and the `*_STRING` macro.
pub(super) fn header_macros(contents: &str, version: VersionTriple, file: &Path) -> Result<String> {
    let numeric = [
        ("MAJOR", version.major),
        ("MINOR", version.minor),
        ("PATCH", version.patch),
    ];

    let mut updated = contents.to_string();
    for (suffix, value) in numeric {
        let name = format!("{VERSION_MACRO_PREFIX}_{suffix}");
        let pattern = macro_regex(&format!(r"(#define\s+{name}\s+)\d+"), file)?;
        if !pattern.is_match(&updated) {
            return Err(pattern_missing(file, &format!("#define {name}")));
        }
        updated = pattern
            .replace(&updated, format!("${{1}}{value}"))
            .into_owned();
    }

    let name = format!("{VERSION_MACRO_PREFIX}_STRING");
    let pattern = macro_regex(&format!(r#"(#define\s+{name}\s+)"[^"]*""#), file)?;
    if !pattern.is_match(&updated) {
        return Err(pattern_missing(file, &format!("#define {name}")));
    }
    Ok(pattern
        .replace(&updated, format!("${{1}}\"{version}\""))
        .into_owned())
}

fn macro_regex(pattern: &str, file: &Path) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        VersionError::Manifest {
            file: file.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Set the top-level `version` field, keeping key order, with the given indent
/// and a trailing newline.
pub(super) fn json_version(
    contents: &str,
    version: VersionTriple,
    indent: &[u8],
    file: &Path,
) -> Result<String> {
    let manifest_error = |reason: String| -> BuildError {
        VersionError::Manifest {
            file: file.to_path_buf(),
            reason,
        }
        .into()
    };

    let mut document: Value =
        serde_json::from_str(contents).map_err(|e| manifest_error(e.to_string()))?;
    let Some(object) = document.as_object_mut() else {
        return Err(manifest_error("top level is not a JSON object".to_string()));
    };
    object.insert("version".to_string(), Value::String(version.to_string()));

    let mut buffer = Vec::with_capacity(contents.len() + 16);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(indent));
    document.serialize(&mut serializer)?;
    buffer.push(b'\n');
    String::from_utf8(buffer).map_err(|e| manifest_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const V: VersionTriple = VersionTriple {
        major: 1,
        minor: 4,
        patch: 0,
    };

    #[test]
    fn cmake_rewrite_touches_project_call_only() {
        let contents = "cmake_minimum_required(VERSION 3.25.0)\nproject(vayu-engine\n    VERSION 1.3.9\n    LANGUAGES CXX)\nfind_package(fmt 10.2.1 REQUIRED)\n";
        let updated = cmake_project_version(contents, V).unwrap();
        assert!(updated.contains("cmake_minimum_required(VERSION 3.25.0)"));
        assert!(updated.contains("    VERSION 1.4.0\n"));
        assert!(updated.contains("fmt 10.2.1"));
    }

    #[test]
    fn cmake_without_project_version_is_none() {
        assert_eq!(
            cmake_project_version("cmake_minimum_required(VERSION 3.25.0)\nproject(x)\n", V),
            None
        );
    }

    #[test]
    fn header_macros_are_rewritten() {
        let contents = "#pragma once\n#define VAYU_VERSION_MAJOR 1\n#define VAYU_VERSION_MINOR 3\n#define VAYU_VERSION_PATCH 9\n#define VAYU_VERSION_STRING \"1.3.9\"\n";
        let updated = header_macros(contents, V, Path::new("version.hpp")).unwrap();
        assert_eq!(
            updated,
            "#pragma once\n#define VAYU_VERSION_MAJOR 1\n#define VAYU_VERSION_MINOR 4\n#define VAYU_VERSION_PATCH 0\n#define VAYU_VERSION_STRING \"1.4.0\"\n"
        );
    }

    #[test]
    fn header_without_macro_is_pattern_error() {
        let err = header_macros("#define VAYU_VERSION_MAJOR 1\n", V, Path::new("v.hpp")).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Version(VersionError::PatternNotFound { ref what, .. }) if what.contains("MINOR")
        ));
    }

    #[test]
    fn json_keeps_key_order_and_indent() {
        let contents = "{\n  \"name\": \"vayu-engine\",\n  \"version\": \"1.3.9\",\n  \"dependencies\": [\"fmt\"]\n}\n";
        let updated = json_version(contents, V, b"  ", Path::new("vcpkg.json")).unwrap();
        assert_eq!(
            updated,
            "{\n  \"name\": \"vayu-engine\",\n  \"version\": \"1.4.0\",\n  \"dependencies\": [\n    \"fmt\"\n  ]\n}\n"
        );

        let tabbed = json_version("{\"name\":\"vayu\",\"version\":\"1.3.9\"}", V, b"\t", Path::new("package.json")).unwrap();
        assert_eq!(tabbed, "{\n\t\"name\": \"vayu\",\n\t\"version\": \"1.4.0\"\n}\n");
    }

    #[test]
    fn json_array_document_is_rejected() {
        let err = json_version("[1, 2]", V, b"  ", Path::new("x.json")).unwrap_err();
        assert!(matches!(err, BuildError::Version(VersionError::Manifest { .. })));
    }
}
