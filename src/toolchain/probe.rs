//! Bounded subprocess queries used during discovery.
//!
//! Unlike build commands, discovery never waits indefinitely: every query has
//! a timeout and any failure simply means "not found here".

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Timeout for `--version` probes
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for package-manager and IDE locator queries
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `program args...` and return its trimmed stdout if it exits successfully in time.
pub async fn query(program: &Path, args: &[&str], timeout: Duration) -> Option<String> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            log::debug!("Failed to execute {}: {}", program.display(), e);
            return None;
        }
        Err(_) => {
            log::warn!(
                "{} {} timed out after {}s",
                program.display(),
                args.join(" "),
                timeout.as_secs()
            );
            return None;
        }
    };

    if !output.status.success() {
        log::debug!(
            "{} {} exited with {:?}: {}",
            program.display(),
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Execute `<path> --version` and return the first output line.
///
/// `None` means the tool exists on disk but cannot be run, which callers treat
/// the same as absence.
pub async fn version(path: &Path) -> Option<String> {
    let stdout = query(path, &["--version"], PROBE_TIMEOUT).await?;
    let first = stdout.lines().next().unwrap_or("").trim();
    if first.is_empty() {
        Some("installed".to_string())
    } else {
        Some(first.to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn version_uses_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "cmake", "echo 'cmake version 3.28.1'; echo; echo 'CMake suite'");
        assert_eq!(version(&tool).await.as_deref(), Some("cmake version 3.28.1"));
    }

    #[tokio::test]
    async fn silent_tool_is_installed() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "ninja", "exit 0");
        assert_eq!(version(&tool).await.as_deref(), Some("installed"));
    }

    #[tokio::test]
    async fn failing_probe_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "broken", "echo 'nope' >&2; exit 1");
        assert_eq!(version(&tool).await, None);
    }

    #[tokio::test]
    async fn non_executable_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain");
        std::fs::write(&path, "not a program").unwrap();
        assert_eq!(version(&path).await, None);
    }

    #[tokio::test]
    async fn slow_query_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "slow", "sleep 5");
        assert_eq!(query(&tool, &[], Duration::from_millis(200)).await, None);
    }
}
