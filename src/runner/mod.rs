//! External command execution.
//!
//! [`CommandRunner`] is the only place that spawns build commands. In verbose
//! mode the child inherits the terminal; otherwise stdout and stderr are
//! captured, merged in arrival order and shown only on failure.

mod report;

pub use report::{CommandFailure, OutputLine, TAIL_LINES, classify_lines, looks_like_error};

use crate::error::{BuildError, CliError, Result};
use crate::output::OutputManager;
use crate::progress;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Outcome of one external command.
#[derive(Clone, Debug)]
pub struct CommandResult {
    /// Command line as executed, after path rewrites
    pub argv: Vec<String>,
    /// Whether the command exited with status 0
    pub succeeded: bool,
    /// Combined stdout and stderr; empty in verbose mode
    pub output: String,
    /// Exit code, absent when terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandResult {
    /// Failure report, or `None` if the command succeeded.
    pub fn failure(&self) -> Option<CommandFailure> {
        if self.succeeded {
            return None;
        }
        Some(CommandFailure::new(
            self.argv.clone(),
            self.exit_code,
            &self.output,
        ))
    }
}

/// Spawns external commands with the run's verbosity and environment.
#[derive(Clone, Debug)]
pub struct CommandRunner {
    verbose: bool,
    output: OutputManager,
    rewrites: HashMap<String, PathBuf>,
    env: Vec<(String, OsString)>,
}

impl CommandRunner {
    /// Create a runner. `verbose` selects streamed mode for the whole run.
    pub fn new(verbose: bool, output: OutputManager) -> Self {
        Self {
            verbose,
            output,
            rewrites: HashMap::new(),
            env: Vec::new(),
        }
    }

    /// Replace a bare program name with a resolved path before execution.
    pub fn with_rewrite(mut self, program: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.rewrites.insert(program.into(), path.into());
        self
    }

    /// Set an environment variable for every spawned command.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Whether commands stream their output.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Output manager used for echoes and failure reports.
    pub fn output(&self) -> &OutputManager {
        &self.output
    }

    /// Apply program rewrites to an argv.
    pub fn resolve_argv(&self, argv: &[String]) -> Vec<String> {
        let mut resolved = argv.to_vec();
        if let Some(first) = resolved.first_mut() {
            if let Some(path) = self.rewrites.get(first.as_str()) {
                log::debug!("Rewriting {} to {}", first, path.display());
                *first = path.to_string_lossy().into_owned();
            }
        }
        resolved
    }

    /// Run a command to completion.
    ///
    /// A non-zero exit is reported through [`CommandResult::succeeded`]; only
    /// spawn failures are errors, with a missing executable mapped to
    /// [`BuildError::CommandNotFound`].
    pub async fn run(&self, argv: &[String], cwd: &Path, description: &str) -> Result<CommandResult> {
        let argv = self.resolve_argv(argv);
        let Some(program) = argv.first() else {
            return Err(CliError::InvalidArguments {
                reason: format!("{description}: empty command"),
            }
            .into());
        };

        log::debug!(
            "{}: {} (in {})",
            description,
            argv.join(" "),
            cwd.display()
        );

        let mut command = Command::new(program);
        command.args(&argv[1..]).current_dir(cwd);
        for (key, value) in &self.env {
            command.env(key, value);
        }

        if self.verbose {
            self.output.command_echo(&argv.join(" "))?;
            let status = command
                .status()
                .await
                .map_err(|e| spawn_error(program, e))?;
            return Ok(CommandResult {
                succeeded: status.success(),
                output: String::new(),
                exit_code: status.code(),
                argv,
            });
        }

        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn().map_err(|e| spawn_error(program, e))?;

        // Both readers feed one channel so lines keep their arrival order
        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx.clone());
        }
        drop(tx);

        let mut output = String::new();
        while let Some(line) = rx.recv().await {
            output.push_str(&line);
            output.push('\n');
        }

        let status = child.wait().await?;
        log::debug!("{} exited with {:?}", description, status.code());

        Ok(CommandResult {
            succeeded: status.success(),
            output,
            exit_code: status.code(),
            argv,
        })
    }

    /// Print the failure report for an unsuccessful result and turn it into an error.
    pub fn ensure_success(&self, description: &str, result: CommandResult) -> Result<CommandResult> {
        let Some(failure) = result.failure() else {
            return Ok(result);
        };
        self.output.command_failure(description, &failure)?;
        Err(BuildError::CommandFailed {
            description: description.to_string(),
            command: failure.command_line(),
            exit_code: failure.exit_code,
        })
    }

    /// Run one pipeline step: spinner in captured mode, failure report on error.
    pub async fn step(
        &self,
        message: &str,
        argv: &[String],
        cwd: &Path,
        description: &str,
    ) -> Result<CommandResult> {
        let result = progress::track(
            &self.output,
            !self.verbose,
            message,
            self.run(argv, cwd, description),
        )
        .await?;
        self.ensure_success(description, result)
    }
}

fn spawn_error(program: &str, error: io::Error) -> BuildError {
    if error.kind() == io::ErrorKind::NotFound {
        BuildError::CommandNotFound {
            program: program.to_string(),
        }
    } else {
        BuildError::Fs {
            action: "starting command".to_string(),
            path: PathBuf::from(program),
            source: error,
        }
    }
}

fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("Stopped reading command output: {}", e);
                    break;
                }
            }
        }
    });
}

/// Convert a path to an argv element.
pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn runner(verbose: bool) -> CommandRunner {
        CommandRunner::new(verbose, OutputManager::in_memory(verbose))
    }

    #[test]
    fn rewrite_replaces_bare_program_only() {
        let runner = runner(false).with_rewrite("pnpm", "C:/Users/me/AppData/Roaming/npm/pnpm.cmd");
        assert_eq!(
            runner.resolve_argv(&argv(&["pnpm", "install"])),
            argv(&["C:/Users/me/AppData/Roaming/npm/pnpm.cmd", "install"])
        );
        assert_eq!(
            runner.resolve_argv(&argv(&["cmake", "pnpm"])),
            argv(&["cmake", "pnpm"])
        );
    }

    #[tokio::test]
    async fn missing_executable_is_not_found() {
        let err = runner(false)
            .run(
                &argv(&["vayu-definitely-not-a-real-program"]),
                Path::new("."),
                "Probe",
            )
            .await
            .unwrap_err();
        match err {
            BuildError::CommandNotFound { program } => {
                assert_eq!(program, "vayu-definitely-not-a-real-program")
            }
            other => panic!("expected CommandNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_argv_is_rejected() {
        let err = runner(false).run(&[], Path::new("."), "Nothing").await.unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_a_failed_result() {
        let result = runner(false)
            .run(&argv(&["false"]), Path::new("."), "False")
            .await
            .unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, Some(1));
        assert!(result.failure().is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captured_mode_merges_both_streams() {
        let result = runner(false)
            .run(
                &argv(&["sh", "-c", "echo out; echo err >&2; exit 3"]),
                Path::new("."),
                "Script",
            )
            .await
            .unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.output.contains("out\n"));
        assert!(result.output.contains("err\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streamed_mode_captures_nothing() {
        let runner = runner(true);
        let result = runner
            .run(&argv(&["sh", "-c", "echo streamed"]), Path::new("."), "Echo")
            .await
            .unwrap();
        assert!(result.succeeded);
        assert!(result.output.is_empty());
        assert!(runner.output().captured().contains("$ sh -c echo streamed"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn extra_environment_reaches_children() {
        let result = runner(false)
            .with_env("VCPKG_ROOT", "/opt/vcpkg")
            .run(
                &argv(&["sh", "-c", "echo $VCPKG_ROOT"]),
                Path::new("."),
                "Env",
            )
            .await
            .unwrap();
        assert_eq!(result.output.trim(), "/opt/vcpkg");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn step_reports_failure_and_errors() {
        let runner = runner(false);
        let err = runner
            .step(
                "Building",
                &argv(&["sh", "-c", "echo 'error: nope'; exit 2"]),
                Path::new("."),
                "Build",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::CommandFailed {
                exit_code: Some(2),
                ..
            }
        ));
        let text = runner.output().captured();
        assert!(text.contains("✗ Building"));
        assert!(text.contains("✗ Build failed"));
        assert!(text.contains("error: nope"));
    }
}
