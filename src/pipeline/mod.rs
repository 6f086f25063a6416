//! Staged build pipeline.
//!
//! [`Pipeline`] walks `Idle -> CheckingPrerequisites -> BuildingEngine ->
//! BuildingApp -> CollectingArtifacts -> Done`, skipping the stages the
//! context excludes. The first error moves it to `Failed` and nothing after
//! it runs.

mod app;
mod artifacts;
mod engine;
mod test_only;

pub use artifacts::{collect_artifacts, display_path, next_steps};
pub use test_only::{run_tests_only, tests_passed_line};

use crate::error::{CliError, Result};
use crate::output::OutputManager;
use crate::platform::Platform;
use crate::project::ProjectLayout;
use crate::runner::CommandRunner;
use crate::toolchain::{Tool, Toolchain, ToolchainLocator};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Pipeline position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PipelineState {
    /// Nothing has run yet
    Idle,
    /// Locating and probing required tools
    CheckingPrerequisites,
    /// Configuring, building and optionally testing the engine
    BuildingEngine,
    /// Installing, compiling and packaging the app
    BuildingApp,
    /// Gathering produced files
    CollectingArtifacts,
    /// Finished successfully
    Done,
    /// Stopped on an error
    Failed,
}

/// A file the run produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Artifact {
    /// Kind shown to the user ("Engine", "AppImage", ...)
    pub label: String,
    /// Path, relative to the working directory when possible
    pub path: String,
}

/// Result of a successful pipeline run.
#[derive(Clone, Debug)]
pub struct BuildReport {
    /// Produced files, engine first
    pub artifacts: Vec<Artifact>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Every state entered, in order
    pub history: Vec<PipelineState>,
}

/// Options for one build run. Read-only once the pipeline starts.
#[derive(Clone, Debug)]
pub struct BuildContext {
    /// Host platform
    pub platform: Platform,
    /// Checkout root
    pub project_root: PathBuf,
    /// CMake preset, e.g. `linux-prod`
    pub preset: String,
    /// Debug build and dev app instead of release and installers
    pub development_mode: bool,
    /// Stream command output instead of capturing it
    pub verbose: bool,
    /// Build the app only
    pub skip_engine: bool,
    /// Build the engine only
    pub skip_app: bool,
    /// Build and run the engine unit tests
    pub run_tests: bool,
    /// Delete the engine build directory first
    pub clean: bool,
}

impl BuildContext {
    /// Context for a full build with every option off.
    pub fn new(platform: Platform, project_root: impl Into<PathBuf>, development_mode: bool) -> Self {
        Self {
            platform,
            project_root: project_root.into(),
            preset: platform.preset(development_mode),
            development_mode,
            verbose: false,
            skip_engine: false,
            skip_app: false,
            run_tests: false,
            clean: false,
        }
    }

    /// Project paths for this run.
    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.project_root)
    }

    /// "Development" or "Production".
    pub fn mode_name(&self) -> &'static str {
        if self.development_mode {
            "Development"
        } else {
            "Production"
        }
    }

    /// Components being built, for the summary table.
    pub fn components(&self) -> Vec<&'static str> {
        let mut components = Vec::new();
        if !self.skip_engine {
            components.push("Engine");
        }
        if !self.skip_app {
            components.push("App");
        }
        components
    }

    /// Number of numbered steps: prerequisites plus each built component.
    pub fn total_steps(&self) -> usize {
        1 + usize::from(!self.skip_engine) + usize::from(!self.skip_app)
    }

    /// Tools the run cannot do without.
    pub fn required_tools(&self) -> Vec<Tool> {
        Tool::required(!self.skip_engine, !self.skip_app)
    }
}

/// Drives one build run.
pub struct Pipeline {
    context: BuildContext,
    layout: ProjectLayout,
    output: OutputManager,
    locator: ToolchainLocator,
    cwd: PathBuf,
    state: PipelineState,
    history: Vec<PipelineState>,
    step: usize,
}

impl Pipeline {
    /// Create an idle pipeline.
    pub fn new(context: BuildContext, output: OutputManager, locator: ToolchainLocator) -> Self {
        Self {
            layout: context.layout(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            context,
            output,
            locator,
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
            step: 0,
        }
    }

    /// Working directory artifact paths are shown relative to.
    pub fn with_display_root(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// States entered so far, starting with `Idle`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn transition(&mut self, next: PipelineState) {
        log::debug!("Pipeline: {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    fn next_step(&mut self, title: &str) -> Result<()> {
        self.step += 1;
        self.output
            .step(self.step, self.context.total_steps(), title)?;
        Ok(())
    }

    /// Run every stage the context asks for.
    pub async fn run(&mut self) -> Result<BuildReport> {
        let started = Instant::now();
        match self.execute().await {
            Ok(artifacts) => {
                self.transition(PipelineState::Done);
                Ok(BuildReport {
                    artifacts,
                    elapsed: started.elapsed(),
                    history: self.history.clone(),
                })
            }
            Err(e) => {
                self.transition(PipelineState::Failed);
                log::debug!("Pipeline failed: {}", e);
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> Result<Vec<Artifact>> {
        self.preflight()?;

        let context = self.context.clone();
        self.output.build_info(
            context.platform,
            context.mode_name(),
            &context.components(),
            context.verbose,
        )?;

        self.transition(PipelineState::CheckingPrerequisites);
        self.next_step("Prerequisites")?;
        let toolchain = self.check_prerequisites().await?;
        let runner = runner_for(&toolchain, context.verbose, &self.output);

        let engine_binary = if context.skip_engine {
            self.existing_engine_binary()?
        } else {
            self.transition(PipelineState::BuildingEngine);
            self.next_step("Engine")?;
            let binary = engine::build(&context, &self.layout, &toolchain, &runner).await?;
            Some(binary)
        };

        if !context.skip_app {
            self.transition(PipelineState::BuildingApp);
            self.next_step("Application")?;
            app::build(&context, &self.layout, &runner, engine_binary.as_deref()).await?;
        }

        self.transition(PipelineState::CollectingArtifacts);
        let produced = if context.skip_engine {
            None
        } else {
            engine_binary.as_deref()
        };
        Ok(collect_artifacts(&context, &self.layout, produced, &self.cwd))
    }

    /// Directory checks that must pass before any subprocess is started.
    fn preflight(&self) -> Result<()> {
        if !self.context.skip_engine {
            require_dir("Engine", &self.layout.engine_dir())?;
        }
        if !self.context.skip_app {
            require_dir("App", &self.layout.app_dir())?;
        }
        Ok(())
    }

    async fn check_prerequisites(&mut self) -> Result<Toolchain> {
        let prerequisites = self.locator.check(&self.context.required_tools()).await;
        for status in prerequisites.statuses() {
            self.output.tool_status(status, true)?;
        }

        if !prerequisites.all_available() {
            let (title, lines) = remediation_hints(self.context.platform);
            self.output.hints(title, lines)?;
        }

        let toolchain = prerequisites.into_toolchain(self.context.platform)?;
        log::debug!("Toolchain: {:?}", toolchain);
        Ok(toolchain)
    }

    fn existing_engine_binary(&self) -> Result<Option<PathBuf>> {
        let binary = self
            .layout
            .engine_binary(self.context.platform, self.context.development_mode);
        if binary.is_file() {
            self.output.blank()?;
            self.output.success("Using existing engine binary")?;
            log::info!("Reusing engine binary at {}", binary.display());
            Ok(Some(binary))
        } else {
            log::debug!("No existing engine binary at {}", binary.display());
            Ok(None)
        }
    }
}

fn require_dir(what: &str, path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    Err(CliError::MissingDirectory {
        what: what.to_string(),
        path: path.to_path_buf(),
    }
    .into())
}

fn runner_for(toolchain: &Toolchain, verbose: bool, output: &OutputManager) -> CommandRunner {
    let mut runner = CommandRunner::new(verbose, output.clone());
    for (program, path) in toolchain.command_rewrites() {
        runner = runner.with_rewrite(program, path);
    }
    for (key, value) in toolchain.child_env() {
        runner = runner.with_env(key, value);
    }
    runner
}

/// Remediation hints printed under an incomplete prerequisite table.
pub fn remediation_hints(platform: Platform) -> (&'static str, &'static [&'static str]) {
    match platform {
        Platform::Windows => (
            "Tips for Windows:",
            &[
                "Run from \"Developer Command Prompt for VS\" to use bundled tools",
                "Or install standalone: CMake, Ninja, vcpkg",
                "Set VCPKG_ROOT environment variable if vcpkg is installed",
            ],
        ),
        Platform::Linux | Platform::MacOs => (
            "Install the missing tools:",
            &[
                "Install CMake and Ninja with your system package manager",
                "Install pnpm with: npm install -g pnpm",
                "Set VCPKG_ROOT environment variable if vcpkg is installed",
            ],
        ),
    }
}

/// Files in `dir` with the given extension, sorted by name.
pub(crate) fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let Some(dir_str) = dir.to_str() else {
        log::warn!("Skipping non UTF-8 directory {}", dir.display());
        return Vec::new();
    };
    let pattern = format!("{}/*.{}", glob::Pattern::escape(dir_str), extension);
    match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(|entry| entry.ok()).filter(|p| p.is_file()).collect(),
        Err(e) => {
            log::warn!("Invalid glob pattern {}: {}", pattern, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;

    fn context(root: &Path) -> BuildContext {
        BuildContext::new(Platform::Linux, root, false)
    }

    #[test]
    fn context_counts_steps_and_components() {
        let mut ctx = context(Path::new("/work"));
        assert_eq!(ctx.preset, "linux-prod");
        assert_eq!(ctx.total_steps(), 3);
        assert_eq!(ctx.components(), ["Engine", "App"]);

        ctx.skip_app = true;
        assert_eq!(ctx.total_steps(), 2);
        assert_eq!(ctx.components(), ["Engine"]);
        assert_eq!(ctx.required_tools(), [Tool::CMake, Tool::Ninja, Tool::Vcpkg]);
    }

    #[tokio::test]
    async fn missing_app_dir_fails_before_prerequisites() {
        let root = tempfile::tempdir().unwrap();
        let mut ctx = context(root.path());
        ctx.skip_engine = true;

        let output = OutputManager::in_memory(false);
        let mut pipeline = Pipeline::new(
            ctx,
            output.clone(),
            ToolchainLocator::isolated(Platform::Linux),
        );
        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(
            err,
            BuildError::Cli(CliError::MissingDirectory { ref what, .. }) if what == "App"
        ));
        assert_eq!(pipeline.history(), [PipelineState::Idle, PipelineState::Failed]);
        assert!(!output.captured().contains("Prerequisites"));
    }

    #[tokio::test]
    async fn missing_tools_stop_at_prerequisites() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("engine")).unwrap();
        let mut ctx = context(root.path());
        ctx.skip_app = true;

        let output = OutputManager::in_memory(false);
        let mut pipeline = Pipeline::new(
            ctx,
            output.clone(),
            ToolchainLocator::isolated(Platform::Linux),
        );
        let err = pipeline.run().await.unwrap_err();

        match err {
            BuildError::PrerequisitesMissing { missing } => {
                assert_eq!(missing, ["CMake", "Ninja", "vcpkg"])
            }
            other => panic!("expected PrerequisitesMissing, got {other:?}"),
        }
        assert_eq!(
            pipeline.history(),
            [
                PipelineState::Idle,
                PipelineState::CheckingPrerequisites,
                PipelineState::Failed
            ]
        );
        let text = output.captured();
        assert!(text.contains("[1/2] Prerequisites"));
        assert!(text.contains("✗ CMake (missing)"));
        assert!(text.contains("Install the missing tools:"));
    }

    #[test]
    fn windows_hints_mention_developer_prompt() {
        let (title, lines) = remediation_hints(Platform::Windows);
        assert_eq!(title, "Tips for Windows:");
        assert!(lines[0].contains("Developer Command Prompt"));
    }

    #[test]
    fn files_with_extension_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.deb", "a.deb", "c.AppImage", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let debs = files_with_extension(dir.path(), "deb");
        assert_eq!(debs, [dir.path().join("a.deb"), dir.path().join("b.deb")]);
    }
}
