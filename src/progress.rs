//! Progress indicator for long-running commands.
//!
//! A [`Spinner`] redraws one status line on a tokio task until it is stopped.
//! It is only used when command output is captured: in verbose mode the child
//! process owns the terminal and the spinner stays disabled.

use crate::error::Result;
use crate::output::{OutputManager, Tone, glyph};
use crate::runner::CommandResult;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Redraw cadence
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Final glyph drawn when a spinner stops.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Green check
    Success,
    /// Red cross
    Failure,
}

/// Values whose success decides the spinner's final glyph.
pub trait Reportable {
    /// Whether the tracked operation succeeded.
    fn is_success(&self) -> bool;
}

impl Reportable for () {
    fn is_success(&self) -> bool {
        true
    }
}

impl Reportable for CommandResult {
    fn is_success(&self) -> bool {
        self.succeeded
    }
}

enum SpinnerState {
    Stopped,
    Running {
        stop: oneshot::Sender<()>,
        handle: JoinHandle<()>,
    },
}

/// Animated single-line status indicator.
pub struct Spinner {
    message: String,
    output: OutputManager,
    enabled: bool,
    state: SpinnerState,
}

impl Spinner {
    /// Create a stopped spinner. A disabled spinner never draws anything.
    pub fn new(message: impl Into<String>, output: OutputManager, enabled: bool) -> Self {
        Self {
            message: message.into(),
            output,
            enabled,
            state: SpinnerState::Stopped,
        }
    }

    /// Whether the redraw task is active.
    pub fn is_running(&self) -> bool {
        matches!(self.state, SpinnerState::Running { .. })
    }

    /// Start redrawing. No-op when disabled or already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if !self.enabled || self.is_running() {
            return;
        }

        let (stop, mut stopped) = oneshot::channel();
        let output = self.output.clone();
        let message = self.message.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FRAME_INTERVAL);
            let mut frame = 0;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        let _ = output.redraw(&[
                            (Tone::Plain, "  "),
                            (Tone::Cyan, glyph::SPINNER[frame]),
                            (Tone::Plain, " "),
                            (Tone::Plain, &message),
                        ]);
                        frame = (frame + 1) % glyph::SPINNER.len();
                    }
                }
            }
        });

        self.state = SpinnerState::Running { stop, handle };
    }

    /// Stop redrawing and draw the final glyph. No-op when not running.
    pub async fn stop(&mut self, outcome: Outcome) -> io::Result<()> {
        let SpinnerState::Running { stop, handle } =
            std::mem::replace(&mut self.state, SpinnerState::Stopped)
        else {
            return Ok(());
        };

        let _ = stop.send(());
        if let Err(e) = handle.await {
            log::debug!("Spinner task ended abnormally: {}", e);
        }
        self.draw_final(outcome)
    }

    fn draw_final(&self, outcome: Outcome) -> io::Result<()> {
        let (tone, mark) = match outcome {
            Outcome::Success => (Tone::Green, glyph::CHECK),
            Outcome::Failure => (Tone::Red, glyph::CROSS),
        };
        self.output.redraw(&[
            (Tone::Plain, "  "),
            (tone, mark),
            (Tone::Plain, " "),
            (Tone::Plain, &self.message),
        ])?;
        self.output.blank()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let SpinnerState::Running { handle, .. } =
            std::mem::replace(&mut self.state, SpinnerState::Stopped)
        {
            handle.abort();
            let _ = self.draw_final(Outcome::Failure);
        }
    }
}

/// Run one operation under a spinner, stopping it on every exit path.
pub async fn track<T, F>(output: &OutputManager, enabled: bool, message: &str, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
    T: Reportable,
{
    let mut spinner = Spinner::new(message, output.clone(), enabled);
    spinner.start();
    let result = operation.await;
    let outcome = match &result {
        Ok(value) if value.is_success() => Outcome::Success,
        _ => Outcome::Failure,
    };
    spinner.stop(outcome).await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;

    #[tokio::test]
    async fn spinner_animates_then_draws_final_glyph() {
        let output = OutputManager::in_memory(false);
        let mut spinner = Spinner::new("Configuring CMake", output.clone(), true);

        spinner.start();
        assert!(spinner.is_running());
        tokio::time::sleep(FRAME_INTERVAL * 3).await;
        spinner.stop(Outcome::Success).await.unwrap();
        assert!(!spinner.is_running());

        let text = output.captured();
        assert!(text.contains(glyph::SPINNER[0]));
        assert!(text.ends_with("  ✓ Configuring CMake\n"));
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let output = OutputManager::in_memory(false);
        let mut spinner = Spinner::new("Building", output.clone(), true);

        // Stop before start draws nothing
        spinner.stop(Outcome::Success).await.unwrap();
        assert!(output.captured().is_empty());

        spinner.start();
        spinner.start();
        spinner.stop(Outcome::Failure).await.unwrap();
        let after_first_stop = output.captured();
        assert!(after_first_stop.contains("✗ Building"));

        spinner.stop(Outcome::Success).await.unwrap();
        assert_eq!(output.captured(), after_first_stop);
    }

    #[tokio::test]
    async fn disabled_spinner_never_draws() {
        let output = OutputManager::in_memory(true);
        let mut spinner = Spinner::new("Building", output.clone(), false);
        spinner.start();
        assert!(!spinner.is_running());
        spinner.stop(Outcome::Success).await.unwrap();
        assert!(output.captured().is_empty());
    }

    #[tokio::test]
    async fn dropping_running_spinner_terminates_line() {
        let output = OutputManager::in_memory(false);
        {
            let mut spinner = Spinner::new("Packaging", output.clone(), true);
            spinner.start();
        }
        assert!(output.captured().ends_with("✗ Packaging\n"));
    }

    #[tokio::test]
    async fn track_marks_errors_as_failures() {
        let output = OutputManager::in_memory(false);
        let result: Result<()> = track(&output, true, "Cleaning", async {
            Err(BuildError::Interrupted)
        })
        .await;
        assert!(result.is_err());
        assert!(output.captured().contains("✗ Cleaning"));

        let output = OutputManager::in_memory(false);
        track(&output, true, "Copying", async { Ok(()) }).await.unwrap();
        assert!(output.captured().contains("✓ Copying"));
    }
}
