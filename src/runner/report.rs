//! Failure reports for external commands.
//!
//! Captured output is kept in full on the [`CommandResult`](super::CommandResult);
//! the report only carries the tail that is shown to the user.

/// Number of trailing output lines shown for a failed command
pub const TAIL_LINES: usize = 25;

const ERROR_KEYWORDS: [&str; 3] = ["error", "failed", "fatal"];

/// One line of command output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputLine {
    /// Line text without the trailing newline
    pub text: String,
    /// Whether the line mentions an error keyword
    pub is_error: bool,
}

impl OutputLine {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_error: looks_like_error(text),
        }
    }
}

/// Whether a line contains `error`, `failed` or `fatal` in any case.
pub fn looks_like_error(line: &str) -> bool {
    let lower = line.to_lowercase();
    ERROR_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Split captured output into classified lines, ignoring surrounding blank space.
pub fn classify_lines(output: &str) -> Vec<OutputLine> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.lines().map(OutputLine::new).collect()
}

/// What the user sees when a command exits non-zero.
#[derive(Clone, Debug)]
pub struct CommandFailure {
    /// Full command line as executed
    pub argv: Vec<String>,
    /// Exit code, absent when terminated by a signal
    pub exit_code: Option<i32>,
    /// Last [`TAIL_LINES`] lines of captured output
    pub tail: Vec<OutputLine>,
    /// Lines omitted before the tail
    pub hidden_lines: usize,
}

impl CommandFailure {
    /// Build a report from the full captured output.
    pub fn new(argv: Vec<String>, exit_code: Option<i32>, output: &str) -> Self {
        let mut lines = classify_lines(output);
        let hidden_lines = lines.len().saturating_sub(TAIL_LINES);
        let tail = lines.split_off(hidden_lines);
        Self {
            argv,
            exit_code,
            tail,
            hidden_lines,
        }
    }

    /// Command line joined with spaces.
    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}
