//! Terminal presentation for the orchestrator.
//!
//! All user-facing text goes through [`OutputManager`]. Log records from the
//! `log` facade go to stderr separately and are controlled by `RUST_LOG`.

use crate::pipeline::Artifact;
use crate::platform::Platform;
use crate::runner::CommandFailure;
use crate::toolchain::ToolStatus;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Status glyphs.
pub mod glyph {
    /// Pointer used in artifact lists and version transitions
    pub const ARROW: &str = "→";
    /// Success mark
    pub const CHECK: &str = "✓";
    /// Failure mark
    pub const CROSS: &str = "✗";
    /// Informational mark
    pub const INFO: &str = "ℹ";
    /// Warning mark
    pub const WARN: &str = "⚠";
    /// Header mark
    pub const ROCKET: &str = "▲";
    /// Bullet
    pub const DOT: &str = "•";
    /// Spinner animation frames
    pub const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
}

/// Text styles used by the renderer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tone {
    /// Default terminal color
    Plain,
    /// Dimmed text
    Dim,
    /// Bold text
    Bold,
    /// Secondary text
    Gray,
    /// Commands and paths
    Cyan,
    /// Success
    Green,
    /// Hints
    Yellow,
    /// Failure
    Red,
    /// Mode name
    Magenta,
}

impl Tone {
    fn spec(self) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match self {
            Tone::Plain => {}
            Tone::Dim => {
                spec.set_dimmed(true);
            }
            Tone::Bold => {
                spec.set_bold(true);
            }
            Tone::Gray => {
                spec.set_fg(Some(Color::Ansi256(245)));
            }
            Tone::Cyan => {
                spec.set_fg(Some(Color::Cyan));
            }
            Tone::Green => {
                spec.set_fg(Some(Color::Green));
            }
            Tone::Yellow => {
                spec.set_fg(Some(Color::Yellow));
            }
            Tone::Red => {
                spec.set_fg(Some(Color::Red));
            }
            Tone::Magenta => {
                spec.set_fg(Some(Color::Magenta));
            }
        }
        spec
    }
}

#[derive(Clone, Debug)]
enum Sink {
    Stdout(ColorChoice),
    Memory(Arc<Mutex<Vec<u8>>>),
}

/// Colored terminal output for every stage.
#[derive(Clone, Debug)]
pub struct OutputManager {
    sink: Sink,
    verbose: bool,
}

impl OutputManager {
    /// Write to stdout with the given color choice.
    pub fn new(color: ColorChoice, verbose: bool) -> Self {
        Self {
            sink: Sink::Stdout(color),
            verbose,
        }
    }

    /// Write uncolored text into an in-memory buffer, readable via [`Self::captured`].
    pub fn in_memory(verbose: bool) -> Self {
        Self {
            sink: Sink::Memory(Arc::new(Mutex::new(Vec::new()))),
            verbose,
        }
    }

    /// Text written so far by an in-memory manager (empty for stdout).
    pub fn captured(&self) -> String {
        match &self.sink {
            Sink::Memory(bytes) => bytes
                .lock()
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default(),
            Sink::Stdout(_) => String::new(),
        }
    }

    /// Whether commands stream their output.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn buffer(&self) -> Buffer {
        match &self.sink {
            Sink::Stdout(choice) => BufferWriter::stdout(*choice).buffer(),
            Sink::Memory(_) => Buffer::no_color(),
        }
    }

    fn flush_buffer(&self, buffer: &Buffer) -> io::Result<()> {
        match &self.sink {
            Sink::Stdout(choice) => BufferWriter::stdout(*choice).print(buffer),
            Sink::Memory(bytes) => {
                let mut bytes = bytes
                    .lock()
                    .map_err(|_| io::Error::other("output buffer poisoned"))?;
                bytes.extend_from_slice(buffer.as_slice());
                Ok(())
            }
        }
    }

    fn paint(buffer: &mut Buffer, segments: &[(Tone, &str)]) -> io::Result<()> {
        for (tone, text) in segments {
            if *tone == Tone::Plain {
                write!(buffer, "{text}")?;
            } else {
                buffer.set_color(&tone.spec())?;
                write!(buffer, "{text}")?;
                buffer.reset()?;
            }
        }
        Ok(())
    }

    /// Write one line made of styled segments.
    pub fn emit(&self, segments: &[(Tone, &str)]) -> io::Result<()> {
        let mut buffer = self.buffer();
        Self::paint(&mut buffer, segments)?;
        writeln!(buffer)?;
        self.flush_buffer(&buffer)
    }

    /// Redraw the current line in place (no newline). The erase-to-end escape
    /// is only written when the sink renders color.
    pub fn redraw(&self, segments: &[(Tone, &str)]) -> io::Result<()> {
        let mut buffer = self.buffer();
        write!(buffer, "\r")?;
        Self::paint(&mut buffer, segments)?;
        if buffer.supports_color() {
            write!(buffer, "\x1b[K")?;
        }
        self.flush_buffer(&buffer)?;
        io::stdout().flush()
    }

    /// Empty line.
    pub fn blank(&self) -> io::Result<()> {
        self.emit(&[])
    }

    /// Tool banner.
    pub fn header(&self) -> io::Result<()> {
        self.blank()?;
        self.emit(&[(Tone::Bold, glyph::ROCKET), (Tone::Bold, " Vayu Build")])?;
        self.blank()
    }

    /// Boxed summary of the run configuration.
    pub fn build_info(
        &self,
        platform: Platform,
        mode: &str,
        components: &[&str],
        verbose: bool,
    ) -> io::Result<()> {
        const WIDTH: usize = 58;
        const VALUE_WIDTH: usize = 45;
        let rule = "─".repeat(WIDTH);
        let components = components.join(" + ");
        let verbose = if verbose { "Yes" } else { "No" };
        let info = platform.info();
        let rows: [(&str, &str, Tone); 4] = [
            ("Platform   ", &info.display_name, Tone::Plain),
            ("Mode       ", mode, Tone::Magenta),
            ("Components ", &components, Tone::Cyan),
            ("Verbose    ", verbose, Tone::Plain),
        ];

        self.emit(&[(Tone::Plain, "  "), (Tone::Dim, &format!("┌{rule}┐"))])?;
        for (label, value, tone) in rows {
            let pad = " ".repeat(VALUE_WIDTH.saturating_sub(value.chars().count()));
            self.emit(&[
                (Tone::Plain, "  "),
                (Tone::Dim, "│"),
                (Tone::Plain, "  "),
                (Tone::Gray, label),
                (Tone::Plain, " "),
                (tone, value),
                (Tone::Plain, &pad),
                (Tone::Dim, "│"),
            ])?;
        }
        self.emit(&[(Tone::Plain, "  "), (Tone::Dim, &format!("└{rule}┘"))])?;
        self.blank()
    }

    /// `[step/total] Title` header.
    pub fn step(&self, step: usize, total: usize, title: &str) -> io::Result<()> {
        self.blank()?;
        self.emit(&[(Tone::Plain, "  "), (Tone::Bold, &format!("[{step}/{total}] {title}"))])?;
        self.blank()
    }

    /// Success status line.
    pub fn success(&self, message: &str) -> io::Result<()> {
        self.emit(&[
            (Tone::Plain, "  "),
            (Tone::Green, glyph::CHECK),
            (Tone::Plain, " "),
            (Tone::Plain, message),
        ])
    }

    /// Failure status line.
    pub fn failure(&self, message: &str) -> io::Result<()> {
        self.emit(&[
            (Tone::Plain, "  "),
            (Tone::Red, &format!("{} {message}", glyph::CROSS)),
        ])
    }

    /// Dimmed detail line.
    pub fn dim(&self, message: &str) -> io::Result<()> {
        self.emit(&[(Tone::Dim, &format!("    {message}"))])
    }

    /// Hint line.
    pub fn info(&self, message: &str) -> io::Result<()> {
        self.emit(&[
            (Tone::Plain, "  "),
            (Tone::Yellow, &format!("{} {message}", glyph::INFO)),
        ])
    }

    /// Warning line.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        self.emit(&[
            (Tone::Plain, "  "),
            (Tone::Yellow, &format!("{} {message}", glyph::WARN)),
        ])
    }

    /// Fatal error line, surrounded by blank lines.
    pub fn error(&self, message: &str) -> io::Result<()> {
        self.blank()?;
        for (i, line) in message.lines().enumerate() {
            if i == 0 {
                self.failure(line)?;
            } else {
                self.emit(&[(Tone::Plain, "    "), (Tone::Red, line)])?;
            }
        }
        self.blank()
    }

    /// Echo of a command line in verbose mode.
    pub fn command_echo(&self, command: &str) -> io::Result<()> {
        self.dim(&format!("$ {command}"))
    }

    /// One row of the prerequisite table.
    pub fn tool_status(&self, status: &ToolStatus, show_info: bool) -> io::Result<()> {
        if status.available {
            self.success(&status.name)?;
            if show_info && !status.info.is_empty() {
                self.dim(&status.info)?;
            }
            Ok(())
        } else {
            self.emit(&[
                (Tone::Plain, "  "),
                (Tone::Red, glyph::CROSS),
                (Tone::Plain, " "),
                (Tone::Plain, &status.name),
                (Tone::Plain, " "),
                (Tone::Gray, "(missing)"),
            ])
        }
    }

    /// Titled list of bulleted hints.
    pub fn hints(&self, title: &str, lines: &[&str]) -> io::Result<()> {
        self.blank()?;
        self.info(title)?;
        for line in lines {
            self.emit(&[(Tone::Dim, &format!("  {} {line}", glyph::DOT))])?;
        }
        self.blank()
    }

    /// Output lines, highlighting those that look like errors.
    pub fn highlighted_lines<'a>(
        &self,
        lines: impl IntoIterator<Item = (bool, &'a str)>,
    ) -> io::Result<()> {
        for (is_error, line) in lines {
            let tone = if is_error { Tone::Red } else { Tone::Gray };
            self.emit(&[(Tone::Plain, "  "), (tone, line)])?;
        }
        Ok(())
    }

    /// Detailed report for a failed command.
    pub fn command_failure(&self, description: &str, failure: &CommandFailure) -> io::Result<()> {
        self.blank()?;
        self.failure(&format!("{description} failed"))?;
        self.blank()?;
        self.emit(&[(Tone::Plain, "  "), (Tone::Dim, "Command")])?;
        self.emit(&[(Tone::Plain, "  "), (Tone::Gray, &format!("$ {}", failure.command_line()))])?;
        self.blank()?;
        let exit = match failure.exit_code {
            Some(code) => format!("Exit code: {code}"),
            None => "Terminated by signal".to_string(),
        };
        self.emit(&[(Tone::Plain, "  "), (Tone::Dim, &exit)])?;

        if !self.verbose && !failure.tail.is_empty() {
            self.blank()?;
            self.emit(&[
                (Tone::Plain, "  "),
                (Tone::Dim, &format!("Output (last {} lines)", failure.tail.len())),
            ])?;
            self.blank()?;
            self.highlighted_lines(failure.tail.iter().map(|l| (l.is_error, l.text.as_str())))?;
            if failure.hidden_lines > 0 {
                self.blank()?;
                self.emit(&[
                    (Tone::Plain, "  "),
                    (Tone::Dim, &format!("... ({} more lines)", failure.hidden_lines)),
                ])?;
            }
        }

        self.blank()?;
        self.verbose_hint()
    }

    /// Invitation to re-run with `-v`.
    pub fn verbose_hint(&self) -> io::Result<()> {
        self.emit(&[
            (Tone::Plain, "  "),
            (Tone::Yellow, &format!("{} Run with ", glyph::INFO)),
            (Tone::Bold, "-v"),
            (Tone::Yellow, " for full output"),
        ])?;
        self.blank()
    }

    /// Final success block with elapsed time and artifacts.
    pub fn build_complete(
        &self,
        title: &str,
        elapsed: Duration,
        artifacts: &[Artifact],
    ) -> io::Result<()> {
        self.blank()?;
        self.emit(&[
            (Tone::Plain, "  "),
            (Tone::Green, &format!("{} {title}", glyph::CHECK)),
            (Tone::Plain, " "),
            (Tone::Dim, &format!("({}s)", elapsed.as_secs())),
        ])?;

        if !artifacts.is_empty() {
            self.blank()?;
            self.emit(&[(Tone::Plain, "  "), (Tone::Bold, "Artifacts")])?;
            self.blank()?;
            for artifact in artifacts {
                self.emit(&[
                    (Tone::Plain, "  "),
                    (Tone::Dim, glyph::ARROW),
                    (Tone::Plain, " "),
                    (Tone::Gray, &artifact.label),
                ])?;
                self.emit(&[(Tone::Plain, "    "), (Tone::Cyan, &artifact.path)])?;
            }
        }
        self.blank()
    }

    /// "Next Steps" block: pairs of description and command.
    pub fn next_steps(&self, steps: &[(String, Vec<String>)]) -> io::Result<()> {
        if steps.is_empty() {
            return Ok(());
        }
        self.emit(&[(Tone::Plain, "  "), (Tone::Bold, "Next Steps")])?;
        self.blank()?;
        for (description, commands) in steps {
            self.emit(&[(Tone::Plain, "  "), (Tone::Dim, description)])?;
            for command in commands {
                self.emit(&[(Tone::Plain, "  "), (Tone::Cyan, &format!("$ {command}"))])?;
            }
            self.blank()?;
        }
        Ok(())
    }

    /// `current → new` version transition.
    pub fn version_transition(&self, from: &str, to: &str) -> io::Result<()> {
        self.blank()?;
        self.emit(&[(Tone::Plain, "  "), (Tone::Bold, "Version Bump")])?;
        self.blank()?;
        self.emit(&[
            (Tone::Plain, "  "),
            (Tone::Cyan, from),
            (Tone::Plain, &format!(" {} ", glyph::ARROW)),
            (Tone::Green, to),
        ])?;
        self.blank()
    }
}
