//! Centralized shell output.
//!
//! All user-facing CLI output goes through [`Shell`]:
//! - Status messages right-aligned to 12 columns, coloured on a terminal
//! - A spinner while a captured external step runs
//! - Raw passthrough of external tool output
//!
//! Internal diagnostics use `tracing` instead.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only, no spinners
    Quiet,
    /// Status messages and spinners
    #[default]
    Normal,
    /// Status messages, tool output echo, no spinners
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors when stderr is a terminal.
    #[default]
    Auto,
    /// Never use ANSI colors.
    Never,
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success (green)
    Added,
    Created,
    Finished,
    Removed,
    Installed,

    // In progress (cyan)
    Installing,
    Uninstalling,
    Configuring,
    Building,
    Running,
    Resolving,

    // Info (blue)
    Info,
    Fresh,

    // Warning (yellow)
    Warning,

    // Error (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Added => "Added",
            Status::Created => "Created",
            Status::Finished => "Finished",
            Status::Removed => "Removed",
            Status::Installed => "Installed",
            Status::Installing => "Installing",
            Status::Uninstalling => "Uninstalling",
            Status::Configuring => "Configuring",
            Status::Building => "Building",
            Status::Running => "Running",
            Status::Resolving => "Resolving",
            Status::Info => "Info",
            Status::Fresh => "Fresh",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Added
            | Status::Created
            | Status::Finished
            | Status::Removed
            | Status::Installed => "\x1b[1;32m",
            Status::Installing
            | Status::Uninstalling
            | Status::Configuring
            | Status::Building
            | Status::Running
            | Status::Resolving => "\x1b[1;36m",
            Status::Info | Status::Fresh => "\x1b[1;34m",
            Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
    interactive: bool,
}

impl Shell {
    /// Create a new shell.
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let interactive = io::stderr().is_terminal();
        let use_color = match color {
            ColorChoice::Auto => interactive,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
            interactive,
        }
    }

    /// Create a shell from the global CLI flags.
    pub fn from_flags(quiet: bool, verbose: bool, no_color: bool) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        let color = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Shell::new(verbosity, color)
    }

    /// A shell that prints nothing but errors, for tests and embedding.
    pub fn quiet() -> Self {
        Shell::new(Verbosity::Quiet, ColorChoice::Never)
    }

    /// Check if shell is in quiet mode.
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print a status message: `{status:>12} {message}`.
    ///
    /// In quiet mode only `Status::Error` is printed.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status != Status::Error {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error line, `{prefix}: {msg}`. Shown even in quiet mode.
    pub fn error(&self, prefix: &str, msg: impl Display) {
        eprintln!("{}", self.format_error(prefix, msg));
    }

    /// Print external tool output exactly as the tool produced it.
    pub fn tool_output(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        if text.ends_with('\n') {
            eprint!("{}", text);
        } else {
            eprintln!("{}", text);
        }
    }

    /// Echo tool output only in verbose mode.
    pub fn verbose_output(&self, text: &str) {
        if self.is_verbose() {
            self.tool_output(text);
        }
    }

    /// Start a spinner for a long-running captured step.
    ///
    /// Without a terminal, or in quiet/verbose mode, this prints the plain
    /// status line instead (or nothing when quiet).
    pub fn spinner(&self, status: Status, msg: impl Display) -> Spinner {
        let msg = msg.to_string();
        if self.verbosity != Verbosity::Normal || !self.interactive {
            self.status(status, &msg);
            return Spinner { pb: None };
        }

        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{prefix} {msg} {spinner:.cyan}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_prefix(self.format_status(status));
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(100));
        Spinner { pb: Some(pb) }
    }

    fn format_error(&self, prefix: &str, msg: impl Display) -> String {
        if self.use_color {
            format!("{}{}\x1b[0m: {}", Status::Error.color_code(), prefix, msg)
        } else {
            format!("{}: {}", prefix, msg)
        }
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// A spinner that disappears when the step finishes.
pub struct Spinner {
    pb: Option<ProgressBar>,
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
    }
}
