//! Test utilities and mocks for relay unit tests.
//!
//! The main piece is [`MockRunner`], a scripted [`CommandRunner`]: each
//! expectation matches commands by pattern, returns a canned
//! [`ToolOutput`] and can create files as a side effect (a configure step
//! writing `CMakeCache.txt`, a build producing the binary, a provider
//! install producing port metadata).
//!
//! # Example
//!
//! ```rust,ignore
//! let runner = MockRunner::new();
//! runner.expect(
//!     Expectation::new(CommandPattern::Contains("vcpkg install".into()), ToolOutput::success(""))
//!         .times(1),
//! );
//! // drive the code under test, then
//! assert_eq!(runner.count_matching("vcpkg install"), 1);
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::util::process::{CommandRunner, ProcessBuilder, ToolOutput};

pub use fixtures::*;

/// Pattern for matching commands in MockRunner.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on the full command line.
    Exact(String),
    /// Match if the command line starts with the prefix.
    StartsWith(String),
    /// Match if the command line contains the substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command line.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// One scripted response.
#[derive(Debug, Clone)]
pub struct Expectation {
    pattern: CommandPattern,
    output: ToolOutput,
    times: Option<usize>,
    used: usize,
    creates: Vec<(PathBuf, String)>,
    spawn_error: bool,
}

impl Expectation {
    pub fn new(pattern: CommandPattern, output: ToolOutput) -> Self {
        Expectation {
            pattern,
            output,
            times: None,
            used: 0,
            creates: Vec::new(),
            spawn_error: false,
        }
    }

    /// Commands matching `pattern` fail to start, as if the program were missing.
    pub fn spawn_failure(pattern: CommandPattern) -> Self {
        let mut exp = Expectation::new(pattern, ToolOutput::default());
        exp.spawn_error = true;
        exp
    }

    /// Limit how many times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Write `contents` to `path` whenever this expectation is used.
    pub fn creates(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.creates
            .push((path.as_ref().to_path_buf(), contents.into()));
        self
    }

    fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<Expectation>,
    calls: Vec<String>,
}

/// Scripted command runner.
///
/// Expectations are tried in insertion order; the first available match
/// wins. Unmatched commands are recorded and exit with code 127.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<MockState>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Add an expectation.
    pub fn expect(&self, expectation: Expectation) -> &Self {
        self.lock().expectations.push(expectation);
        self
    }

    /// Shorthand: every command containing `needle` succeeds.
    pub fn succeed(&self, needle: &str) -> &Self {
        self.expect(Expectation::new(
            CommandPattern::Contains(needle.to_string()),
            ToolOutput::success(""),
        ))
    }

    /// Shorthand: every command containing `needle` fails with `stderr`.
    pub fn fail(&self, needle: &str, stderr: &str) -> &Self {
        self.expect(Expectation::new(
            CommandPattern::Contains(needle.to_string()),
            ToolOutput::failure(1, stderr),
        ))
    }

    /// All command lines run so far.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of recorded command lines containing `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    /// Forget recorded calls, keeping expectations.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ToolOutput> {
        let line = cmd.display_command();
        let mut state = self.lock();
        state.calls.push(line.clone());

        let Some(exp) = state
            .expectations
            .iter_mut()
            .find(|e| e.available() && e.pattern.matches(&line))
        else {
            return Ok(ToolOutput::failure(127, format!("unexpected command: {line}")));
        };
        exp.used += 1;

        if exp.spawn_error {
            bail!("failed to spawn `{}`", cmd.get_program().display());
        }

        for (path, contents) in &exp.creates {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, contents)?;
        }

        Ok(exp.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_pattern_matching() {
        assert!(CommandPattern::Exact("cmake --version".into()).matches("cmake --version"));
        assert!(CommandPattern::StartsWith("cmake".into()).matches("cmake -S ."));
        assert!(CommandPattern::Contains("install".into()).matches("vcpkg install zlib"));
        assert!(CommandPattern::Regex(r"zlib:x64-\w+".into()).matches("vcpkg install zlib:x64-linux"));
        assert!(CommandPattern::Any.matches("anything"));
    }

    #[test]
    fn test_times_limit_falls_through_to_next() {
        let runner = MockRunner::new();
        runner
            .expect(
                Expectation::new(CommandPattern::Contains("cmake".into()), ToolOutput::failure(1, "first"))
                    .times(1),
            )
            .succeed("cmake");

        let cmd = ProcessBuilder::new("cmake").arg("--build");
        assert!(!runner.run(&cmd).unwrap().is_success());
        assert!(runner.run(&cmd).unwrap().is_success());
        assert_eq!(runner.count_matching("cmake --build"), 2);
    }

    #[test]
    fn test_unexpected_command_fails() {
        let runner = MockRunner::new();
        let out = runner.run(&ProcessBuilder::new("gcc")).unwrap();
        assert_eq!(out.code, Some(127));
        assert_eq!(runner.calls(), ["gcc"]);
    }

    #[test]
    fn test_creates_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = tmp.path().join("build/CMakeCache.txt");

        let runner = MockRunner::new();
        runner.expect(
            Expectation::new(CommandPattern::Any, ToolOutput::success("")).creates(&cache, "x"),
        );
        runner.run(&ProcessBuilder::new("cmake")).unwrap();
        assert!(cache.exists());
    }
}
