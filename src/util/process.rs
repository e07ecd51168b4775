//! Subprocess execution.
//!
//! Every external step (provider install/remove, configure, compile, running
//! the produced binary) goes through the [`CommandRunner`] capability so the
//! synchronizer and orchestrator can be exercised against a scripted runner.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::util::errors::FailureReason;
use crate::util::interrupt;

/// How long a child gets to react to a terminal Ctrl-C on its own.
const INTERRUPT_GRACE: Duration = Duration::from_millis(500);

/// How long a child gets after we forward the interrupt before it is killed.
const KILL_GRACE: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Builder describing one subprocess invocation.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
    inherit_stdio: bool,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            inherit_stdio: false,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Hand the child our stdin/stdout/stderr instead of capturing them.
    pub fn inherit_stdio(mut self) -> Self {
        self.inherit_stdio = true;
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if self.inherit_stdio {
            cmd.stdin(Stdio::inherit());
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        }

        cmd
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Outcome of one external step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was ended by a signal.
    pub code: Option<i32>,
    /// Captured stdout (empty for interactive runs).
    pub stdout: String,
    /// Captured stderr (empty for interactive runs).
    pub stderr: String,
    /// Whether relay was interrupted while the step was running.
    pub interrupted: bool,
}

impl ToolOutput {
    /// A successful step with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        ToolOutput {
            code: Some(0),
            stdout: stdout.into(),
            ..ToolOutput::default()
        }
    }

    /// A failed step with the given code and stderr.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        ToolOutput {
            code: Some(code),
            stderr: stderr.into(),
            ..ToolOutput::default()
        }
    }

    /// A step cut short by an interrupt.
    pub fn interrupted() -> Self {
        ToolOutput {
            code: None,
            interrupted: true,
            ..ToolOutput::default()
        }
    }

    /// Non-zero exit is always a failure; so is interruption.
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.code == Some(0)
    }

    /// Classify a failed step.
    pub fn failure_reason(&self) -> FailureReason {
        if self.interrupted {
            FailureReason::Interrupted
        } else {
            match self.code {
                Some(code) => FailureReason::Exit(code),
                None => FailureReason::Signal,
            }
        }
    }

    /// Stdout followed by stderr, unmodified.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !out.is_empty() && !self.stderr.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&self.stderr);
        out
    }
}

/// The narrow capability every external tool call goes through.
pub trait CommandRunner {
    /// Run the command to completion.
    ///
    /// Returns `Err` only when the process could not be started at all; a
    /// started process that fails is reported through [`ToolOutput`].
    fn run(&self, cmd: &ProcessBuilder) -> Result<ToolOutput>;
}

/// Runs real subprocesses, blocking until each exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ToolOutput> {
        run_watching(cmd, interrupt::flag())
    }
}

/// Run `cmd` to completion, treating `interrupted` as the user's Ctrl-C.
fn run_watching(cmd: &ProcessBuilder, interrupted: &AtomicBool) -> Result<ToolOutput> {
    if interrupted.load(Ordering::SeqCst) {
        return Ok(ToolOutput::interrupted());
    }

    tracing::debug!("Running command: {}", cmd.display_command());

    let mut child = cmd
        .build_command()
        .spawn()
        .with_context(|| format!("failed to spawn `{}`", cmd.get_program().display()))?;

    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let (status, was_interrupted) = wait_interruptibly(&mut child, interrupted)
        .with_context(|| format!("failed to wait for `{}`", cmd.get_program().display()))?;

    let stdout = stdout.map(join_reader).unwrap_or_default();
    let stderr = stderr.map(join_reader).unwrap_or_default();

    Ok(ToolOutput {
        code: status.code(),
        stdout,
        stderr,
        interrupted: was_interrupted,
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Wait for the child, forwarding an interrupt once `interrupted` is set.
fn wait_interruptibly(
    child: &mut Child,
    interrupted: &AtomicBool,
) -> std::io::Result<(ExitStatus, bool)> {
    let mut interrupted_at: Option<Instant> = None;
    let mut forwarded_at: Option<Instant> = None;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, interrupted_at.is_some()));
        }

        if interrupted.load(Ordering::SeqCst) {
            let seen = *interrupted_at.get_or_insert_with(Instant::now);

            match forwarded_at {
                None if seen.elapsed() >= INTERRUPT_GRACE => {
                    tracing::debug!("forwarding interrupt to child {}", child.id());
                    forward_interrupt(child);
                    forwarded_at = Some(Instant::now());
                }
                Some(at) if at.elapsed() >= KILL_GRACE => {
                    tracing::debug!("child {} ignored the interrupt, killing it", child.id());
                    let _ = child.kill();
                    let status = child.wait()?;
                    return Ok((status, true));
                }
                _ => {}
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn forward_interrupt(child: &mut Child) {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; the pid belongs to
    // a child we have not reaped yet.
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn forward_interrupt(child: &mut Child) {
    let _ = child.kill();
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
