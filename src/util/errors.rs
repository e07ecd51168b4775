//! Classified relay errors.
//!
//! Operations return `anyhow::Result` and raise one of these variants for
//! every failure the CLI needs to tell apart. The binary walks the error
//! chain, finds the `RelayError`, and turns its [`ErrorKind`] into a
//! message prefix and an exit code.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Common help messages for consistent error reporting.
pub mod suggestions {
    /// No manifest in the current directory tree.
    pub const NO_MANIFEST: &str =
        "run `relay new <name>` to create a project, or cd into an existing one";

    /// The project manifest failed to parse.
    pub const FIX_MANIFEST: &str = "fix the file by hand; relay never deletes Relay.toml";

    /// The lock-manifest failed to parse.
    pub const FIX_LOCK: &str =
        "delete vcpkg.json (or fix it by hand) and run `relay install` to rebuild it";

    /// No usable dependency provider.
    pub const PROVIDER_SETUP: &str =
        "set VCPKG_ROOT to your vcpkg checkout, or set `provider.root` in .relay/config.toml";

    /// The build tool could not be spawned.
    pub const BUILD_TOOL_SETUP: &str = "install CMake and make sure `cmake` is on your PATH";

    /// The triplet flag was malformed.
    pub const TRIPLET_FORMAT: &str =
        "triplets look like <arch>-<os>[-<variant>], e.g. x64-linux or arm64-osx";

    /// Build reported success but produced nothing where expected.
    pub const BINARY_MISSING: &str =
        "make sure CMakeLists.txt declares add_executable() with the package name";
}

/// The error classes the CLI distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad flags, names or arguments; caught before any side effect.
    Input,
    /// Missing or corrupt project manifest or lock-manifest.
    Manifest,
    /// Add/remove/update inconsistency or provider failure.
    Dependency,
    /// Configure or compile failure.
    Build,
    /// The produced binary is missing or could not be launched.
    Runtime,
}

impl ErrorKind {
    /// Process exit code for this class.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Input => 2,
            ErrorKind::Manifest => 3,
            ErrorKind::Dependency => 4,
            ErrorKind::Build => 5,
            ErrorKind::Runtime => 6,
        }
    }

    /// Stable message prefix for this class.
    pub fn prefix(&self) -> &'static str {
        match self {
            ErrorKind::Input => "error[input]",
            ErrorKind::Manifest => "error[manifest]",
            ErrorKind::Dependency => "error[dependency]",
            ErrorKind::Build => "error[build]",
            ErrorKind::Runtime => "error[runtime]",
        }
    }
}

/// Why an external step did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The process exited with a non-zero code.
    Exit(i32),
    /// The process was terminated by a signal it did not get from us.
    Signal,
    /// The user interrupted relay while the step was running.
    Interrupted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Exit(code) => write!(f, "exit code {}", code),
            FailureReason::Signal => write!(f, "terminated by signal"),
            FailureReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// A classified relay failure.
#[derive(Debug, Error)]
pub enum RelayError {
    // Input
    #[error("invalid toolchain triplet `{value}`")]
    InvalidTriplet { value: String },

    #[error("invalid {what} name `{name}`: {reason}")]
    InvalidName {
        what: &'static str,
        name: String,
        reason: String,
    },

    #[error("destination `{}` already exists", path.display())]
    DestinationExists { path: PathBuf },

    // Manifest
    #[error("could not find `Relay.toml` in `{}` or any of its {depth} parent directories", start.display())]
    ManifestMissing { start: PathBuf, depth: usize },

    #[error("failed to parse `{}`: {reason}", path.display())]
    ManifestCorrupt { path: PathBuf, reason: String },

    #[error("failed to parse lock-manifest `{}`: {reason}", path.display())]
    LockCorrupt { path: PathBuf, reason: String },

    #[error("timed out waiting for the write lock on `{}`", path.display())]
    ManifestLocked { path: PathBuf },

    // Dependency
    #[error("dependency `{name}` is already declared in Relay.toml")]
    DuplicateDependency { name: String },

    #[error("dependency `{name}` is not declared in Relay.toml")]
    DependencyNotFound { name: String },

    #[error("dependency provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    #[error("provider {operation} of `{package}` failed ({reason})\n{output}")]
    ProviderFailed {
        operation: &'static str,
        package: String,
        reason: FailureReason,
        output: String,
    },

    // Build
    #[error("build tool `{program}` could not be started: {reason}")]
    BuildToolUnavailable { program: String, reason: String },

    #[error("configure step failed ({reason})\n{output}")]
    ConfigureFailed { reason: FailureReason, output: String },

    #[error("compile step failed ({reason})\n{output}")]
    CompileFailed { reason: FailureReason, output: String },

    // Runtime
    #[error("build succeeded but no binary was found at {}", display_paths(expected))]
    BinaryNotFound { expected: Vec<PathBuf> },

    #[error("failed to launch `{}`: {reason}", path.display())]
    LaunchFailed { path: PathBuf, reason: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("`{}`", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl RelayError {
    /// The class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::InvalidTriplet { .. }
            | RelayError::InvalidName { .. }
            | RelayError::DestinationExists { .. } => ErrorKind::Input,

            RelayError::ManifestMissing { .. }
            | RelayError::ManifestCorrupt { .. }
            | RelayError::LockCorrupt { .. }
            | RelayError::ManifestLocked { .. } => ErrorKind::Manifest,

            RelayError::DuplicateDependency { .. }
            | RelayError::DependencyNotFound { .. }
            | RelayError::ProviderUnavailable { .. }
            | RelayError::ProviderFailed { .. } => ErrorKind::Dependency,

            RelayError::BuildToolUnavailable { .. }
            | RelayError::ConfigureFailed { .. }
            | RelayError::CompileFailed { .. } => ErrorKind::Build,

            RelayError::BinaryNotFound { .. } | RelayError::LaunchFailed { .. } => {
                ErrorKind::Runtime
            }
        }
    }

    /// A recovery hint, when there is a useful one.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            RelayError::InvalidTriplet { .. } => Some(suggestions::TRIPLET_FORMAT),
            RelayError::ManifestMissing { .. } => Some(suggestions::NO_MANIFEST),
            RelayError::ManifestCorrupt { .. } => Some(suggestions::FIX_MANIFEST),
            RelayError::LockCorrupt { .. } => Some(suggestions::FIX_LOCK),
            RelayError::ManifestLocked { .. } => Some(
                "another relay process may be running; delete the `.lock` file if it is stale",
            ),
            RelayError::ProviderUnavailable { .. } => Some(suggestions::PROVIDER_SETUP),
            RelayError::BuildToolUnavailable { .. } => Some(suggestions::BUILD_TOOL_SETUP),
            RelayError::BinaryNotFound { .. } => Some(suggestions::BINARY_MISSING),
            RelayError::DuplicateDependency { .. } => {
                Some("use `relay update <name>` to refresh an existing dependency")
            }
            _ => None,
        }
    }
}

/// Find the classified error in an `anyhow` chain, if any.
pub fn find_relay_error(err: &anyhow::Error) -> Option<&RelayError> {
    err.chain().find_map(|e| e.downcast_ref::<RelayError>())
}
