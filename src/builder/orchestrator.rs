//! Configure/build sequencing.
//!
//! ```text
//! Unconfigured -> Configuring -> Configured -> Building -> Built
//!                      |                          |
//!                      v                          v
//!               ConfigureFailed               BuildFailed
//! ```
//!
//! Configure is skipped when the stamp in the build directory matches the
//! current fingerprint; build always runs and is left to CMake's own
//! incrementality.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::cmake::{BuildTool, ConfigureSpec};
use crate::builder::fingerprint::{configure_fingerprint, ConfigureStamp};
use crate::core::{ProjectManifest, Triplet};
use crate::util::errors::RelayError;
use crate::util::fs;
use crate::util::shell::{Shell, Status};

/// Where the orchestrator stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Unconfigured,
    Configuring,
    Configured,
    Building,
    Built,
    ConfigureFailed,
    BuildFailed,
}

/// Everything one build needs.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub project_root: &'a Path,
    pub build_dir: &'a Path,
    pub manifest: &'a ProjectManifest,
    pub triplet: &'a Triplet,
    pub toolchain_file: Option<&'a Path>,
    pub installed_dir: &'a Path,
}

/// What a finished build did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub build_dir: PathBuf,
    /// Whether configure actually ran this time
    pub configured: bool,
}

/// Drives a [`BuildTool`] through configure and build.
pub struct Orchestrator<'a> {
    tool: &'a dyn BuildTool,
    shell: &'a Shell,
    state: BuildState,
}

impl<'a> Orchestrator<'a> {
    pub fn new(tool: &'a dyn BuildTool, shell: &'a Shell) -> Self {
        Orchestrator {
            tool,
            shell,
            state: BuildState::Unconfigured,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Configure if needed, then build.
    pub fn build(&mut self, request: &BuildRequest<'_>) -> Result<BuildOutcome> {
        let fingerprint = configure_fingerprint(
            request.manifest,
            request.triplet,
            self.tool,
            request.toolchain_file,
        );

        let configured = if ConfigureStamp::is_current(request.build_dir, request.triplet, &fingerprint)
        {
            tracing::debug!("configure is current for {}", request.build_dir.display());
            self.shell.status(
                Status::Fresh,
                format!("{} ({})", request.manifest.name, request.triplet),
            );
            self.state = BuildState::Configured;
            false
        } else {
            self.configure(request, &fingerprint)?;
            true
        };

        self.compile(request)?;

        Ok(BuildOutcome {
            build_dir: request.build_dir.to_path_buf(),
            configured,
        })
    }

    fn configure(&mut self, request: &BuildRequest<'_>, fingerprint: &str) -> Result<()> {
        self.state = BuildState::Configuring;

        fs::ensure_dir(request.build_dir)?;
        ConfigureStamp::invalidate(request.build_dir)?;

        let spec = ConfigureSpec {
            source_dir: request.project_root,
            build_dir: request.build_dir,
            triplet: request.triplet,
            toolchain_file: request.toolchain_file,
            installed_dir: request.installed_dir,
        };

        let output = {
            let _spinner = self.shell.spinner(
                Status::Configuring,
                format!("{} ({})", request.manifest.name, request.triplet),
            );
            match self.tool.configure(&spec) {
                Ok(output) => output,
                Err(e) => {
                    self.state = BuildState::ConfigureFailed;
                    return Err(e);
                }
            }
        };
        self.shell.verbose_output(&output.combined());

        if !output.is_success() {
            self.state = BuildState::ConfigureFailed;
            return Err(RelayError::ConfigureFailed {
                reason: output.failure_reason(),
                output: output.combined(),
            }
            .into());
        }

        ConfigureStamp::new(request.triplet, fingerprint).write(request.build_dir)?;
        self.state = BuildState::Configured;
        Ok(())
    }

    fn compile(&mut self, request: &BuildRequest<'_>) -> Result<()> {
        self.state = BuildState::Building;

        let output = {
            let _spinner = self.shell.spinner(
                Status::Building,
                format!(
                    "{} v{} ({})",
                    request.manifest.name, request.manifest.version, self.tool.build_type()
                ),
            );
            match self.tool.build(request.build_dir) {
                Ok(output) => output,
                Err(e) => {
                    self.state = BuildState::BuildFailed;
                    return Err(e);
                }
            }
        };
        self.shell.verbose_output(&output.combined());

        if !output.is_success() {
            self.state = BuildState::BuildFailed;
            return Err(RelayError::CompileFailed {
                reason: output.failure_reason(),
                output: output.combined(),
            }
            .into());
        }

        self.state = BuildState::Built;
        Ok(())
    }
}
