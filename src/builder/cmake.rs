//! CMake as the native build tool.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::Triplet;
use crate::util::config::BuildConfig;
use crate::util::errors::RelayError;
use crate::util::hash::Fingerprint;
use crate::util::process::{CommandRunner, ProcessBuilder, ToolOutput};

/// Inputs of one configure invocation.
#[derive(Debug, Clone)]
pub struct ConfigureSpec<'a> {
    pub source_dir: &'a Path,
    pub build_dir: &'a Path,
    pub triplet: &'a Triplet,
    /// Provider toolchain file, when a provider root is known
    pub toolchain_file: Option<&'a Path>,
    /// Per-project provider install root
    pub installed_dir: &'a Path,
}

/// The command contract of a native build tool.
///
/// Both phases return the tool's outcome; `Err` is reserved for a tool that
/// could not be started at all.
pub trait BuildTool {
    /// Generate the build tree.
    fn configure(&self, spec: &ConfigureSpec<'_>) -> Result<ToolOutput>;

    /// Compile and link inside an existing build tree.
    fn build(&self, build_dir: &Path) -> Result<ToolOutput>;

    /// Build type (`Debug`, `Release`...), used to locate multi-config output.
    fn build_type(&self) -> &str;

    /// Feed every setting that changes the generated build tree.
    fn fingerprint(&self, fp: &mut Fingerprint);
}

/// CMake settings resolved from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeSettings {
    pub program: PathBuf,
    pub generator: Option<String>,
    pub build_type: String,
    pub jobs: Option<usize>,
}

impl Default for CMakeSettings {
    fn default() -> Self {
        CMakeSettings::from(&BuildConfig::default())
    }
}

impl From<&BuildConfig> for CMakeSettings {
    fn from(config: &BuildConfig) -> Self {
        CMakeSettings {
            program: config.cmake_program(),
            generator: config.generator.clone(),
            build_type: config.build_type().to_string(),
            jobs: config.jobs,
        }
    }
}

/// CMake build adapter.
pub struct CMake<'a> {
    runner: &'a dyn CommandRunner,
    settings: CMakeSettings,
}

impl<'a> CMake<'a> {
    pub fn new(runner: &'a dyn CommandRunner, settings: CMakeSettings) -> Self {
        CMake { runner, settings }
    }

    /// The configure command line.
    pub fn configure_command(&self, spec: &ConfigureSpec<'_>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.settings.program)
            .arg("-S")
            .arg(spec.source_dir)
            .arg("-B")
            .arg(spec.build_dir);

        if let Some(generator) = &self.settings.generator {
            cmd = cmd.arg("-G").arg(generator);
        }

        cmd = cmd
            .arg(format!("-DCMAKE_BUILD_TYPE={}", self.settings.build_type))
            .arg("-DCMAKE_EXPORT_COMPILE_COMMANDS=ON")
            .arg(format!("-DVCPKG_TARGET_TRIPLET={}", spec.triplet));

        if let Some(toolchain) = spec.toolchain_file {
            cmd = cmd
                .arg(format!("-DCMAKE_TOOLCHAIN_FILE={}", toolchain.display()))
                .arg("-DVCPKG_MANIFEST_MODE=OFF")
                .arg(format!("-DVCPKG_INSTALLED_DIR={}", spec.installed_dir.display()));
        }

        cmd.cwd(spec.source_dir)
    }

    /// The build command line.
    pub fn build_command(&self, build_dir: &Path) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.settings.program)
            .arg("--build")
            .arg(build_dir)
            .arg("--config")
            .arg(&self.settings.build_type);

        if let Some(jobs) = self.settings.jobs {
            cmd = cmd.arg("--parallel").arg(jobs.to_string());
        }

        cmd
    }

    fn run(&self, cmd: &ProcessBuilder) -> Result<ToolOutput> {
        self.runner.run(cmd).map_err(|e| {
            RelayError::BuildToolUnavailable {
                program: self.settings.program.display().to_string(),
                reason: format!("{:#}", e),
            }
            .into()
        })
    }
}

impl BuildTool for CMake<'_> {
    fn configure(&self, spec: &ConfigureSpec<'_>) -> Result<ToolOutput> {
        self.run(&self.configure_command(spec))
    }

    fn build(&self, build_dir: &Path) -> Result<ToolOutput> {
        self.run(&self.build_command(build_dir))
    }

    fn build_type(&self) -> &str {
        &self.settings.build_type
    }

    fn fingerprint(&self, fp: &mut Fingerprint) {
        fp.update_field("tool", "cmake")
            .update_opt(self.settings.generator.as_deref())
            .update_field("build-type", &self.settings.build_type);
    }
}
