//! Global context for relay operations.
//!
//! Captures the working directory, the environment variables relay reads
//! and the global config location once per invocation, so operations never
//! consult the process environment directly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{self, Config};

/// Environment variable holding the default toolchain triplet.
pub const TRIPLET_ENV: &str = "VCPKG_DEFAULT_TRIPLET";

/// Environment variable holding the dependency provider root.
pub const PROVIDER_ROOT_ENV: &str = "VCPKG_ROOT";

/// Environment values relay consults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    /// `VCPKG_DEFAULT_TRIPLET`, if set and non-empty
    pub default_triplet: Option<String>,
    /// `VCPKG_ROOT`, if set and non-empty
    pub provider_root: Option<PathBuf>,
}

impl EnvSnapshot {
    /// Read the snapshot from the process environment.
    pub fn capture() -> Self {
        EnvSnapshot {
            default_triplet: non_empty_var(TRIPLET_ENV),
            provider_root: non_empty_var(PROVIDER_ROOT_ENV).map(PathBuf::from),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,
    env: EnvSnapshot,
    global_config: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a context for the current process.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(GlobalContext {
            cwd,
            env: EnvSnapshot::capture(),
            global_config: config::global_config_path(),
        })
    }

    /// Create an isolated context: no environment, no global config.
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        GlobalContext {
            cwd: cwd.into(),
            env: EnvSnapshot::default(),
            global_config: None,
        }
    }

    /// Replace the environment snapshot.
    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = env;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the captured environment.
    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    /// Load the merged configuration for a project.
    pub fn config_for(&self, project_root: &Path) -> Config {
        config::load_config(
            self.global_config.as_deref(),
            &config::project_config_path(project_root),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_isolated_context_ignores_environment() {
        let ctx = GlobalContext::with_cwd("/work");
        assert_eq!(ctx.cwd(), Path::new("/work"));
        assert_eq!(ctx.env(), &EnvSnapshot::default());
    }

    #[test]
    fn test_config_for_reads_project_config() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".relay")).unwrap();
        std::fs::write(
            tmp.path().join(".relay/config.toml"),
            "[build]\nbuild-type = \"Release\"\n",
        )
        .unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path());
        assert_eq!(ctx.config_for(tmp.path()).build.build_type(), "Release");
    }
}
