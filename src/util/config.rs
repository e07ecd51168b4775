//! Configuration file support for relay.
//!
//! relay reads two optional configuration files:
//! - Global: `<config dir>/relay/config.toml` - user-wide defaults
//! - Project: `.relay/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Dependency provider settings
    pub provider: ProviderConfig,

    /// Native build tool settings
    pub build: BuildConfig,
}

/// Dependency provider (vcpkg) settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProviderConfig {
    /// Provider root directory; wins over VCPKG_ROOT
    pub root: Option<PathBuf>,
}

/// Native build tool (CMake) settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Build tool program (default: `cmake` from PATH)
    pub cmake: Option<PathBuf>,

    /// Generator passed as `-G`
    pub generator: Option<String>,

    /// CMAKE_BUILD_TYPE / `--config` value (default: Debug)
    pub build_type: Option<String>,

    /// Parallel jobs for the build phase (None = tool default)
    pub jobs: Option<usize>,
}

impl BuildConfig {
    /// The effective build type.
    pub fn build_type(&self) -> &str {
        self.build_type.as_deref().unwrap_or("Debug")
    }

    /// The effective build tool program.
    pub fn cmake_program(&self) -> PathBuf {
        self.cmake.clone().unwrap_or_else(|| PathBuf::from("cmake"))
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing
    /// or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.provider.root.is_some() {
            self.provider.root = other.provider.root;
        }
        if other.build.cmake.is_some() {
            self.build.cmake = other.build.cmake;
        }
        if other.build.generator.is_some() {
            self.build.generator = other.build.generator;
        }
        if other.build.build_type.is_some() {
            self.build.build_type = other.build.build_type;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.relay/config.toml)
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global config path (`<config dir>/relay/config.toml`).
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "relay").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Get the project config path (`.relay/config.toml`).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".relay").join("config.toml")
}
