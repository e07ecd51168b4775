//! vcpkg as the dependency provider.
//!
//! vcpkg runs in classic mode with a per-project install root, so every
//! project keeps its own cache and relay stays the owner of `vcpkg.json`:
//!
//! ```text
//! <project>/vcpkg_installed/<triplet>/
//! ├── include/
//! ├── lib/
//! └── share/<port>/
//!     └── vcpkg.json        # port metadata (version info)
//! ```
//!
//! Installed versions are read from that metadata rather than parsed out of
//! vcpkg's console output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{Dependency, LockEntry, Triplet};
use crate::sources::Provider;
use crate::util::errors::RelayError;
use crate::util::process::{find_executable, CommandRunner, ProcessBuilder};

const UNKNOWN_VERSION: &str = "unknown";

/// Metadata from a port's installed vcpkg.json.
#[derive(Debug, Deserialize)]
struct PortInfo {
    #[serde(default)]
    version: Option<String>,
    #[serde(rename = "version-semver", default)]
    version_semver: Option<String>,
    #[serde(rename = "version-string", default)]
    version_string: Option<String>,
    #[serde(rename = "version-date", default)]
    version_date: Option<String>,
}

impl PortInfo {
    fn get_version(self) -> Option<String> {
        self.version
            .or(self.version_semver)
            .or(self.version_string)
            .or(self.version_date)
    }
}

fn vcpkg_exe() -> &'static str {
    if cfg!(windows) {
        "vcpkg.exe"
    } else {
        "vcpkg"
    }
}

/// Whether `path` looks like a vcpkg root.
pub fn is_valid_root(path: &Path) -> bool {
    path.join(".vcpkg-root").exists()
        || path.join("scripts/buildsystems/vcpkg.cmake").is_file()
        || path.join("share/vcpkg/vcpkg.cmake").is_file()
}

/// Locate the vcpkg root.
///
/// Priority: config file > `VCPKG_ROOT` > the directory of `vcpkg` on PATH.
/// Candidates that are not valid roots are skipped with a warning.
pub fn locate_root(configured: Option<&Path>, env: Option<&Path>) -> Option<PathBuf> {
    let candidates = [(configured, "provider.root"), (env, "VCPKG_ROOT")];
    for (candidate, origin) in candidates {
        let Some(path) = candidate else { continue };
        if is_valid_root(path) {
            tracing::debug!("using vcpkg root {} from {}", path.display(), origin);
            return Some(path.to_path_buf());
        }
        tracing::warn!(
            "ignoring {} = {}: not a vcpkg root",
            origin,
            path.display()
        );
    }

    detect_from_path()
}

/// Find vcpkg in PATH and derive the root from the binary location.
fn detect_from_path() -> Option<PathBuf> {
    let binary = find_executable(vcpkg_exe())?;
    let binary = binary.canonicalize().unwrap_or(binary);
    let root = binary.parent()?;

    if is_valid_root(root) {
        tracing::debug!("found vcpkg in PATH: {}", root.display());
        return Some(root.to_path_buf());
    }
    // Homebrew-style installs keep the scripts under ../share/vcpkg
    let prefix = root.parent()?;
    if prefix.join("share/vcpkg/vcpkg.cmake").is_file() {
        return Some(prefix.to_path_buf());
    }

    None
}

/// The vcpkg provider for one project.
pub struct Vcpkg<'a> {
    runner: &'a dyn CommandRunner,
    root: Option<PathBuf>,
    project_root: PathBuf,
    install_root: PathBuf,
}

impl<'a> Vcpkg<'a> {
    /// Create a provider; `root` is `None` when no vcpkg could be located.
    pub fn new(runner: &'a dyn CommandRunner, root: Option<PathBuf>, project_root: &Path) -> Self {
        Vcpkg {
            runner,
            root,
            project_root: project_root.to_path_buf(),
            install_root: project_root.join(crate::core::store::INSTALL_DIR),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn require_root(&self) -> Result<&Path> {
        self.root.as_deref().ok_or_else(|| {
            RelayError::ProviderUnavailable {
                reason: "no vcpkg root found (checked provider.root, VCPKG_ROOT and PATH)"
                    .to_string(),
            }
            .into()
        })
    }

    fn binary(&self, root: &Path) -> PathBuf {
        let local = root.join(vcpkg_exe());
        if local.is_file() {
            local
        } else {
            find_executable(vcpkg_exe()).unwrap_or(local)
        }
    }

    fn command(&self, root: &Path, verb: &str) -> ProcessBuilder {
        ProcessBuilder::new(self.binary(root))
            .arg(verb)
            .arg("--classic")
            .arg(format!("--x-install-root={}", self.install_root.display()))
            .cwd(&self.project_root)
            .env("VCPKG_ROOT", root.display().to_string())
    }

    fn run(&self, operation: &'static str, package: &str, cmd: ProcessBuilder) -> Result<()> {
        let output = self.runner.run(&cmd).map_err(|e| RelayError::ProviderUnavailable {
            reason: format!("{:#}", e),
        })?;

        if !output.is_success() {
            return Err(RelayError::ProviderFailed {
                operation,
                package: package.to_string(),
                reason: output.failure_reason(),
                output: output.combined(),
            }
            .into());
        }
        tracing::debug!("{}", output.stdout.trim_end());
        Ok(())
    }

    /// Build the install spec (e.g. `glfw3[wayland,x11]:x64-linux`).
    pub fn install_spec(dep: &Dependency, triplet: &Triplet) -> String {
        if dep.features.is_empty() {
            format!("{}:{}", dep.name, triplet)
        } else {
            format!("{}[{}]:{}", dep.name, dep.features.join(","), triplet)
        }
    }

    /// Path to the port's installed metadata.
    fn metadata_path(&self, port: &str, triplet: &Triplet) -> PathBuf {
        self.install_root
            .join(triplet.as_str())
            .join("share")
            .join(port)
            .join("vcpkg.json")
    }

    /// Read the installed version of `port`, if vcpkg left metadata behind.
    pub fn installed_version(&self, port: &str, triplet: &Triplet) -> Result<Option<String>> {
        let path = self.metadata_path(port, triplet);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read vcpkg metadata: {}", path.display()))?;
        let info: PortInfo = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse vcpkg metadata: {}", path.display()))?;
        Ok(info.get_version())
    }
}

impl Provider for Vcpkg<'_> {
    fn install(&self, dep: &Dependency, triplet: &Triplet) -> Result<LockEntry> {
        let root = self.require_root()?;
        let spec = Self::install_spec(dep, triplet);

        self.run("install", &spec, self.command(root, "install").arg(&spec))?;

        let version = match self.installed_version(&dep.name, triplet) {
            Ok(Some(version)) => version,
            Ok(None) => dep
                .constraint
                .clone()
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            Err(e) => {
                tracing::warn!("{:#}", e);
                UNKNOWN_VERSION.to_string()
            }
        };

        Ok(LockEntry::new(&dep.name, version, triplet))
    }

    fn remove(&self, name: &str, triplet: &Triplet) -> Result<()> {
        let root = self.require_root()?;
        let spec = format!("{}:{}", name, triplet);
        self.run("remove", &spec, self.command(root, "remove").arg(&spec))
    }

    fn toolchain_file(&self) -> Option<PathBuf> {
        let root = self.root.as_deref()?;
        let candidates = [
            root.join("scripts/buildsystems/vcpkg.cmake"),
            root.join("share/vcpkg/vcpkg.cmake"),
        ];
        candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .or_else(|| Some(candidates[0].clone()))
    }

    fn install_root(&self) -> PathBuf {
        self.install_root.clone()
    }
}
