//! Configure fingerprinting.
//!
//! A successful configure leaves a stamp in the build directory recording
//! the triplet and a fingerprint of every input that shapes the generated
//! build tree. The next build skips configure while the stamp still matches.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::cmake::BuildTool;
use crate::core::{ProjectManifest, Triplet};
use crate::util::fs;
use crate::util::hash::Fingerprint;

/// Stamp file name, inside the build directory.
pub const STAMP_FILE: &str = ".relay-configure";

/// The build tool's own cache; its absence forces a configure.
const TOOL_CACHE: &str = "CMakeCache.txt";

/// Fingerprint of everything configure depends on.
///
/// Dependency declarations are fed in manifest order; reordering them in
/// Relay.toml does change the fingerprint.
pub fn configure_fingerprint(
    manifest: &ProjectManifest,
    triplet: &Triplet,
    tool: &dyn BuildTool,
    toolchain_file: Option<&Path>,
) -> String {
    let mut fp = Fingerprint::new();
    fp.update_field("name", &manifest.name)
        .update_field("version", &manifest.version.to_string())
        .update_field("triplet", triplet.as_str());

    fp.update_str("dependencies");
    for dep in &manifest.dependencies {
        fp.update_str(&dep.name)
            .update_opt(dep.constraint.as_deref())
            .update_list(dep.features.iter().map(String::as_str));
    }

    tool.fingerprint(&mut fp);

    let toolchain = toolchain_file.map(|p| p.display().to_string());
    fp.update_opt(toolchain.as_deref());

    fp.finish()
}

/// Record of the last successful configure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureStamp {
    pub triplet: String,
    pub fingerprint: String,
}

impl ConfigureStamp {
    pub fn new(triplet: &Triplet, fingerprint: impl Into<String>) -> Self {
        ConfigureStamp {
            triplet: triplet.to_string(),
            fingerprint: fingerprint.into(),
        }
    }

    pub fn path(build_dir: &Path) -> PathBuf {
        build_dir.join(STAMP_FILE)
    }

    /// Read the stamp; a missing or unreadable stamp is `None`.
    pub fn read(build_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(Self::path(build_dir)).ok()?;
        match serde_json::from_str(&content) {
            Ok(stamp) => Some(stamp),
            Err(e) => {
                tracing::debug!("ignoring unreadable configure stamp: {}", e);
                None
            }
        }
    }

    pub fn write(&self, build_dir: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("failed to serialize configure stamp")?;
        fs::write_string(&Self::path(build_dir), &content)
    }

    /// Delete the stamp so an interrupted configure is never mistaken for
    /// a finished one.
    pub fn invalidate(build_dir: &Path) -> Result<()> {
        let path = Self::path(build_dir);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to remove {}", path.display()))
            }
        }
    }

    /// Whether `build_dir` holds a configure matching `triplet` and `fingerprint`.
    pub fn is_current(build_dir: &Path, triplet: &Triplet, fingerprint: &str) -> bool {
        if !build_dir.join(TOOL_CACHE).is_file() {
            return false;
        }
        match Self::read(build_dir) {
            Some(stamp) => stamp.triplet == triplet.as_str() && stamp.fingerprint == fingerprint,
            None => false,
        }
    }
}
