//! Dependency providers.
//!
//! relay never resolves versions itself. A [`Provider`] installs and removes
//! ports for a triplet and reports what it installed; the synchronizer
//! decides which operations to issue.

pub mod vcpkg;

use std::path::PathBuf;

use anyhow::Result;

use crate::core::{Dependency, LockEntry, Triplet};

pub use vcpkg::Vcpkg;

/// The command contract of an external dependency provider.
pub trait Provider {
    /// Install `dep` for `triplet` and describe what ended up installed.
    fn install(&self, dep: &Dependency, triplet: &Triplet) -> Result<LockEntry>;

    /// Uninstall the port `name` for `triplet`.
    fn remove(&self, name: &str, triplet: &Triplet) -> Result<()>;

    /// CMake toolchain file integrating this provider, if it is available.
    fn toolchain_file(&self) -> Option<PathBuf>;

    /// Per-project directory the provider installs into.
    fn install_root(&self) -> PathBuf;
}
