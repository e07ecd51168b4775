//! Reading and writing the two manifests of a project.
//!
//! Nothing is cached between calls: every load reads the file again so
//! manual edits between invocations are always seen. Edits go through
//! [`ManifestStore::update`] and [`ManifestStore::update_lock`], which hold
//! the file's lock across re-read, change and atomic replace.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::lock_manifest::{LockManifest, LOCK_FILE};
use crate::core::manifest::{ProjectManifest, MANIFEST_FILE};
use crate::util::errors::RelayError;
use crate::util::fs::{self as relay_fs, FileLock};

/// How many ancestors of the working directory are searched for Relay.toml.
pub const MAX_SEARCH_DEPTH: usize = 32;

/// Directory holding build output, one subdirectory per triplet.
pub const BUILD_DIR: &str = "build";

/// Directory holding the provider's per-project install cache.
pub const INSTALL_DIR: &str = "vcpkg_installed";

/// Owner of a project's manifest files.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    /// Find the project containing `start`, searching upward.
    pub fn discover(start: &Path) -> Result<Self> {
        let mut current = Some(start);
        for _ in 0..=MAX_SEARCH_DEPTH {
            let Some(dir) = current else { break };
            if dir.join(MANIFEST_FILE).is_file() {
                tracing::debug!("found {} in {}", MANIFEST_FILE, dir.display());
                return Ok(ManifestStore::at(dir));
            }
            current = dir.parent();
        }

        Err(RelayError::ManifestMissing {
            start: start.to_path_buf(),
            depth: MAX_SEARCH_DEPTH,
        }
        .into())
    }

    /// A store rooted at `root`, which need not contain a manifest yet.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        ManifestStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    pub fn build_root(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    pub fn install_root(&self) -> PathBuf {
        self.root.join(INSTALL_DIR)
    }

    /// Load the project manifest.
    pub fn load(&self) -> Result<ProjectManifest> {
        let path = self.manifest_path();
        if !path.is_file() {
            return Err(RelayError::ManifestMissing {
                start: self.root.clone(),
                depth: 0,
            }
            .into());
        }
        let content = relay_fs::read_to_string(&path)?;
        Ok(ProjectManifest::parse(&content, &path)?)
    }

    /// Load the lock-manifest; a missing file is an empty lock-manifest.
    pub fn load_lock(&self) -> Result<LockManifest> {
        let path = self.lock_path();
        if !path.is_file() {
            return Ok(LockManifest::default());
        }
        let content = relay_fs::read_to_string(&path)?;
        Ok(LockManifest::parse(&content, &path)?)
    }

    /// Write a whole manifest, as `relay new` does for a fresh project.
    pub fn save(&self, manifest: &ProjectManifest) -> Result<()> {
        let path = self.manifest_path();
        let _lock = FileLock::acquire(&path)?;

        let original = read_if_exists(&path)?;
        write_manifest(&path, manifest, original.as_deref())
    }

    /// Write a whole lock-manifest, as `relay new` does for a fresh project.
    pub fn save_lock(&self, lock: &LockManifest) -> Result<()> {
        let path = self.lock_path();
        let _lock = FileLock::acquire(&path)?;

        let original = read_if_exists(&path)?;
        write_lock(&path, lock, original.as_deref())
    }

    /// Apply `edit` to the manifest as it is on disk right now.
    ///
    /// The file's lock is held from the read to the write, so edits made by
    /// another relay process since our own [`load`](Self::load) survive.
    /// Nothing is written when `edit` fails.
    pub fn update<T>(&self, edit: impl FnOnce(&mut ProjectManifest) -> Result<T>) -> Result<T> {
        let path = self.manifest_path();
        let _lock = FileLock::acquire(&path)?;

        let Some(original) = read_if_exists(&path)? else {
            return Err(RelayError::ManifestMissing {
                start: self.root.clone(),
                depth: 0,
            }
            .into());
        };
        let mut manifest = ProjectManifest::parse(&original, &path)?;
        let out = edit(&mut manifest)?;
        write_manifest(&path, &manifest, Some(&original))?;
        Ok(out)
    }

    /// Apply `edit` to the lock-manifest as it is on disk right now.
    ///
    /// Same locking as [`update`](Self::update); a missing file starts empty.
    pub fn update_lock<T>(&self, edit: impl FnOnce(&mut LockManifest) -> Result<T>) -> Result<T> {
        let path = self.lock_path();
        let _lock = FileLock::acquire(&path)?;

        let original = read_if_exists(&path)?;
        let mut lock = match &original {
            Some(content) => LockManifest::parse(content, &path)?,
            None => LockManifest::default(),
        };
        let out = edit(&mut lock)?;
        if original.is_none() && lock.is_empty() {
            return Ok(out);
        }
        write_lock(&path, &lock, original.as_deref())?;
        Ok(out)
    }
}

fn read_if_exists(path: &Path) -> Result<Option<String>> {
    if path.is_file() {
        Ok(Some(relay_fs::read_to_string(path)?))
    } else {
        Ok(None)
    }
}

fn write_manifest(path: &Path, manifest: &ProjectManifest, original: Option<&str>) -> Result<()> {
    let rendered = manifest.render(original);
    if original == Some(rendered.as_str()) {
        tracing::trace!("{} unchanged", path.display());
        return Ok(());
    }

    relay_fs::atomic_write(path, &rendered)?;
    tracing::debug!("wrote {}", path.display());
    Ok(())
}

fn write_lock(path: &Path, lock: &LockManifest, original: Option<&str>) -> Result<()> {
    let rendered = lock.render()?;
    if original == Some(rendered.as_str()) {
        tracing::trace!("{} unchanged", path.display());
        return Ok(());
    }

    relay_fs::atomic_write(path, &rendered)?;
    tracing::debug!("wrote {}", path.display());
    Ok(())
}
