//! Filesystem utilities.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::util::errors::RelayError;

/// How long `FileLock::acquire` keeps retrying before giving up.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Remove a directory and all its contents, if it exists.
///
/// Returns whether anything was removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
        Err(e) => {
            Err(e).with_context(|| format!("failed to remove directory: {}", path.display()))
        }
    }
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a partial one.
///
/// The data goes to a temporary sibling which is then renamed over the
/// target; both live in the same directory so the rename stays atomic.
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write temporary file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to flush temporary file for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;

    Ok(())
}

/// An exclusive advisory lock on a file, held as `<file>.lock`.
///
/// The lock file is created with `create_new`, so only one holder can exist
/// at a time. It is removed when the guard drops.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Path of the lock file guarding `target`.
    pub fn lock_path(target: &Path) -> PathBuf {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        target.with_file_name(name)
    }

    /// Acquire the lock for `target`, waiting up to [`LOCK_TIMEOUT`].
    pub fn acquire(target: &Path) -> Result<Self> {
        Self::acquire_with_timeout(target, LOCK_TIMEOUT)
    }

    /// Acquire the lock for `target`, waiting up to `timeout`.
    pub fn acquire_with_timeout(target: &Path, timeout: Duration) -> Result<Self> {
        let path = Self::lock_path(target);
        let started = Instant::now();

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    tracing::trace!("acquired {}", path.display());
                    return Ok(FileLock { path });
                }
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                    if started.elapsed() >= timeout {
                        return Err(RelayError::ManifestLocked {
                            path: target.to_path_buf(),
                        }
                        .into());
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to create lock file {}", path.display()));
                }
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("failed to release {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::errors::find_relay_error;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Relay.toml");

        atomic_write(&path, "first").unwrap();
        atomic_write(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        // No temporary siblings left behind
        let entries: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("Relay.toml");

        let guard = FileLock::acquire(&target).unwrap();
        assert!(tmp.path().join("Relay.toml.lock").exists());

        let err = FileLock::acquire_with_timeout(&target, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(
            find_relay_error(&err),
            Some(RelayError::ManifestLocked { .. })
        ));

        drop(guard);
        assert!(!tmp.path().join("Relay.toml.lock").exists());
        FileLock::acquire(&target).unwrap();
    }

    #[test]
    fn test_remove_missing_dir_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("build");

        assert!(!remove_dir_all_if_exists(&missing).unwrap());

        fs::create_dir_all(missing.join("x64_linux")).unwrap();
        assert!(remove_dir_all_if_exists(&missing).unwrap());
        assert!(!missing.exists());
    }
}
