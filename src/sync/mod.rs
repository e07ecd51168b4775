//! Dependency synchronization.
//!
//! The manifest is the source of truth for intent, the lock-manifest for
//! what is installed. [`Synchronizer::sync`] reconciles the two for one
//! triplet by issuing provider operations, mutating both in memory. The
//! caller decides what to persist:
//!
//! - `Add` leaves both untouched on failure, so the caller saves only on
//!   success.
//! - `Remove` always commits the intent; a failed uninstall is a warning.
//! - `Update`/`Install` record every successful provider operation in the
//!   lock-manifest before returning an error, so the caller persists the
//!   lock-manifest either way.

pub mod diff;

use anyhow::Result;

use crate::core::{Dependency, LockEntry, LockManifest, ProjectManifest, Triplet};
use crate::sources::Provider;
use crate::util::errors::RelayError;
use crate::util::shell::{Shell, Status};

pub use diff::{needs_install, DependencyDiff, Unsatisfied};

/// A synchronizing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOp {
    /// Declare and install one dependency.
    Add(Dependency),
    /// Undeclare one dependency and uninstall it.
    Remove(String),
    /// Re-resolve one declared dependency, or all of them.
    Update(Option<String>),
    /// Install the full declared set for the triplet.
    Install,
}

/// What a synchronization did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub installed: Vec<LockEntry>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
    pub dropped_stale: Vec<LockEntry>,
    pub warnings: Vec<String>,
}

impl SyncReport {
    /// Number of provider operations that succeeded.
    pub fn provider_ops(&self) -> usize {
        self.installed.len() + self.removed.len()
    }

    /// Whether the lock-manifest was changed.
    pub fn changed_lock(&self) -> bool {
        self.provider_ops() > 0 || !self.dropped_stale.is_empty()
    }
}

/// Issues provider operations for declared/locked differences.
pub struct Synchronizer<'a> {
    provider: &'a dyn Provider,
    shell: &'a Shell,
}

impl<'a> Synchronizer<'a> {
    pub fn new(provider: &'a dyn Provider, shell: &'a Shell) -> Self {
        Synchronizer { provider, shell }
    }

    /// Apply `op` for `triplet`.
    pub fn sync(
        &self,
        manifest: &mut ProjectManifest,
        lock: &mut LockManifest,
        triplet: &Triplet,
        op: SyncOp,
    ) -> Result<SyncReport> {
        match op {
            SyncOp::Add(dep) => self.add(manifest, lock, triplet, dep),
            SyncOp::Remove(name) => self.remove(manifest, lock, triplet, &name),
            SyncOp::Update(name) => self.update(manifest, lock, triplet, name.as_deref()),
            SyncOp::Install => self.install_all(manifest, lock, triplet),
        }
    }

    fn add(
        &self,
        manifest: &mut ProjectManifest,
        lock: &mut LockManifest,
        triplet: &Triplet,
        dep: Dependency,
    ) -> Result<SyncReport> {
        if manifest.find_dependency(&dep.name).is_some() {
            return Err(RelayError::DuplicateDependency { name: dep.name }.into());
        }

        let entry = self.install_one(&dep, triplet)?;
        let mut report = SyncReport::default();
        if !dep.is_satisfied_by(&entry.version) {
            let unsatisfied = Unsatisfied {
                name: dep.name.clone(),
                version: entry.version.clone(),
                constraint: dep.constraint.clone().unwrap_or_default(),
            };
            report.warnings.push(unsatisfied.to_string());
        }

        lock.upsert(entry.clone());
        manifest.add_dependency(dep)?;
        report.installed.push(entry);
        Ok(report)
    }

    fn remove(
        &self,
        manifest: &mut ProjectManifest,
        lock: &mut LockManifest,
        triplet: &Triplet,
        name: &str,
    ) -> Result<SyncReport> {
        let dep = manifest.remove_dependency(name)?;
        let mut report = SyncReport::default();

        if lock.find(&dep.name, triplet).is_none() {
            tracing::debug!("{} was never installed for {}", dep.name, triplet);
            return Ok(report);
        }

        let _spinner = self
            .shell
            .spinner(Status::Uninstalling, format!("{}:{}", dep.name, triplet));
        match self.provider.remove(&dep.name, triplet) {
            Ok(()) => {
                lock.remove(&dep.name, triplet);
                report.removed.push(dep.name);
            }
            Err(e) => {
                let warning = format!(
                    "`{}` was removed from Relay.toml but could not be uninstalled: {:#}",
                    dep.name, e
                );
                report.warnings.push(warning);
            }
        }

        Ok(report)
    }

    fn update(
        &self,
        manifest: &ProjectManifest,
        lock: &mut LockManifest,
        triplet: &Triplet,
        name: Option<&str>,
    ) -> Result<SyncReport> {
        let mut diff = DependencyDiff::compute(&manifest.dependencies, lock, triplet);
        if let Some(name) = name {
            if manifest.find_dependency(name).is_none() {
                return Err(RelayError::DependencyNotFound {
                    name: name.to_string(),
                }
                .into());
            }
            diff = diff.restrict_to(name);
        }

        let mut report = SyncReport {
            unchanged: diff.unchanged.clone(),
            warnings: diff.unsatisfied.iter().map(ToString::to_string).collect(),
            ..SyncReport::default()
        };
        self.drop_stale(lock, triplet, &diff.stale, &mut report);
        self.apply(lock, triplet, &diff.to_remove, &diff.to_install, &mut report)?;
        Ok(report)
    }

    fn install_all(
        &self,
        manifest: &ProjectManifest,
        lock: &mut LockManifest,
        triplet: &Triplet,
    ) -> Result<SyncReport> {
        let diff = DependencyDiff::compute(&manifest.dependencies, lock, triplet);

        let mut report = SyncReport::default();
        self.drop_stale(lock, triplet, &diff.stale, &mut report);
        self.apply(lock, triplet, &diff.to_remove, &manifest.dependencies, &mut report)?;
        Ok(report)
    }

    fn drop_stale(
        &self,
        lock: &mut LockManifest,
        triplet: &Triplet,
        stale: &[LockEntry],
        report: &mut SyncReport,
    ) {
        for entry in stale {
            if lock.remove_entry(entry) {
                tracing::info!(
                    "dropping lock entry {} {} for triplet {} (building for {})",
                    entry.name,
                    entry.version,
                    entry.triplet,
                    triplet
                );
                report.dropped_stale.push(entry.clone());
            }
        }
    }

    /// Run removals then installs, recording each success in `lock`.
    fn apply(
        &self,
        lock: &mut LockManifest,
        triplet: &Triplet,
        to_remove: &[LockEntry],
        to_install: &[Dependency],
        report: &mut SyncReport,
    ) -> Result<()> {
        for entry in to_remove {
            let _spinner = self
                .shell
                .spinner(Status::Uninstalling, format!("{}:{}", entry.name, triplet));
            self.provider.remove(&entry.name, triplet)?;
            lock.remove(&entry.name, triplet);
            report.removed.push(entry.name.clone());
        }

        for dep in to_install {
            let entry = self.install_one(dep, triplet)?;
            lock.upsert(entry.clone());
            report.installed.push(entry);
        }

        Ok(())
    }

    fn install_one(&self, dep: &Dependency, triplet: &Triplet) -> Result<LockEntry> {
        let _spinner = self
            .shell
            .spinner(Status::Installing, format!("{}:{}", dep.name, triplet));
        self.provider.install(dep, triplet)
    }
}
