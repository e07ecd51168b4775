//! Three-way diff between declared and locked dependencies.

use std::fmt;

use crate::core::{Dependency, LockEntry, LockManifest, Triplet};

/// What has to happen to bring the lock-manifest in line with the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDiff {
    /// Declared but not locked for the current triplet
    pub to_install: Vec<Dependency>,
    /// Locked for the current triplet but no longer declared
    pub to_remove: Vec<LockEntry>,
    /// Declared and locked for the current triplet
    pub unchanged: Vec<String>,
    /// Locked for some other triplet
    pub stale: Vec<LockEntry>,
    /// Unchanged entries whose locked version the constraint rejects
    pub unsatisfied: Vec<Unsatisfied>,
}

/// A locked version outside its declared constraint.
///
/// vcpkg in classic mode installs whatever version its ports tree holds,
/// so reinstalling cannot fix this; it is reported instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsatisfied {
    pub name: String,
    pub version: String,
    pub constraint: String,
}

impl fmt::Display for Unsatisfied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` is installed at {}, which does not satisfy `{}`; update the vcpkg ports tree or relax the constraint",
            self.name, self.version, self.constraint
        )
    }
}

impl DependencyDiff {
    /// Compute the diff for `triplet`. Recomputed on every call, never cached.
    pub fn compute(declared: &[Dependency], lock: &LockManifest, triplet: &Triplet) -> Self {
        let mut diff = DependencyDiff::default();

        for dep in declared {
            match lock.find(&dep.name, triplet) {
                Some(entry) => {
                    if !dep.is_satisfied_by(&entry.version) {
                        diff.unsatisfied.push(Unsatisfied {
                            name: dep.name.clone(),
                            version: entry.version.clone(),
                            constraint: dep.constraint.clone().unwrap_or_default(),
                        });
                    }
                    diff.unchanged.push(dep.name.clone());
                }
                None => diff.to_install.push(dep.clone()),
            }
        }

        for entry in lock.entries() {
            if !entry.is_for(triplet) {
                diff.stale.push(entry.clone());
            } else if !declared
                .iter()
                .any(|d| d.name.eq_ignore_ascii_case(&entry.name))
            {
                diff.to_remove.push(entry.clone());
            }
        }

        diff
    }

    /// Keep only the parts of the diff concerning `name`.
    pub fn restrict_to(mut self, name: &str) -> Self {
        self.to_install.retain(|d| d.name.eq_ignore_ascii_case(name));
        self.to_remove.retain(|e| e.name.eq_ignore_ascii_case(name));
        self.unchanged.retain(|n| n.eq_ignore_ascii_case(name));
        self.stale.retain(|e| e.name.eq_ignore_ascii_case(name));
        self.unsatisfied.retain(|u| u.name.eq_ignore_ascii_case(name));
        self
    }

    /// Number of provider operations this diff requires.
    pub fn provider_ops(&self) -> usize {
        self.to_install.len() + self.to_remove.len()
    }

    /// Whether applying the diff would change nothing.
    pub fn is_empty(&self) -> bool {
        self.provider_ops() == 0 && self.stale.is_empty()
    }
}

/// Whether a build must run a bulk install first.
///
/// True when some declared dependency has no lock entry for `triplet`, or
/// the lock-manifest holds entries for another triplet.
pub fn needs_install(declared: &[Dependency], lock: &LockManifest, triplet: &Triplet) -> bool {
    lock.has_other_triplets(triplet) || declared.iter().any(|d| lock.find(&d.name, triplet).is_none())
}
