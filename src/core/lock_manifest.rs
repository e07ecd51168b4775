//! The provider lock-manifest (`vcpkg.json`).
//!
//! relay owns exactly two keys of this file:
//! - `dependencies`: sorted names of installed ports, the provider's view
//! - `$relay-installed`: `{name, version, triplet}` for every installed port
//!
//! Everything else (`name`, `builtin-baseline`, overrides...) is kept
//! as-is, in its original order.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::triplet::Triplet;
use crate::util::errors::RelayError;

/// The lock-manifest file name.
pub const LOCK_FILE: &str = "vcpkg.json";

const INSTALLED_KEY: &str = "$relay-installed";
const DEPENDENCIES_KEY: &str = "dependencies";

/// One installed dependency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockEntry {
    pub name: String,
    pub version: String,
    pub triplet: String,
}

impl LockEntry {
    pub fn new(name: impl Into<String>, version: impl Into<String>, triplet: &Triplet) -> Self {
        LockEntry {
            name: name.into(),
            version: version.into(),
            triplet: triplet.to_string(),
        }
    }

    /// Whether this entry was installed for `triplet`.
    pub fn is_for(&self, triplet: &Triplet) -> bool {
        self.triplet == triplet.as_str()
    }
}

/// The relay-managed view of `vcpkg.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockManifest {
    entries: Vec<LockEntry>,
    document: Map<String, Value>,
}

impl LockManifest {
    /// The initial lock-manifest written by `relay new`.
    pub fn for_project(project_name: &str) -> Self {
        let mut document = Map::new();
        document.insert(
            "name".to_string(),
            Value::String(project_name.to_ascii_lowercase().replace('_', "-")),
        );
        document.insert(DEPENDENCIES_KEY.to_string(), Value::Array(Vec::new()));
        LockManifest {
            entries: Vec::new(),
            document,
        }
    }

    /// Parse lock-manifest text; `path` is only used for error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, RelayError> {
        let corrupt = |reason: String| RelayError::LockCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let document = match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(corrupt("top level must be a JSON object".to_string())),
            Err(e) => return Err(corrupt(e.to_string())),
        };

        let mut entries: Vec<LockEntry> = match document.get(INSTALLED_KEY) {
            None => Vec::new(),
            Some(installed) => serde_json::from_value(installed.clone())
                .map_err(|e| corrupt(format!("`{INSTALLED_KEY}`: {e}")))?,
        };
        entries.sort();
        entries.dedup_by(|a, b| a.name == b.name && a.triplet == b.triplet);

        Ok(LockManifest { entries, document })
    }

    /// Render the lock-manifest as pretty-printed JSON.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        let mut document = self.document.clone();

        let mut names: Vec<&str> = self.entries.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        document.insert(
            DEPENDENCIES_KEY.to_string(),
            Value::Array(names.into_iter().map(|n| Value::String(n.to_string())).collect()),
        );
        document.insert(INSTALLED_KEY.to_string(), serde_json::to_value(&self.entries)?);

        let mut out = serde_json::to_string_pretty(&Value::Object(document))?;
        out.push('\n');
        Ok(out)
    }

    /// All entries, sorted by name then triplet.
    pub fn entries(&self) -> &[LockEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry for `name` installed for `triplet`.
    pub fn find(&self, name: &str, triplet: &Triplet) -> Option<&LockEntry> {
        self.entries
            .iter()
            .find(|e| e.is_for(triplet) && e.name.eq_ignore_ascii_case(name))
    }

    /// Insert or replace the entry with the same name and triplet.
    pub fn upsert(&mut self, entry: LockEntry) {
        self.entries
            .retain(|e| !(e.triplet == entry.triplet && e.name.eq_ignore_ascii_case(&entry.name)));
        self.entries.push(entry);
        self.entries.sort();
    }

    /// Remove the entry for `name` and `triplet`, returning it.
    pub fn remove(&mut self, name: &str, triplet: &Triplet) -> Option<LockEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.is_for(triplet) && e.name.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(index))
    }

    /// Remove exactly `entry` (same name and triplet string).
    pub fn remove_entry(&mut self, entry: &LockEntry) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.name == entry.name && e.triplet == entry.triplet));
        self.entries.len() != before
    }

    /// Whether any entry belongs to a triplet other than `triplet`.
    pub fn has_other_triplets(&self, triplet: &Triplet) -> bool {
        self.entries.iter().any(|e| !e.is_for(triplet))
    }

    /// Forget every installed entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Apply the entry changes that turned `before` into `after`.
    ///
    /// Entries nobody touched between the two snapshots are left alone, so
    /// records written by another process in the meantime survive.
    pub fn replay(&mut self, before: &LockManifest, after: &LockManifest) {
        for gone in before.entries.iter().filter(|e| !after.entries.contains(e)) {
            self.remove_entry(gone);
        }
        for added in after.entries.iter().filter(|e| !before.entries.contains(e)) {
            self.upsert(added.clone());
        }
    }
}
