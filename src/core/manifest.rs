//! Relay.toml manifest parsing and schema.
//!
//! The manifest records intent: the project's identity, its persisted
//! toolchain default and the ordered list of declared dependencies.
//!
//! ```toml
//! [package]
//! name = "embedded_c"
//! version = "0.1.0"
//! toolchain = "x64-linux"
//!
//! [dependencies]
//! zlib = "*"
//! fmt = "10.1"
//! curl = { version = "8", features = ["ssl"] }
//! ```
//!
//! Reads go through `toml_edit` so that writes can be applied back onto the
//! user's document, keeping comments and untouched entries intact.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use semver::{Version, VersionReq};
use toml_edit::{value, Array, DocumentMut, InlineTable, Item, Table, Value};

use crate::util::errors::RelayError;

/// The manifest file name.
pub const MANIFEST_FILE: &str = "Relay.toml";

static PROJECT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("project name pattern is valid"));

static DEPENDENCY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("dependency name pattern is valid"));

/// Check a project name against the filesystem-safe identifier pattern.
pub fn validate_project_name(name: &str) -> Result<(), RelayError> {
    if PROJECT_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(RelayError::InvalidName {
            what: "project",
            name: name.to_string(),
            reason: "must start with a letter and contain only letters, digits, `_` or `-`"
                .to_string(),
        })
    }
}

/// Normalize and check a dependency (port) name.
pub fn normalize_dependency_name(name: &str) -> Result<String, RelayError> {
    let normalized = name.trim().to_ascii_lowercase();
    if DEPENDENCY_NAME_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(RelayError::InvalidName {
            what: "dependency",
            name: name.to_string(),
            reason: "must contain only lowercase letters, digits or `-`".to_string(),
        })
    }
}

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Lower-cased port name
    pub name: String,
    /// Version constraint, `None` for "any"
    pub constraint: Option<String>,
    /// Port features to enable
    pub features: Vec<String>,
}

impl Dependency {
    /// Create a dependency with no constraint.
    pub fn new(name: &str) -> Result<Self, RelayError> {
        Ok(Dependency {
            name: normalize_dependency_name(name)?,
            constraint: None,
            features: Vec::new(),
        })
    }

    /// Set the version constraint; `*` and the empty string mean none.
    pub fn with_constraint(mut self, constraint: Option<&str>) -> Self {
        self.constraint = constraint
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "*")
            .map(str::to_string);
        self
    }

    /// Set the features to enable.
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    /// Whether an installed version meets the constraint.
    ///
    /// Versions and constraints that are not semver never count as
    /// unsatisfied; the provider is the authority on those.
    pub fn is_satisfied_by(&self, version: &str) -> bool {
        let Some(constraint) = &self.constraint else {
            return true;
        };
        let Ok(req) = VersionReq::parse(constraint) else {
            return true;
        };
        match lenient_version(version) {
            Some(v) => req.matches(&v),
            None => true,
        }
    }

    fn to_item(&self) -> Item {
        if self.features.is_empty() {
            return value(self.constraint.as_deref().unwrap_or("*"));
        }

        let mut table = InlineTable::new();
        if let Some(constraint) = &self.constraint {
            table.insert("version", constraint.as_str().into());
        }
        let features: Array = self.features.iter().map(String::as_str).collect();
        table.insert("features", Value::Array(features));
        Item::Value(Value::InlineTable(table))
    }
}

/// Parse provider versions like `1.3`, `1.3.1` or `1.3.1#2` as semver.
fn lenient_version(version: &str) -> Option<Version> {
    let base = version.split('#').next().unwrap_or(version).trim();
    if let Ok(v) = Version::parse(base) {
        return Some(v);
    }

    let parts: Vec<&str> = base.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.parse::<u64>().is_err()) {
        return None;
    }
    let mut padded: Vec<&str> = parts;
    while padded.len() < 3 {
        padded.push("0");
    }
    Version::parse(&padded.join(".")).ok()
}

/// The parsed Relay.toml manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectManifest {
    pub name: String,
    pub version: Version,
    /// Triplet persisted by the last successful build
    pub toolchain: Option<String>,
    /// Declared dependencies, in file order
    pub dependencies: Vec<Dependency>,
}

impl ProjectManifest {
    /// A fresh manifest for `relay new`.
    pub fn new(name: &str) -> Result<Self, RelayError> {
        validate_project_name(name)?;
        Ok(ProjectManifest {
            name: name.to_string(),
            version: Version::new(0, 1, 0),
            toolchain: None,
            dependencies: Vec::new(),
        })
    }

    /// Parse manifest text; `path` is only used for error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, RelayError> {
        let corrupt = |reason: String| RelayError::ManifestCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let doc: DocumentMut = content.parse().map_err(|e| corrupt(format!("{e}")))?;

        let package = doc
            .get("package")
            .and_then(Item::as_table_like)
            .ok_or_else(|| corrupt("missing [package] table".to_string()))?;

        let name = package
            .get("name")
            .and_then(Item::as_str)
            .ok_or_else(|| corrupt("`package.name` must be a string".to_string()))?;
        validate_project_name(name).map_err(|e| corrupt(e.to_string()))?;

        let version_str = package
            .get("version")
            .and_then(Item::as_str)
            .ok_or_else(|| corrupt("`package.version` must be a string".to_string()))?;
        let version = Version::parse(version_str)
            .map_err(|e| corrupt(format!("`package.version` is not a semantic version: {e}")))?;

        let toolchain = match package.get("toolchain") {
            None => None,
            Some(item) => Some(
                item.as_str()
                    .ok_or_else(|| corrupt("`package.toolchain` must be a string".to_string()))?
                    .to_string(),
            ),
        };

        let mut dependencies: Vec<Dependency> = Vec::new();
        if let Some(item) = doc.get("dependencies") {
            let table = item
                .as_table_like()
                .ok_or_else(|| corrupt("[dependencies] must be a table".to_string()))?;

            for (key, item) in table.iter() {
                let dep = parse_dependency(key, item).map_err(corrupt)?;
                if dependencies.iter().any(|d| d.name == dep.name) {
                    return Err(corrupt(format!("dependency `{}` is declared twice", dep.name)));
                }
                dependencies.push(dep);
            }
        }

        Ok(ProjectManifest {
            name: name.to_string(),
            version,
            toolchain,
            dependencies,
        })
    }

    /// Render the manifest, applying it onto `original` when given.
    ///
    /// Entries that did not change keep their original formatting.
    pub fn render(&self, original: Option<&str>) -> String {
        let mut doc = original
            .and_then(|text| text.parse::<DocumentMut>().ok())
            .unwrap_or_default();
        self.apply_to(&mut doc);
        doc.to_string()
    }

    fn apply_to(&self, doc: &mut DocumentMut) {
        if !doc.get("package").is_some_and(Item::is_table) {
            doc["package"] = Item::Table(Table::new());
        }
        let package = &mut doc["package"];
        if package.get("name").and_then(Item::as_str) != Some(self.name.as_str()) {
            package["name"] = value(self.name.as_str());
        }
        let version = self.version.to_string();
        if package.get("version").and_then(Item::as_str) != Some(version.as_str()) {
            package["version"] = value(version);
        }
        match &self.toolchain {
            Some(t) if package.get("toolchain").and_then(Item::as_str) != Some(t.as_str()) => {
                package["toolchain"] = value(t.as_str());
            }
            Some(_) => {}
            None => {
                if let Some(table) = package.as_table_like_mut() {
                    table.remove("toolchain");
                }
            }
        }

        if !doc.get("dependencies").is_some_and(Item::is_table_like) {
            doc["dependencies"] = Item::Table(Table::new());
        }
        let Some(deps) = doc["dependencies"].as_table_like_mut() else {
            return;
        };

        let stale: Vec<String> = deps
            .iter()
            .filter(|(key, item)| match parse_dependency(key, item) {
                Ok(existing) => !self.dependencies.contains(&existing),
                Err(_) => true,
            })
            .map(|(key, _)| key.to_string())
            .collect();
        for key in stale {
            deps.remove(&key);
        }

        for dep in &self.dependencies {
            let present = deps
                .iter()
                .any(|(key, _)| key.eq_ignore_ascii_case(&dep.name));
            if !present {
                deps.insert(&dep.name, dep.to_item());
            }
        }
    }

    /// Find a declared dependency by name (case-insensitive).
    pub fn find_dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Append a dependency; fails if the name is already declared.
    pub fn add_dependency(&mut self, dep: Dependency) -> Result<(), RelayError> {
        if self.find_dependency(&dep.name).is_some() {
            return Err(RelayError::DuplicateDependency { name: dep.name });
        }
        self.dependencies.push(dep);
        Ok(())
    }

    /// Remove a dependency by name (case-insensitive).
    pub fn remove_dependency(&mut self, name: &str) -> Result<Dependency, RelayError> {
        let index = self
            .dependencies
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| RelayError::DependencyNotFound {
                name: name.to_string(),
            })?;
        Ok(self.dependencies.remove(index))
    }
}

fn parse_dependency(key: &str, item: &Item) -> Result<Dependency, String> {
    let dep = Dependency::new(key).map_err(|e| e.to_string())?;

    if let Some(constraint) = item.as_str() {
        return Ok(dep.with_constraint(Some(constraint)));
    }

    let table = item
        .as_table_like()
        .ok_or_else(|| format!("dependency `{key}` must be a string or a table"))?;

    let constraint = match table.get("version") {
        None => None,
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| format!("`{key}.version` must be a string"))?,
        ),
    };

    let mut features = Vec::new();
    if let Some(list) = table.get("features") {
        let array = list
            .as_array()
            .ok_or_else(|| format!("`{key}.features` must be an array of strings"))?;
        for feature in array.iter() {
            let feature = feature
                .as_str()
                .ok_or_else(|| format!("`{key}.features` must be an array of strings"))?;
            features.push(feature.to_string());
        }
    }

    Ok(dep.with_constraint(constraint).with_features(features))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"# my project
[package]
name = "embedded_c"
version = "0.1.0"

[dependencies]
zlib = "*"   # compression
fmt = "10.1"
curl = { version = "8", features = ["ssl"] }
"#;

    fn parse(text: &str) -> Result<ProjectManifest, RelayError> {
        ProjectManifest::parse(text, Path::new("Relay.toml"))
    }

    #[test]
    fn test_parse_manifest() {
        let m = parse(SAMPLE).unwrap();
        assert_eq!(m.name, "embedded_c");
        assert_eq!(m.version, Version::new(0, 1, 0));
        assert!(m.toolchain.is_none());

        let names: Vec<&str> = m.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["zlib", "fmt", "curl"]);
        assert_eq!(m.dependencies[0].constraint, None);
        assert_eq!(m.dependencies[1].constraint.as_deref(), Some("10.1"));
        assert_eq!(m.dependencies[2].features, ["ssl"]);
    }

    #[test]
    fn test_missing_package_is_corrupt() {
        let err = parse("[dependencies]\nzlib = \"*\"\n").unwrap_err();
        assert!(matches!(err, RelayError::ManifestCorrupt { .. }));
    }

    #[test]
    fn test_bad_version_is_corrupt() {
        let err = parse("[package]\nname = \"a\"\nversion = \"one\"\n").unwrap_err();
        assert!(matches!(err, RelayError::ManifestCorrupt { .. }));
    }

    #[test]
    fn test_case_insensitive_duplicate_is_corrupt() {
        let text = "[package]\nname = \"a\"\nversion = \"0.1.0\"\n[dependencies]\nzlib = \"*\"\nZLIB = \"*\"\n";
        assert!(matches!(
            parse(text).unwrap_err(),
            RelayError::ManifestCorrupt { .. }
        ));
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_project_name("embedded_c").is_ok());
        assert!(validate_project_name("my-app2").is_ok());
        assert!(validate_project_name("2fast").is_err());
        assert!(validate_project_name("../evil").is_err());
        assert!(validate_project_name("").is_err());

        assert_eq!(normalize_dependency_name("ZLib").unwrap(), "zlib");
        assert!(normalize_dependency_name("nlohmann_json").is_err());
    }

    #[test]
    fn test_add_rejects_duplicate_case_insensitively() {
        let mut m = parse(SAMPLE).unwrap();
        let err = m.add_dependency(Dependency::new("FMT").unwrap()).unwrap_err();
        assert!(matches!(err, RelayError::DuplicateDependency { .. }));
        assert_eq!(m.dependencies.len(), 3);
    }

    #[test]
    fn test_remove_missing_dependency() {
        let mut m = parse(SAMPLE).unwrap();
        assert!(matches!(
            m.remove_dependency("sqlite3").unwrap_err(),
            RelayError::DependencyNotFound { .. }
        ));
        assert_eq!(m.remove_dependency("Zlib").unwrap().name, "zlib");
    }

    #[test]
    fn test_render_keeps_comments_and_untouched_entries() {
        let mut m = parse(SAMPLE).unwrap();
        m.remove_dependency("fmt").unwrap();
        m.add_dependency(Dependency::new("sqlite3").unwrap()).unwrap();
        m.toolchain = Some("x64-linux".to_string());

        let out = m.render(Some(SAMPLE));
        assert!(out.starts_with("# my project"));
        assert!(out.contains("zlib = \"*\"   # compression"));
        assert!(!out.contains("fmt"));
        assert!(out.contains("sqlite3 = \"*\""));
        assert!(out.contains("toolchain = \"x64-linux\""));

        assert_eq!(parse(&out).unwrap(), m);
    }

    #[test]
    fn test_render_without_changes_is_identity() {
        let m = parse(SAMPLE).unwrap();
        assert_eq!(m.render(Some(SAMPLE)), SAMPLE);
    }

    #[test]
    fn test_render_fresh_manifest() {
        let m = ProjectManifest::new("embedded_c").unwrap();
        let out = m.render(None);
        let back = parse(&out).unwrap();
        assert_eq!(back.version.to_string(), "0.1.0");
        assert!(back.dependencies.is_empty());
    }

    #[test]
    fn test_constraint_satisfaction() {
        let any = Dependency::new("zlib").unwrap();
        assert!(any.is_satisfied_by("1.3.1"));

        let fmt = Dependency::new("fmt").unwrap().with_constraint(Some("10.1"));
        assert!(fmt.is_satisfied_by("10.2.1"));
        assert!(fmt.is_satisfied_by("10.1#2"));
        assert!(!fmt.is_satisfied_by("9.1.0"));
        // date-style versions are left to the provider
        assert!(fmt.is_satisfied_by("2024-01-15"));
    }
}
