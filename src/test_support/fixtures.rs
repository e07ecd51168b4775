//! Test fixtures for creating sample projects.

use std::path::{Path, PathBuf};

use crate::core::manifest::MANIFEST_FILE;

/// Relay.toml text with the given dependencies (`name = "constraint"`).
pub fn relay_toml(name: &str, deps: &[(&str, &str)]) -> String {
    let mut out = format!("[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n\n[dependencies]\n");
    for (dep, constraint) in deps {
        out.push_str(&format!("{dep} = \"{constraint}\"\n"));
    }
    out
}

/// Write a minimal project (manifest plus a marker-free CMakeLists.txt).
pub fn create_project(dir: &Path, name: &str, deps: &[(&str, &str)]) -> PathBuf {
    std::fs::create_dir_all(dir).expect("failed to create project dir");
    std::fs::write(dir.join(MANIFEST_FILE), relay_toml(name, deps))
        .expect("failed to write Relay.toml");
    std::fs::write(
        dir.join("CMakeLists.txt"),
        format!("cmake_minimum_required(VERSION 3.15)\nproject({name} C)\nadd_executable({name} src/main.c)\n"),
    )
    .expect("failed to write CMakeLists.txt");
    dir.to_path_buf()
}

/// Write a lock-manifest with `(name, version, triplet)` entries.
pub fn write_lock(dir: &Path, entries: &[(&str, &str, &str)]) {
    let installed: Vec<serde_json::Value> = entries
        .iter()
        .map(|(name, version, triplet)| {
            serde_json::json!({"name": name, "version": version, "triplet": triplet})
        })
        .collect();
    let doc = serde_json::json!({
        "name": "fixture",
        "dependencies": entries.iter().map(|e| e.0).collect::<Vec<_>>(),
        "$relay-installed": installed,
    });
    std::fs::write(
        dir.join("vcpkg.json"),
        serde_json::to_string_pretty(&doc).expect("fixture json"),
    )
    .expect("failed to write vcpkg.json");
}

/// Create a directory that passes vcpkg root validation.
pub fn fake_vcpkg_root(parent: &Path) -> PathBuf {
    let root = parent.join("vcpkg");
    std::fs::create_dir_all(root.join("scripts/buildsystems")).expect("failed to create vcpkg root");
    std::fs::write(root.join(".vcpkg-root"), "").expect("failed to write .vcpkg-root");
    std::fs::write(root.join("scripts/buildsystems/vcpkg.cmake"), "# toolchain\n")
        .expect("failed to write vcpkg.cmake");
    root
}
