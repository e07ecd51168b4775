//! Implementation of `relay new`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::integration::{CMAKELISTS_FILE, FIND_BEGIN, FIND_END, LINK_BEGIN, LINK_END};
use crate::core::manifest::{validate_project_name, MANIFEST_FILE};
use crate::core::store::{BUILD_DIR, INSTALL_DIR};
use crate::core::{LockManifest, ManifestStore, ProjectManifest};
use crate::util::errors::RelayError;
use crate::util::fs;

/// Options for creating a new project.
#[derive(Debug, Clone)]
pub struct NewOptions {
    /// Project name, also the directory name
    pub name: String,
}

/// What `relay new` created.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Create a new project in `parent/<name>`.
pub fn new_project(parent: &Path, opts: &NewOptions) -> Result<NewProject> {
    validate_project_name(&opts.name)?;

    let root = parent.join(&opts.name);
    if root.exists() {
        return Err(RelayError::DestinationExists { path: root }.into());
    }
    fs::ensure_dir(&root)?;

    let name = opts.name.as_str();
    let mut files = Vec::new();
    let mut write = |relative: &str, content: &str| -> Result<()> {
        let path = root.join(relative);
        fs::write_string(&path, content)?;
        files.push(path);
        Ok(())
    };

    write("src/main.c", &main_c(name))?;
    write(&format!("include/{name}.h"), &header(name))?;
    write(CMAKELISTS_FILE, &cmakelists(name))?;
    write(".gitignore", &gitignore())?;
    write(".clang-format", CLANG_FORMAT)?;

    let store = ManifestStore::at(&root);
    let manifest = ProjectManifest::new(name)?;
    store
        .save(&manifest)
        .with_context(|| format!("failed to write {MANIFEST_FILE}"))?;
    store.save_lock(&LockManifest::for_project(name))?;
    files.push(store.manifest_path());
    files.push(store.lock_path());

    tracing::debug!("created {} files in {}", files.len(), root.display());
    Ok(NewProject { root, files })
}

/// Include guard for `name`'s header.
fn include_guard(name: &str) -> String {
    let mut guard: String = name
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    guard.push_str("_H");
    guard
}

fn main_c(name: &str) -> String {
    format!(
        r#"#include <stdio.h>

#include "{name}.h"

int main(void) {{
    printf("%s\n", {guard}_GREETING);
    return 0;
}}
"#,
        guard = include_guard(name)
    )
}

fn header(name: &str) -> String {
    let guard = include_guard(name);
    format!(
        r#"#ifndef {guard}
#define {guard}

#define {guard}_GREETING "Hello from {name}!"

#endif /* {guard} */
"#
    )
}

fn cmakelists(name: &str) -> String {
    format!(
        r#"cmake_minimum_required(VERSION 3.15)
project({name} VERSION 0.1.0 LANGUAGES C)

set(CMAKE_C_STANDARD 11)
set(CMAKE_C_STANDARD_REQUIRED ON)

include_directories(include)

file(GLOB_RECURSE SOURCE_FILES CONFIGURE_DEPENDS src/*.c)

add_executable({name} ${{SOURCE_FILES}})

# Managed by relay: dependencies from Relay.toml are written between markers.
{FIND_BEGIN}
{FIND_END}

{LINK_BEGIN}
{LINK_END}

install(TARGETS {name} DESTINATION bin)
"#
    )
}

fn gitignore() -> String {
    format!("{BUILD_DIR}/\n{INSTALL_DIR}/\n")
}

const CLANG_FORMAT: &str = "BasedOnStyle: Google
UseTab: Never
IndentWidth: 4
TabWidth: 4
";
