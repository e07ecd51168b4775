//! Implementation of `relay clean`.

use std::path::PathBuf;

use anyhow::Result;

use crate::ops::project::Project;
use crate::util::fs;
use crate::util::shell::{Shell, Status};

/// Options for the clean command.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Also purge the per-project dependency cache
    pub all: bool,
}

/// Remove build output, and with `all` the installed dependencies too.
///
/// Missing directories are not an error. Returns the directories that were
/// actually removed.
pub fn clean(project: &Project, shell: &Shell, opts: &CleanOptions) -> Result<Vec<PathBuf>> {
    let mut targets = vec![project.store.build_root()];
    if opts.all {
        targets.push(project.store.install_root());
    }

    let mut removed = Vec::new();
    for dir in targets {
        if fs::remove_dir_all_if_exists(&dir)? {
            shell.status(Status::Removed, dir.display());
            removed.push(dir);
        } else {
            tracing::debug!("{} does not exist", dir.display());
        }
    }

    if opts.all {
        let cleared = project.store.update_lock(|lock| {
            let had_entries = !lock.is_empty();
            lock.clear();
            Ok(had_entries)
        })?;
        if cleared {
            tracing::debug!("cleared installed entries in {}", project.store.lock_path().display());
        }
    }

    if removed.is_empty() {
        shell.status(Status::Fresh, "nothing to clean");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::relay_build::{build, BuildOptions};
    use crate::test_support::{
        create_project, fake_vcpkg_root, write_lock, CommandPattern, Expectation, MockRunner,
    };
    use crate::util::process::ToolOutput;
    use crate::util::GlobalContext;
    use tempfile::TempDir;

    #[test]
    fn test_clean_build_keeps_dependencies() {
        let tmp = TempDir::new().unwrap();
        let root = create_project(&tmp.path().join("demo"), "demo", &[("zlib", "*")]);
        write_lock(&root, &[("zlib", "1.3.1", "x64-linux")]);
        std::fs::create_dir_all(root.join("vcpkg_installed/x64-linux/include")).unwrap();
        let vcpkg = fake_vcpkg_root(tmp.path());
        let gctx = GlobalContext::with_cwd(&root);
        let project = Project::open(&gctx).unwrap().with_provider_root(Some(vcpkg));

        let runner = MockRunner::new();
        runner.expect(
            Expectation::new(CommandPattern::Contains(" -S ".to_string()), ToolOutput::success(""))
                .creates(root.join("build/x64_linux/CMakeCache.txt"), ""),
        );
        runner.succeed("--build");
        let opts = BuildOptions {
            toolchain: Some("x64-linux".to_string()),
        };
        build(&gctx, &project, &runner, &Shell::quiet(), &opts).unwrap();

        let removed = clean(&project, &Shell::quiet(), &CleanOptions::default()).unwrap();
        assert_eq!(removed, [root.join("build")]);
        assert!(root.join("vcpkg_installed/x64-linux/include").is_dir());

        runner.clear_calls();
        let rebuilt = build(&gctx, &project, &runner, &Shell::quiet(), &opts).unwrap();
        assert!(rebuilt.configured);
        assert_eq!(runner.count_matching("vcpkg install"), 0);
        assert_eq!(runner.count_matching("vcpkg remove"), 0);
    }

    #[test]
    fn test_clean_all_forgets_installs() {
        let tmp = TempDir::new().unwrap();
        let root = create_project(&tmp.path().join("demo"), "demo", &[("zlib", "*")]);
        write_lock(&root, &[("zlib", "1.3.1", "x64-linux")]);
        std::fs::create_dir_all(root.join("vcpkg_installed/x64-linux")).unwrap();
        std::fs::create_dir_all(root.join("build/x64_linux")).unwrap();
        let gctx = GlobalContext::with_cwd(&root);
        let project = Project::open(&gctx).unwrap();

        let removed = clean(&project, &Shell::quiet(), &CleanOptions { all: true }).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(project.store.load_lock().unwrap().is_empty());
        assert!(root.join("Relay.toml").is_file());
    }

    #[test]
    fn test_clean_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let root = create_project(&tmp.path().join("demo"), "demo", &[]);
        let gctx = GlobalContext::with_cwd(&root);
        let project = Project::open(&gctx).unwrap();

        for _ in 0..2 {
            let removed = clean(&project, &Shell::quiet(), &CleanOptions { all: true }).unwrap();
            assert!(removed.is_empty());
        }
        assert!(!root.join("vcpkg.json").exists());
    }
}
