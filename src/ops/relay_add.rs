//! Implementation of `relay add` and `relay remove`.

use anyhow::Result;

use crate::core::Dependency;
use crate::ops::project::Project;
use crate::sync::{SyncOp, SyncReport, Synchronizer};
use crate::util::process::CommandRunner;
use crate::util::shell::{Shell, Status};
use crate::util::GlobalContext;

/// Options for adding a dependency.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Port name
    pub name: String,

    /// Version constraint (`None` or `*` = any)
    pub version: Option<String>,

    /// Port features
    pub features: Vec<String>,

    /// `--toolchain` override
    pub toolchain: Option<String>,
}

/// Options for removing a dependency.
#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    pub name: String,
    pub toolchain: Option<String>,
}

/// Declare and install a dependency.
///
/// Nothing is written unless the install succeeds.
pub fn add_dependency(
    gctx: &GlobalContext,
    project: &Project,
    runner: &dyn CommandRunner,
    shell: &Shell,
    opts: &AddOptions,
) -> Result<SyncReport> {
    let dep = Dependency::new(&opts.name)?
        .with_constraint(opts.version.as_deref())
        .with_features(opts.features.clone());

    let mut manifest = project.store.load()?;
    let mut lock = project.store.load_lock()?;
    let before = lock.clone();
    let resolved = project.resolve_triplet(gctx, &manifest, opts.toolchain.as_deref())?;

    let provider = project.provider(runner);
    let report = Synchronizer::new(&provider, shell).sync(
        &mut manifest,
        &mut lock,
        &resolved.triplet,
        SyncOp::Add(dep.clone()),
    )?;

    project
        .store
        .update_lock(|current| {
            current.replay(&before, &lock);
            Ok(())
        })?;
    let manifest = project.store.update(|m| {
        if m.find_dependency(&dep.name).is_none() {
            m.add_dependency(dep)?;
        }
        Ok(m.clone())
    })?;

    for warning in &report.warnings {
        shell.warn(warning);
    }
    for entry in &report.installed {
        shell.status(
            Status::Added,
            format!("{} v{} ({})", entry.name, entry.version, entry.triplet),
        );
    }
    project.wire_cmakelists(&manifest, shell);

    Ok(report)
}

/// Undeclare a dependency and uninstall it.
///
/// The manifest change is always committed; a failed uninstall is only a
/// warning.
pub fn remove_dependency(
    gctx: &GlobalContext,
    project: &Project,
    runner: &dyn CommandRunner,
    shell: &Shell,
    opts: &RemoveOptions,
) -> Result<SyncReport> {
    let mut manifest = project.store.load()?;
    let mut lock = project.store.load_lock()?;
    let before = lock.clone();
    let resolved = project.resolve_triplet(gctx, &manifest, opts.toolchain.as_deref())?;

    let provider = project.provider(runner);
    let report = Synchronizer::new(&provider, shell).sync(
        &mut manifest,
        &mut lock,
        &resolved.triplet,
        SyncOp::Remove(opts.name.clone()),
    )?;

    let manifest = project.store.update(|m| {
        if m.find_dependency(&opts.name).is_some() {
            m.remove_dependency(&opts.name)?;
        }
        Ok(m.clone())
    })?;
    if report.changed_lock() {
        project.store.update_lock(|current| {
            current.replay(&before, &lock);
            Ok(())
        })?;
    }

    for warning in &report.warnings {
        shell.warn(warning);
    }
    shell.status(Status::Removed, &opts.name);
    project.wire_cmakelists(&manifest, shell);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_project, fake_vcpkg_root, write_lock, MockRunner};
    use crate::util::errors::{find_relay_error, RelayError};
    use tempfile::TempDir;

    struct Setup {
        _tmp: TempDir,
        gctx: GlobalContext,
        project: Project,
    }

    fn setup(deps: &[(&str, &str)]) -> Setup {
        let tmp = TempDir::new().unwrap();
        let root = create_project(&tmp.path().join("demo"), "demo", deps);
        let vcpkg = fake_vcpkg_root(tmp.path());
        let gctx = GlobalContext::with_cwd(&root);
        let project = Project::open(&gctx).unwrap().with_provider_root(Some(vcpkg));
        Setup {
            _tmp: tmp,
            gctx,
            project,
        }
    }

    fn add_opts(name: &str) -> AddOptions {
        AddOptions {
            name: name.to_string(),
            toolchain: Some("x64-linux".to_string()),
            ..AddOptions::default()
        }
    }

    fn remove_opts(name: &str) -> RemoveOptions {
        RemoveOptions {
            name: name.to_string(),
            toolchain: Some("x64-linux".to_string()),
        }
    }

    #[test]
    fn test_add_writes_both_manifests() {
        let s = setup(&[]);
        let runner = MockRunner::new();
        runner.succeed("vcpkg install");

        let mut opts = add_opts("zlib");
        opts.version = Some("1.3".to_string());
        add_dependency(&s.gctx, &s.project, &runner, &Shell::quiet(), &opts).unwrap();

        let manifest = s.project.store.load().unwrap();
        assert_eq!(manifest.dependencies.len(), 1);
        assert_eq!(manifest.dependencies[0].constraint.as_deref(), Some("1.3"));

        let lock = s.project.store.load_lock().unwrap();
        let entry = &lock.entries()[0];
        assert_eq!((entry.name.as_str(), entry.version.as_str()), ("zlib", "1.3"));
        assert_eq!(entry.triplet, "x64-linux");
    }

    #[test]
    fn test_failed_add_changes_nothing() {
        let s = setup(&[]);
        let manifest_before = std::fs::read_to_string(s.project.store.manifest_path()).unwrap();
        let runner = MockRunner::new();
        runner.fail("vcpkg install", "error: no such port");

        let err =
            add_dependency(&s.gctx, &s.project, &runner, &Shell::quiet(), &add_opts("nosuch"))
                .unwrap_err();
        assert!(matches!(
            find_relay_error(&err),
            Some(RelayError::ProviderFailed { .. })
        ));
        assert_eq!(
            std::fs::read_to_string(s.project.store.manifest_path()).unwrap(),
            manifest_before
        );
        assert!(!s.project.store.lock_path().exists());
    }

    #[test]
    fn test_duplicate_add_makes_no_provider_call() {
        let s = setup(&[("zlib", "*")]);
        let runner = MockRunner::new();

        let err = add_dependency(&s.gctx, &s.project, &runner, &Shell::quiet(), &add_opts("ZLIB"))
            .unwrap_err();
        assert!(matches!(
            find_relay_error(&err),
            Some(RelayError::DuplicateDependency { .. })
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_remove_commits_despite_uninstall_failure() {
        let s = setup(&[("zlib", "*")]);
        write_lock(s.project.root(), &[("zlib", "1.3.1", "x64-linux")]);
        let runner = MockRunner::new();
        runner.fail("vcpkg remove", "error: locked by another process");

        let report =
            remove_dependency(&s.gctx, &s.project, &runner, &Shell::quiet(), &remove_opts("zlib"))
                .unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(s.project.store.load().unwrap().dependencies.is_empty());
        assert_eq!(s.project.store.load_lock().unwrap().entries().len(), 1);
    }

    #[test]
    fn test_remove_unknown_dependency() {
        let s = setup(&[]);
        let runner = MockRunner::new();

        let err =
            remove_dependency(&s.gctx, &s.project, &runner, &Shell::quiet(), &remove_opts("zlib"))
                .unwrap_err();
        assert!(matches!(
            find_relay_error(&err),
            Some(RelayError::DependencyNotFound { .. })
        ));
    }

    #[test]
    fn test_add_wires_cmakelists() {
        let s = setup(&[]);
        std::fs::write(
            s.project.root().join("CMakeLists.txt"),
            "project(demo C)\n# relay:find-begin\n# relay:find-end\n# relay:link-begin\n# relay:link-end\n",
        )
        .unwrap();
        let runner = MockRunner::new();
        runner.succeed("vcpkg install");

        add_dependency(&s.gctx, &s.project, &runner, &Shell::quiet(), &add_opts("fmt")).unwrap();

        let cmake = std::fs::read_to_string(s.project.root().join("CMakeLists.txt")).unwrap();
        assert!(cmake.contains("  find_package(fmt CONFIG REQUIRED)\n"));
        assert!(cmake.contains("  target_link_libraries(demo PRIVATE fmt::fmt)\n"));
    }
}
