//! Implementation of `relay update` and `relay install`.

use anyhow::Result;

use crate::core::{ProjectManifest, Triplet};
use crate::ops::project::Project;
use crate::sync::{SyncOp, SyncReport, Synchronizer};
use crate::util::process::CommandRunner;
use crate::util::shell::{Shell, Status};
use crate::util::GlobalContext;

/// Options for the update command.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Restrict the update to one declared dependency
    pub name: Option<String>,

    /// `--toolchain` override
    pub toolchain: Option<String>,
}

/// Options for the install command.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub toolchain: Option<String>,
}

/// Bring installed dependencies in line with Relay.toml.
///
/// Relay.toml is never written. Every provider operation that succeeded is
/// recorded in vcpkg.json even when a later one fails.
pub fn update(
    gctx: &GlobalContext,
    project: &Project,
    runner: &dyn CommandRunner,
    shell: &Shell,
    opts: &UpdateOptions,
) -> Result<SyncReport> {
    let mut manifest = project.store.load()?;
    let resolved = project.resolve_triplet(gctx, &manifest, opts.toolchain.as_deref())?;

    let report = synchronize(
        project,
        runner,
        shell,
        &mut manifest,
        &resolved.triplet,
        SyncOp::Update(opts.name.clone()),
    )?;
    print_report(shell, &report);
    project.wire_cmakelists(&manifest, shell);
    Ok(report)
}

/// Install every declared dependency for the resolved triplet.
pub fn install(
    gctx: &GlobalContext,
    project: &Project,
    runner: &dyn CommandRunner,
    shell: &Shell,
    opts: &InstallOptions,
) -> Result<SyncReport> {
    let mut manifest = project.store.load()?;
    let resolved = project.resolve_triplet(gctx, &manifest, opts.toolchain.as_deref())?;

    let report = synchronize(
        project,
        runner,
        shell,
        &mut manifest,
        &resolved.triplet,
        SyncOp::Install,
    )?;
    print_report(shell, &report);
    project.wire_cmakelists(&manifest, shell);
    Ok(report)
}

/// Run a lock-only synchronization, persisting vcpkg.json whenever it
/// changed, including on failure.
pub(crate) fn synchronize(
    project: &Project,
    runner: &dyn CommandRunner,
    shell: &Shell,
    manifest: &mut ProjectManifest,
    triplet: &Triplet,
    op: SyncOp,
) -> Result<SyncReport> {
    let mut lock = project.store.load_lock()?;
    let before = lock.clone();

    let provider = project.provider(runner);
    let result = Synchronizer::new(&provider, shell).sync(manifest, &mut lock, triplet, op);

    if lock != before {
        project.store.update_lock(|current| {
            current.replay(&before, &lock);
            Ok(())
        })?;
    }
    result
}

fn print_report(shell: &Shell, report: &SyncReport) {
    for warning in &report.warnings {
        shell.warn(warning);
    }
    for entry in &report.dropped_stale {
        shell.note(format!(
            "dropped {} ({}) installed for another triplet",
            entry.name, entry.triplet
        ));
    }
    for name in &report.removed {
        shell.status(Status::Removed, name);
    }
    for entry in &report.installed {
        shell.status(
            Status::Installed,
            format!("{} v{} ({})", entry.name, entry.version, entry.triplet),
        );
    }
    if report.provider_ops() == 0 {
        shell.status(Status::Fresh, "dependencies are up to date");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        create_project, fake_vcpkg_root, write_lock, CommandPattern, Expectation, MockRunner,
    };
    use crate::util::errors::{find_relay_error, RelayError};
    use crate::util::process::ToolOutput;
    use tempfile::TempDir;

    fn setup(tmp: &TempDir, deps: &[(&str, &str)]) -> (GlobalContext, Project) {
        let root = create_project(&tmp.path().join("demo"), "demo", deps);
        let vcpkg = fake_vcpkg_root(tmp.path());
        let gctx = GlobalContext::with_cwd(&root);
        let project = Project::open(&gctx).unwrap().with_provider_root(Some(vcpkg));
        (gctx, project)
    }

    fn linux() -> UpdateOptions {
        UpdateOptions {
            name: None,
            toolchain: Some("x64-linux".to_string()),
        }
    }

    #[test]
    fn test_second_update_makes_no_provider_calls() {
        let tmp = TempDir::new().unwrap();
        let (gctx, project) = setup(&tmp, &[("zlib", "*"), ("fmt", "*")]);
        let runner = MockRunner::new();
        runner.succeed("vcpkg install");

        let first = update(&gctx, &project, &runner, &Shell::quiet(), &linux()).unwrap();
        assert_eq!(first.provider_ops(), 2);

        runner.clear_calls();
        let second = update(&gctx, &project, &runner, &Shell::quiet(), &linux()).unwrap();
        assert_eq!(second.provider_ops(), 0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_unsatisfiable_constraint_does_not_reinstall_forever() {
        let tmp = TempDir::new().unwrap();
        let (gctx, project) = setup(&tmp, &[("fmt", "10.1")]);
        let metadata = project
            .root()
            .join("vcpkg_installed/x64-linux/share/fmt/vcpkg.json");
        let runner = MockRunner::new();
        runner.expect(
            Expectation::new(
                CommandPattern::Contains("vcpkg install".to_string()),
                ToolOutput::success(""),
            )
            .creates(&metadata, r#"{"name": "fmt", "version": "11.0.2"}"#),
        );

        let first = update(&gctx, &project, &runner, &Shell::quiet(), &linux()).unwrap();
        assert_eq!(first.installed.len(), 1);
        assert_eq!(first.installed[0].version, "11.0.2");

        runner.clear_calls();
        let second = update(&gctx, &project, &runner, &Shell::quiet(), &linux()).unwrap();
        assert_eq!(second.provider_ops(), 0);
        assert!(runner.calls().is_empty());
        assert_eq!(second.warnings.len(), 1);
        assert!(second.warnings[0].contains("11.0.2"));
    }

    #[test]
    fn test_update_removes_orphan_only() {
        let tmp = TempDir::new().unwrap();
        let (gctx, project) = setup(&tmp, &[("a", "*"), ("b", "*")]);
        write_lock(
            project.root(),
            &[
                ("a", "1.0.0", "x64-linux"),
                ("b", "1.0.0", "x64-linux"),
                ("c", "1.0.0", "x64-linux"),
            ],
        );
        let runner = MockRunner::new();
        runner.succeed("vcpkg remove");

        let report = update(&gctx, &project, &runner, &Shell::quiet(), &linux()).unwrap();
        assert_eq!(report.removed, ["c"]);
        assert_eq!(runner.count_matching("vcpkg remove"), 1);
        assert_eq!(runner.count_matching("vcpkg install"), 0);
        assert_eq!(project.store.load_lock().unwrap().entries().len(), 2);
    }

    #[test]
    fn test_partial_progress_is_persisted() {
        let tmp = TempDir::new().unwrap();
        let (gctx, project) = setup(&tmp, &[("a", "*"), ("b", "*")]);
        let manifest_before = std::fs::read_to_string(project.store.manifest_path()).unwrap();
        let runner = MockRunner::new();
        runner.succeed(" a:x64-linux");
        runner.fail(" b:x64-linux", "error: building b failed");

        let err = update(&gctx, &project, &runner, &Shell::quiet(), &linux()).unwrap_err();
        assert!(matches!(
            find_relay_error(&err),
            Some(RelayError::ProviderFailed { .. })
        ));

        let lock = project.store.load_lock().unwrap();
        assert_eq!(lock.entries().len(), 1);
        assert_eq!(lock.entries()[0].name, "a");
        assert_eq!(
            std::fs::read_to_string(project.store.manifest_path()).unwrap(),
            manifest_before
        );
    }

    #[test]
    fn test_update_unknown_name() {
        let tmp = TempDir::new().unwrap();
        let (gctx, project) = setup(&tmp, &[("zlib", "*")]);
        let runner = MockRunner::new();
        let opts = UpdateOptions {
            name: Some("fmt".to_string()),
            ..linux()
        };

        let err = update(&gctx, &project, &runner, &Shell::quiet(), &opts).unwrap_err();
        assert!(matches!(
            find_relay_error(&err),
            Some(RelayError::DependencyNotFound { .. })
        ));
    }

    #[test]
    fn test_install_switches_triplet() {
        let tmp = TempDir::new().unwrap();
        let (gctx, project) = setup(&tmp, &[("zlib", "*")]);
        write_lock(project.root(), &[("zlib", "1.3.1", "x64-osx")]);
        let runner = MockRunner::new();
        runner.succeed("vcpkg install");

        let opts = InstallOptions {
            toolchain: Some("x64-linux".to_string()),
        };
        let report = install(&gctx, &project, &runner, &Shell::quiet(), &opts).unwrap();

        assert_eq!(report.dropped_stale.len(), 1);
        let lock = project.store.load_lock().unwrap();
        assert_eq!(lock.entries().len(), 1);
        assert_eq!(lock.entries()[0].triplet, "x64-linux");
    }

    #[test]
    fn test_empty_project_needs_no_provider() {
        let tmp = TempDir::new().unwrap();
        let (gctx, project) = setup(&tmp, &[]);
        let project = project.with_provider_root(None);
        let runner = MockRunner::new();

        let report = install(&gctx, &project, &runner, &Shell::quiet(), &InstallOptions::default())
            .unwrap();
        assert_eq!(report.provider_ops(), 0);
        assert!(runner.calls().is_empty());
    }
}
