//! Implementation of `relay build`.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::{BuildRequest, CMake, CMakeSettings, Orchestrator};
use crate::core::ResolvedTriplet;
use crate::ops::project::Project;
use crate::ops::relay_update::synchronize;
use crate::sources::Provider;
use crate::sync::{needs_install, SyncOp};
use crate::util::process::CommandRunner;
use crate::util::shell::{Shell, Status};
use crate::util::GlobalContext;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// `--toolchain` override
    pub toolchain: Option<String>,
}

/// A finished build.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub name: String,
    pub triplet: ResolvedTriplet,
    pub build_dir: PathBuf,
    pub build_type: String,
    /// Whether configure ran (false when the previous configure was reused)
    pub configured: bool,
    /// Whether a bulk dependency install ran first
    pub installed: bool,
}

/// Install missing dependencies if needed, then configure and build.
///
/// On success the resolved triplet becomes the manifest's `toolchain`.
pub fn build(
    gctx: &GlobalContext,
    project: &Project,
    runner: &dyn CommandRunner,
    shell: &Shell,
    opts: &BuildOptions,
) -> Result<BuildResult> {
    let mut manifest = project.store.load()?;
    let resolved = project.resolve_triplet(gctx, &manifest, opts.toolchain.as_deref())?;
    let triplet = &resolved.triplet;

    let lock = project.store.load_lock()?;
    let installed = needs_install(&manifest.dependencies, &lock, triplet);
    if installed {
        shell.status(Status::Resolving, format!("dependencies for {}", triplet));
        let report = synchronize(project, runner, shell, &mut manifest, triplet, SyncOp::Install)?;
        for entry in &report.installed {
            shell.status(
                Status::Installed,
                format!("{} v{} ({})", entry.name, entry.version, entry.triplet),
            );
        }
        project.wire_cmakelists(&manifest, shell);
    }

    let provider = project.provider(runner);
    let toolchain_file = provider.toolchain_file();
    let installed_dir = provider.install_root();
    if toolchain_file.is_none() {
        tracing::debug!("no vcpkg root; configuring without a toolchain file");
    }

    let cmake = CMake::new(runner, CMakeSettings::from(&project.config.build));
    let build_dir = project.build_dir(&resolved);
    let request = BuildRequest {
        project_root: project.root(),
        build_dir: &build_dir,
        manifest: &manifest,
        triplet,
        toolchain_file: toolchain_file.as_deref(),
        installed_dir: &installed_dir,
    };
    let outcome = Orchestrator::new(&cmake, shell).build(&request)?;

    if manifest.toolchain.as_deref() != Some(triplet.as_str()) {
        project.store.update(|m| {
            m.toolchain = Some(triplet.to_string());
            Ok(())
        })?;
    }

    let build_type = project.config.build.build_type().to_string();
    shell.status(
        Status::Finished,
        format!("{} ({}) in {}", build_type, triplet, outcome.build_dir.display()),
    );

    Ok(BuildResult {
        name: manifest.name,
        triplet: resolved,
        build_dir: outcome.build_dir,
        build_type,
        configured: outcome.configured,
        installed,
    })
}
