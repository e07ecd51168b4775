//! The project an operation works on.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::integration::sync_cmakelists;
use crate::core::triplet::HostInfo;
use crate::core::{ManifestStore, ProjectManifest, ResolvedTriplet, ToolchainResolver};
use crate::sources::vcpkg::{self, Vcpkg};
use crate::util::config::Config;
use crate::util::process::CommandRunner;
use crate::util::shell::Shell;
use crate::util::GlobalContext;

/// A discovered project with its merged configuration.
#[derive(Debug, Clone)]
pub struct Project {
    pub store: ManifestStore,
    pub config: Config,
    provider_root: Option<PathBuf>,
    host: HostInfo,
}

impl Project {
    /// Discover the project around the working directory.
    pub fn open(gctx: &GlobalContext) -> Result<Self> {
        let store = ManifestStore::discover(gctx.cwd())?;
        let config = gctx.config_for(store.root());
        let provider_root = vcpkg::locate_root(
            config.provider.root.as_deref(),
            gctx.env().provider_root.as_deref(),
        );

        Ok(Project {
            store,
            config,
            provider_root,
            host: HostInfo::current(),
        })
    }

    /// Override the located provider root.
    pub fn with_provider_root(mut self, root: Option<PathBuf>) -> Self {
        self.provider_root = root;
        self
    }

    /// Override host detection.
    pub fn with_host(mut self, host: HostInfo) -> Self {
        self.host = host;
        self
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn provider_root(&self) -> Option<&Path> {
        self.provider_root.as_deref()
    }

    /// The vcpkg provider for this project.
    pub fn provider<'a>(&self, runner: &'a dyn CommandRunner) -> Vcpkg<'a> {
        Vcpkg::new(runner, self.provider_root.clone(), self.root())
    }

    /// Resolve the triplet for this invocation.
    pub fn resolve_triplet(
        &self,
        gctx: &GlobalContext,
        manifest: &ProjectManifest,
        flag: Option<&str>,
    ) -> Result<ResolvedTriplet> {
        let resolved = ToolchainResolver::new(self.host.clone())
            .with_env_default(gctx.env().default_triplet.clone())
            .with_manifest_default(manifest.toolchain.clone())
            .resolve(flag)?;
        tracing::debug!("using triplet {} from {}", resolved.triplet, resolved.source);
        Ok(resolved)
    }

    /// Build directory for one triplet.
    pub fn build_dir(&self, resolved: &ResolvedTriplet) -> PathBuf {
        self.store.build_root().join(resolved.triplet.dir_name())
    }

    /// Rewrite the CMakeLists.txt marker blocks, reporting warnings.
    ///
    /// Failures here never fail the operation that triggered the rewrite.
    pub fn wire_cmakelists(&self, manifest: &ProjectManifest, shell: &Shell) {
        match sync_cmakelists(self.root(), manifest) {
            Ok(report) => {
                for warning in report.warnings() {
                    shell.warn(warning);
                }
            }
            Err(e) => shell.warn(format!("could not update CMakeLists.txt: {:#}", e)),
        }
    }
}
