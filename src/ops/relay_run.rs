//! Implementation of `relay run`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::ops::project::Project;
use crate::ops::relay_build::{build, BuildOptions};
use crate::util::errors::RelayError;
use crate::util::process::{CommandRunner, ProcessBuilder};
use crate::util::shell::{Shell, Status};
use crate::util::GlobalContext;

/// Exit code reported for a program stopped by Ctrl-C.
const INTERRUPTED_EXIT: i32 = 130;

/// Options for the run command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// `--toolchain` override
    pub toolchain: Option<String>,

    /// Arguments passed to the program
    pub args: Vec<String>,
}

/// Where the binary may be, in search order.
pub fn binary_candidates(build_dir: &Path, name: &str, build_type: &str, windows: bool) -> Vec<PathBuf> {
    let file = if windows {
        format!("{name}.exe")
    } else {
        name.to_string()
    };
    vec![build_dir.join(&file), build_dir.join(build_type).join(&file)]
}

/// Build, then execute the project's binary.
///
/// Returns the program's exit code; a program killed by a signal reports 1,
/// or 130 when relay itself was interrupted.
pub fn run(
    gctx: &GlobalContext,
    project: &Project,
    runner: &dyn CommandRunner,
    shell: &Shell,
    opts: &RunOptions,
) -> Result<i32> {
    let built = build(
        gctx,
        project,
        runner,
        shell,
        &BuildOptions {
            toolchain: opts.toolchain.clone(),
        },
    )?;

    let expected = binary_candidates(
        &built.build_dir,
        &built.name,
        &built.build_type,
        built.triplet.triplet.is_windows(),
    );
    let found = expected.iter().position(|p| p.is_file());
    let Some(index) = found else {
        return Err(RelayError::BinaryNotFound { expected }.into());
    };
    let binary = expected[index].clone();

    let cmd = ProcessBuilder::new(&binary)
        .args(&opts.args)
        .cwd(project.root())
        .inherit_stdio();
    shell.status(Status::Running, format!("`{}`", cmd.display_command()));

    let output = runner.run(&cmd).map_err(|e| RelayError::LaunchFailed {
        path: binary.clone(),
        reason: format!("{:#}", e),
    })?;

    let code = match output.code {
        Some(code) => code,
        None if output.interrupted => INTERRUPTED_EXIT,
        None => 1,
    };
    tracing::debug!("{} exited with {}", binary.display(), code);
    Ok(code)
}
