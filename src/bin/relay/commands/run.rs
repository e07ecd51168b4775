//! `relay run` command

use anyhow::Result;

use crate::cli::RunArgs;
use crate::commands::open_project;
use crate::GlobalOptions;
use relay::ops::{run, RunOptions};
use relay::util::SystemRunner;

/// Returns the program's exit code, to become relay's own.
pub fn execute(args: RunArgs, global_opts: &GlobalOptions) -> Result<i32> {
    let (gctx, project) = open_project()?;

    let opts = RunOptions {
        toolchain: global_opts.toolchain.clone(),
        args: args.args,
    };
    run(&gctx, &project, &SystemRunner, &global_opts.shell, &opts)
}
