//! `relay remove` command

use anyhow::Result;

use crate::cli::RemoveArgs;
use crate::commands::open_project;
use crate::GlobalOptions;
use relay::ops::{remove_dependency, RemoveOptions};
use relay::util::SystemRunner;

pub fn execute(args: RemoveArgs, global_opts: &GlobalOptions) -> Result<()> {
    let (gctx, project) = open_project()?;

    let opts = RemoveOptions {
        name: args.name,
        toolchain: global_opts.toolchain.clone(),
    };
    remove_dependency(&gctx, &project, &SystemRunner, &global_opts.shell, &opts)?;

    Ok(())
}
