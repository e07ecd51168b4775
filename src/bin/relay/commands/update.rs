//! `relay update` command

use anyhow::Result;

use crate::cli::UpdateArgs;
use crate::commands::open_project;
use crate::GlobalOptions;
use relay::ops::{update, UpdateOptions};
use relay::util::SystemRunner;

pub fn execute(args: UpdateArgs, global_opts: &GlobalOptions) -> Result<()> {
    let (gctx, project) = open_project()?;

    let opts = UpdateOptions {
        name: args.name,
        toolchain: global_opts.toolchain.clone(),
    };
    update(&gctx, &project, &SystemRunner, &global_opts.shell, &opts)?;

    Ok(())
}
