//! `relay add` command

use anyhow::Result;

use crate::cli::AddArgs;
use crate::commands::open_project;
use crate::GlobalOptions;
use relay::ops::{add_dependency, AddOptions};
use relay::util::SystemRunner;

pub fn execute(args: AddArgs, global_opts: &GlobalOptions) -> Result<()> {
    let (gctx, project) = open_project()?;

    let opts = AddOptions {
        name: args.name,
        version: args.version,
        features: args.features,
        toolchain: global_opts.toolchain.clone(),
    };
    add_dependency(&gctx, &project, &SystemRunner, &global_opts.shell, &opts)?;

    Ok(())
}
