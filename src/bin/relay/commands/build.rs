//! `relay build` command

use anyhow::Result;

use crate::commands::open_project;
use crate::GlobalOptions;
use relay::ops::{build, BuildOptions};
use relay::util::SystemRunner;

pub fn execute(global_opts: &GlobalOptions) -> Result<()> {
    let (gctx, project) = open_project()?;

    let opts = BuildOptions {
        toolchain: global_opts.toolchain.clone(),
    };
    build(&gctx, &project, &SystemRunner, &global_opts.shell, &opts)?;

    Ok(())
}
