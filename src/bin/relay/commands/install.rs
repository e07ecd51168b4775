//! `relay install` command

use anyhow::Result;

use crate::commands::open_project;
use crate::GlobalOptions;
use relay::ops::{install, InstallOptions};
use relay::util::SystemRunner;

pub fn execute(global_opts: &GlobalOptions) -> Result<()> {
    let (gctx, project) = open_project()?;

    let opts = InstallOptions {
        toolchain: global_opts.toolchain.clone(),
    };
    install(&gctx, &project, &SystemRunner, &global_opts.shell, &opts)?;

    Ok(())
}
