//! `relay clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use crate::commands::open_project;
use crate::GlobalOptions;
use relay::ops::{clean, CleanOptions};

pub fn execute(args: CleanArgs, global_opts: &GlobalOptions) -> Result<()> {
    let (_gctx, project) = open_project()?;

    clean(&project, &global_opts.shell, &CleanOptions { all: args.all })?;

    Ok(())
}
