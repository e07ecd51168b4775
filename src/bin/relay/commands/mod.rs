//! Command implementations

pub mod add;
pub mod build;
pub mod clean;
pub mod install;
pub mod new;
pub mod remove;
pub mod run;
pub mod update;

use anyhow::Result;

use relay::ops::Project;
use relay::util::GlobalContext;

/// Discover the project around the working directory.
pub fn open_project() -> Result<(GlobalContext, Project)> {
    let gctx = GlobalContext::new()?;
    let project = Project::open(&gctx)?;
    Ok((gctx, project))
}
