//! `relay new` command

use anyhow::Result;

use crate::cli::NewArgs;
use crate::GlobalOptions;
use relay::ops::{new_project, NewOptions};
use relay::util::{GlobalContext, Status};

pub fn execute(args: NewArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ctx = GlobalContext::new()?;

    let created = new_project(ctx.cwd(), &NewOptions { name: args.name.clone() })?;

    shell.status(
        Status::Created,
        format!("binary (application) `{}` package", args.name),
    );
    for file in &created.files {
        if let Ok(relative) = file.strip_prefix(&created.root) {
            tracing::debug!("wrote {}", relative.display());
        }
    }

    shell.note("next steps:");
    shell.note(format!("  cd {}", args.name));
    shell.note("  relay add <port>     # declare and install a dependency");
    shell.note("  relay run            # build and run");

    Ok(())
}
