//! High-level operations.
//!
//! This module contains the implementation of relay commands.

pub mod project;
pub mod relay_add;
pub mod relay_build;
pub mod relay_clean;
pub mod relay_new;
pub mod relay_run;
pub mod relay_update;

pub use project::Project;
pub use relay_add::{add_dependency, remove_dependency, AddOptions, RemoveOptions};
pub use relay_build::{build, BuildOptions, BuildResult};
pub use relay_clean::{clean, CleanOptions};
pub use relay_new::{new_project, NewOptions, NewProject};
pub use relay_run::{run, RunOptions};
pub use relay_update::{install, update, InstallOptions, UpdateOptions};
