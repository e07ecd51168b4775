//! Shared utilities

pub mod config;
pub mod context;
pub mod errors;
pub mod fs;
pub mod hash;
pub mod interrupt;
pub mod process;
pub mod shell;

pub use config::Config;
pub use context::GlobalContext;
pub use errors::{ErrorKind, RelayError};
pub use process::{CommandRunner, ProcessBuilder, SystemRunner, ToolOutput};
pub use shell::{Shell, Status};
