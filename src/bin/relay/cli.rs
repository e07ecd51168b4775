//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};

/// relay - a package manager and build driver for C/C++ projects
#[derive(Parser)]
#[command(name = "relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target triplet, e.g. x64-linux or arm64-osx
    #[arg(long, global = true, value_name = "TRIPLET")]
    pub toolchain: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Print only errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new relay project
    New(NewArgs),

    /// Install missing dependencies, configure and build
    #[command(visible_alias = "b")]
    Build,

    /// Build, then run the project's binary
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Install every declared dependency for the triplet
    #[command(visible_alias = "i")]
    Install,

    /// Add a dependency to Relay.toml and install it
    Add(AddArgs),

    /// Remove a dependency from Relay.toml and uninstall it
    #[command(visible_alias = "rm")]
    Remove(RemoveArgs),

    /// Bring installed dependencies in line with Relay.toml
    Update(UpdateArgs),

    /// Remove build output
    Clean(CleanArgs),
}

#[derive(Args)]
pub struct NewArgs {
    /// Project name, also the directory created
    pub name: String,
}

#[derive(Args)]
pub struct RunArgs {
    /// Arguments passed to the program
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Port name
    pub name: String,

    /// Version constraint
    #[arg(long)]
    pub version: Option<String>,

    /// Port features to enable
    #[arg(long, value_delimiter = ',')]
    pub features: Vec<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Port name
    pub name: String,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Only update this dependency
    pub name: Option<String>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Also remove installed dependencies
    #[arg(long)]
    pub all: bool,
}
