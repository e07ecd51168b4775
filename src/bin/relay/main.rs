//! relay CLI - a package manager and build driver for C/C++

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use relay::util::errors::find_relay_error;
use relay::util::{interrupt, Shell};
use relay::Triplet;

/// Environment variable overriding the log filter.
const LOG_ENV: &str = "RELAY_LOG";

/// Exit code for failures that carry no classification.
const UNCLASSIFIED_EXIT: i32 = 1;

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Shell,
    pub toolchain: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.no_color);

    let global_opts = GlobalOptions {
        shell: Shell::from_flags(cli.quiet, cli.verbose, cli.no_color),
        toolchain: cli.toolchain.clone(),
    };

    match run(cli.command, &global_opts) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let code = report(&global_opts.shell, &e);
            std::process::exit(code);
        }
    }
}

fn init_logging(verbose: bool, no_color: bool) {
    let default = if verbose { "relay=debug" } else { "relay=info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .without_time()
        .init();
}

fn run(command: Commands, global_opts: &GlobalOptions) -> Result<i32> {
    // A malformed flag is rejected before any verb touches the disk.
    if let Some(toolchain) = &global_opts.toolchain {
        Triplet::parse(toolchain)?;
    }

    if let Err(e) = interrupt::install_handler() {
        tracing::warn!("{:#}", e);
    }

    match command {
        Commands::New(args) => commands::new::execute(args, global_opts).map(|()| 0),
        Commands::Build => commands::build::execute(global_opts).map(|()| 0),
        Commands::Run(args) => commands::run::execute(args, global_opts),
        Commands::Install => commands::install::execute(global_opts).map(|()| 0),
        Commands::Add(args) => commands::add::execute(args, global_opts).map(|()| 0),
        Commands::Remove(args) => commands::remove::execute(args, global_opts).map(|()| 0),
        Commands::Update(args) => commands::update::execute(args, global_opts).map(|()| 0),
        Commands::Clean(args) => commands::clean::execute(args, global_opts).map(|()| 0),
    }
}

/// Print `e` with its class prefix and hint; return the exit code.
fn report(shell: &Shell, e: &anyhow::Error) -> i32 {
    match find_relay_error(e) {
        Some(relay_err) => {
            let kind = relay_err.kind();
            shell.error(kind.prefix(), format!("{:#}", e));
            if let Some(help) = relay_err.help() {
                eprintln!("help: {}", help);
            }
            kind.exit_code()
        }
        None => {
            shell.error("error", format!("{:#}", e));
            UNCLASSIFIED_EXIT
        }
    }
}
