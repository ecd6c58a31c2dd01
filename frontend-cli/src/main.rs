//! psk - terminal frontend.
//!
//! Lists processes, lets the operator pick some by index and terminates them
//! with SIGTERM, escalating to SIGKILL.

mod cli;
mod render;
mod session;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use console::style;
use psk_backend::list_modes;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Modes) => {
            for mode in list_modes() {
                println!("{:<8} {}", mode.key(), mode.description());
            }
            Ok(())
        }
        Some(Command::Version) => {
            println!("psk {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Command::Run(args)) => session::run(args),
        None => session::run(cli.run),
    }
}

/// Logs go to stderr; `warn` unless RUST_LOG or --log-level says otherwise.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
