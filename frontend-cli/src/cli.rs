//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use psk_backend::SortMode;
use std::path::PathBuf;

/// psk - list, select and terminate processes
#[derive(Parser, Debug)]
#[command(name = "psk")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(about = "List processes, pick some, and terminate them (SIGTERM, then SIGKILL)")]
#[command(
    long_about = "List processes, pick some, and terminate them (SIGTERM, then SIGKILL).\n\n\
Sorting modes:\n  \
general   CPU + memory, weighted (see [ranking] in the config file)\n  \
memory    memory usage\n  \
cpu       CPU usage\n  \
uptime    oldest first\n  \
zombie    zombie processes only\n  \
search    case-insensitive match on command or name (use search:<query>)\n\n\
Selections are comma-separated indices and ranges, e.g. 1,3,5-7."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Log filter (trace, debug, info, warn, error); overrides RUST_LOG
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the interactive process killer (default)
    Run(RunArgs),
    /// List the available sorting modes
    Modes,
    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Sort once by MODE and exit instead of showing the menu
    #[arg(short, long, value_name = "MODE")]
    pub by: Option<SortMode>,

    /// Process names to exclude (comma-separated, e.g. 'Cursor,Google Chrome')
    #[arg(short, long, value_delimiter = ',', value_name = "NAMES")]
    pub excludes: Vec<String>,

    /// Only show processes whose name contains this keyword
    #[arg(short, long, value_name = "KEYWORD")]
    pub name: Option<String>,

    /// Include system processes (root-owned, kernel threads, init)
    #[arg(long)]
    pub show_system: bool,

    /// Config file path (default: <config dir>/psk/config.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
