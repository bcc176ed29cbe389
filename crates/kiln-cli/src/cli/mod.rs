//! Command-line interface definition for kiln.
//!
//! # Command Structure
//!
//! - `kiln build` - Compile the server and client bundles (or the static export)
//! - `kiln dev` - Serve with watch-mode rebuilds
//! - `kiln start` - Serve previously built output

mod commands;
mod tests;

use clap::Parser;
use std::path::PathBuf;

pub use commands::{BuildArgs, Command, DevArgs, StartArgs};

/// Kiln - build and serve a server-rendered web application
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Build and serve a server-rendered web application",
    long_about = "Kiln drives your bundler across the server, client and static targets,\n\
                  records build stats, and serves the result behind a fixed middleware\n\
                  pipeline with live rebuilds in development."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to a kiln.toml file (default: ./kiln.toml if present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
