use clap::{Args, Subcommand};

use crate::config::{ConfigOverrides, Mode};

/// Available kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the application once
    ///
    /// Builds the server and client targets and writes their stats next to
    /// the output. Any compilation error fails the command and leaves
    /// previous stats untouched.
    Build(BuildArgs),

    /// Serve with watch-mode rebuilds
    ///
    /// Rebuilds on every source change and serves the latest successful
    /// client bundle from memory.
    Dev(DevArgs),

    /// Serve previously built output
    Start(StartArgs),
}

/// Arguments for the build command
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Build the static export instead of the server/client pair
    #[arg(long = "static")]
    pub static_export: bool,

    /// Override NODE_ENV
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,
}

/// Arguments for the dev command
#[derive(Args, Debug, Default)]
pub struct DevArgs {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the start command
#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Run a build before serving
    #[arg(long)]
    pub build: bool,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override NODE_ENV
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,
}

impl Command {
    /// Configuration values implied by the subcommand's flags.
    pub fn overrides(&self) -> ConfigOverrides {
        match self {
            Command::Build(args) => ConfigOverrides {
                mode: args.mode,
                ..ConfigOverrides::default()
            },
            // Watch mode is development by definition
            Command::Dev(args) => ConfigOverrides {
                mode: Some(Mode::Development),
                port: args.port,
                root: None,
            },
            Command::Start(args) => ConfigOverrides {
                mode: args.mode,
                port: args.port,
                root: None,
            },
        }
    }
}
