//! Kiln CLI entry point.
//!
//! Parses arguments, initializes logging and colors, loads the configuration
//! once and dispatches to a command. This is the only place a failure turns
//! into a process exit status.

use clap::Parser;
use kiln_cli::{AppConfig, cli, commands, error, logger, ui};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = run(args).await;
    let code = error::exit_code(&result);

    if let Err(e) = result {
        eprintln!("{:?}", error::cli_error_to_miette(e));
    }

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn run(args: cli::Cli) -> error::Result<()> {
    let mut overrides = args.command.overrides();
    if args.root.is_some() {
        overrides.root = args.root.clone();
    }

    let config = AppConfig::load(&overrides, args.config.as_deref())?;
    config.validate()?;

    match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args, &config).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args, &config).await,
        cli::Command::Start(start_args) => commands::start_execute(start_args, &config).await,
    }
}
