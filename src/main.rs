//! typing - typed-schema engine for note vaults.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use typing::cli::{self, Cli, Commands};
use typing::{logger, watch};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let ctx = cli::common::open_context(&cli.config)?;
    if ctx.config().log.verbose {
        logger::set_verbose(true);
    }

    match &cli.command {
        Commands::Check { path } => cli::check::run_check(&ctx, path.as_deref()),
        Commands::Dump { args } => cli::dump::run_dump(&ctx, args),
        Commands::Watch => {
            let shutdown = watch::setup_shutdown_handler()?;
            cli::watch::run_watch(&ctx, &shutdown)
        }
    }
}
