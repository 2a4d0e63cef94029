mod cli;
mod commands;
mod config;
mod engine;
mod error;
mod model;
mod ocr;
mod parsers;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let command = cli.command.name();
    if let Err(err) = dispatch(cli.command) {
        error!(command, error = %err, "rmm-report-extract failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Match(args) => commands::matching::run(args),
        Commands::Extract(args) => commands::extract::run(args),
        Commands::InitConfig(args) => commands::init_config::run(args),
    }
}

/// `RUST_LOG` wins; otherwise info-level lines on stderr so stdout stays
/// free for `match` and `extract` JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
