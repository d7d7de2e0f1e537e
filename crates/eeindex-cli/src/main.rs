//! eeindex CLI - Command-line interface
//!
//! Indexes satellite imagery catalogs (Earth Engine, STAC) into the dataset
//! index.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod output;
mod progress;
mod storage;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(commands::execute(cli)) {
        Ok(code) => code,
        Err(error) => {
            let cli_error = errors::from_anyhow(&error);
            if json {
                eprintln!("{}", cli_error.to_json());
            } else {
                cli_error.display();
            }
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise each `-v` raises the level from `warn`
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}
