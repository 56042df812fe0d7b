//! ncpy entry point.

mod app;
mod cli;
mod config;
mod console;
mod relay;

use std::process::ExitCode;

use ncpy_transfer::{STATUS_OK, STATUS_TRANSFER_FAILED, TransferError};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr alongside the progress line.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match cli::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e:#}");
            eprintln!();
            cli::print_usage();
            return ExitCode::from(cli::EXIT_USAGE);
        }
    };

    if cli.command == cli::Command::Help {
        cli::print_usage();
        return ExitCode::SUCCESS;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting ncpy");

    let config = match config::Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(app::run(cli.command, config)) {
        Ok(()) => exit_code(STATUS_OK),
        Err(e) => {
            let status = status_of(&e);
            tracing::error!(status, "{e:#}");
            exit_code(status)
        }
    }
}

/// Negative session status for a failed run.
fn status_of(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<TransferError>()
        .map(TransferError::status)
        .unwrap_or(STATUS_TRANSFER_FAILED)
}

fn exit_code(status: i32) -> ExitCode {
    ExitCode::from(exit_value(status))
}

/// Maps a session status onto a process exit value (0 -> 0, -1 -> 1, ...).
fn exit_value(status: i32) -> u8 {
    u8::try_from(status.unsigned_abs()).unwrap_or(u8::MAX)
}
