//! Binary crate for the `giovanni-fetch` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup (stderr only; stdout carries the response body)
//! - Mapping outcomes to exit codes

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cmd = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cmd.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    cmd.run().await
}
