use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser;
use giovanni_core::{
    Config, FetchError, TimeseriesQuery, TimeseriesSource, fetch_to_writer, source_from_config,
};
use tracing::{debug, warn};

/// Exit code when the response carried data.
pub const EXIT_OK: u8 = 0;

/// Exit code when Giovanni answered but the answer carried no usable data.
pub const EXIT_UPSTREAM: u8 = 2;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "giovanni-fetch",
    version,
    about = "Fetch Mica dam precipitation from the Giovanni timeseries API"
)]
pub struct Cli {
    /// Env file read for EARTHDATA_API_TOKEN when it isn't already set.
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Log request details to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let config = Config::load(&self.env_file).context("Failed to load configuration")?;
        debug!(endpoint = %config.settings.endpoint, timeout_secs = config.settings.timeout_secs, "configuration loaded");

        let query = TimeseriesQuery::mica_dam_precipitation()?;
        let source = source_from_config(&config)?;

        let code = fetch_and_report(source.as_ref(), &query, &mut io::stdout()).await?;
        Ok(ExitCode::from(code))
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }
}

/// Print the response body, then map what Giovanni said to an exit code.
pub async fn fetch_and_report<W: Write>(
    source: &dyn TimeseriesSource,
    query: &TimeseriesQuery,
    out: &mut W,
) -> Result<u8, FetchError> {
    let response = fetch_to_writer(source, query, out).await?;

    match response.check() {
        Ok(()) => Ok(EXIT_OK),
        Err(err) => {
            warn!(kind = err.kind(), status = %response.status, "{err}");
            Ok(EXIT_UPSTREAM)
        }
    }
}
