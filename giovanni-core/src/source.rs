use crate::{
    Config, TimeseriesQuery, TimeseriesResponse, error::FetchError,
    source::giovanni::GiovanniClient,
};
use async_trait::async_trait;
use std::{fmt::Debug, io::Write};

pub mod giovanni;

#[async_trait]
pub trait TimeseriesSource: Send + Sync + Debug {
    async fn fetch(&self, query: &TimeseriesQuery) -> Result<TimeseriesResponse, FetchError>;
}

/// Construct the Giovanni-backed source from config.
pub fn source_from_config(config: &Config) -> Result<Box<dyn TimeseriesSource>, FetchError> {
    Ok(Box::new(GiovanniClient::new(config)?))
}

/// Fetch once and write the body to `out` exactly as received, followed by a newline.
///
/// The response is returned whatever its status or content, so the caller
/// can run [`TimeseriesResponse::check`] after the body has been printed.
pub async fn fetch_to_writer<W: Write>(
    source: &dyn TimeseriesSource,
    query: &TimeseriesQuery,
    out: &mut W,
) -> Result<TimeseriesResponse, FetchError> {
    let response = source.fetch(query).await?;

    writeln!(out, "{}", response.body).map_err(FetchError::Output)?;
    out.flush().map_err(FetchError::Output)?;

    Ok(response)
}
