use reqwest::StatusCode;
use thiserror::Error;

/// Failures that stop a fetch before a response can be printed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("network error while contacting the Giovanni API")]
    Network(#[source] reqwest::Error),

    #[error("failed to write response body")]
    Output(#[source] std::io::Error),
}

/// Problems reported by the remote API itself. These never prevent the
/// body from being printed; they are surfaced to the operator afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error(
        "Giovanni answered with {{\"message\":null}}: no data was found for this query.\n\
         Hint: check that the dataset covers the requested location and time range."
    )]
    NoData,

    #[error("Giovanni answered with a message instead of data: {0}")]
    Message(String),

    #[error("Giovanni request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl UpstreamError {
    /// The operator-visible category, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::NoData | UpstreamError::Message(_) => "upstream_semantic",
            UpstreamError::Status { .. } => "upstream_status",
        }
    }
}
