use std::fmt;

use chrono::NaiveDateTime;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{FetchError, UpstreamError};

/// Key selecting a remote geophysical product, e.g. `GPM_3IMERGHH_06_precipitationCal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(id: impl Into<String>) -> Result<Self, FetchError> {
        let id = id.into();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(FetchError::InvalidQuery(format!(
                "dataset id '{id}' must be non-empty and contain no whitespace"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point in decimal degrees. Renders as `[<lat>,<lon>]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, FetchError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(FetchError::InvalidQuery(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(FetchError::InvalidQuery(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `Debug` keeps the decimal point on integral values: 5.0, not 5.
        write!(f, "[{:?},{:?}]", self.latitude, self.longitude)
    }
}

/// ISO-8601 timestamp, kept exactly as written (with or without a trailing `Z`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    parsed: NaiveDateTime,
}

impl Timestamp {
    pub fn parse(raw: impl Into<String>) -> Result<Self, FetchError> {
        let raw = raw.into();
        let without_zone = raw.strip_suffix('Z').unwrap_or(&raw);

        let parsed = NaiveDateTime::parse_from_str(without_zone, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| {
                FetchError::InvalidQuery(format!(
                    "timestamp '{raw}' is not ISO-8601 (YYYY-MM-DDTHH:MM:SS[Z]): {e}"
                ))
            })?;

        Ok(Self { raw, parsed })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Closed time window. Renders as `<start>/<end>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    start: Timestamp,
    end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, FetchError> {
        if start.parsed > end.parsed {
            return Err(FetchError::InvalidQuery(format!(
                "time range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, FetchError> {
        Self::new(Timestamp::parse(start)?, Timestamp::parse(end)?)
    }

    pub fn start(&self) -> &Timestamp {
        &self.start
    }

    pub fn end(&self) -> &Timestamp {
        &self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// Everything that determines the request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesQuery {
    pub dataset: DatasetId,
    pub location: Location,
    pub time: TimeRange,
}

impl TimeseriesQuery {
    pub fn new(dataset: DatasetId, location: Location, time: TimeRange) -> Self {
        Self { dataset, location, time }
    }

    /// Daily IMERG precipitation over the Mica dam for Jan 1, 2022 (UTC).
    pub fn mica_dam_precipitation() -> Result<Self, FetchError> {
        Ok(Self::new(
            DatasetId::new("GPM_3IMERGDL_06_precipitationCal")?,
            Location::new(52.076, 118.566)?,
            TimeRange::parse("2022-01-01T00:00:00Z", "2022-01-02T00:00:00Z")?,
        ))
    }

    /// Query parameters in wire order, not yet percent-encoded.
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("data", self.dataset.to_string()),
            ("location", self.location.to_string()),
            ("time", self.time.to_string()),
        ]
    }

    /// Human-readable query string, e.g. for logs.
    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Raw answer from the timeseries endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeseriesResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TimeseriesResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    /// Inspect status and body for problems the upstream reported.
    ///
    /// A 2xx body that is a JSON object holding only a `message` key is how
    /// Giovanni says "nothing here"; anything else with a success status is
    /// treated as data.
    pub fn check(&self) -> Result<(), UpstreamError> {
        if !self.status.is_success() {
            return Err(UpstreamError::Status {
                status: self.status,
                body: truncate_body(&self.body),
            });
        }

        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(self.body.trim()) else {
            return Ok(());
        };
        if map.len() != 1 {
            return Ok(());
        }

        match map.get("message") {
            Some(Value::Null) => Err(UpstreamError::NoData),
            Some(Value::String(message)) => Err(UpstreamError::Message(message.clone())),
            _ => Ok(()),
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
