//! Core library for the `giovanni-fetch` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling (`.env`, process environment, settings file)
//! - The Giovanni timeseries query model and its wire rendering
//! - An HTTP source for the timeseries endpoint
//! - Error types for local failures and upstream diagnostics
//!
//! It is used by `giovanni-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod source;

pub use config::{ApiToken, Config, EnvSource, Settings};
pub use error::{FetchError, UpstreamError};
pub use model::{DatasetId, Location, TimeRange, TimeseriesQuery, TimeseriesResponse, Timestamp};
pub use reqwest::StatusCode;
pub use source::{TimeseriesSource, fetch_to_writer, source_from_config};
