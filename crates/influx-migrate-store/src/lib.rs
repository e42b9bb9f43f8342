//! Time-series store clients.
//!
//! Both InfluxDB generations sit behind one [`TimeSeriesStore`] contract so the
//! migration engine never needs to know which one it is talking to:
//!
//! - reads return `Result` and are the only operation that can fail;
//! - writes and backfills always return a [`WriteOutcome`] describing what the
//!   server said, successful or not.

mod error;
pub mod http;
pub mod influxql;
pub mod line_protocol;
mod outcome;
pub mod v08;
pub mod v09;

use async_trait::async_trait;
use influx_migrate_core::{DownsampleSpec, FetchFilter, Point, RawSeries};
use std::time::Duration;

pub use error::StoreQueryError;
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use outcome::WriteOutcome;
pub use v08::InfluxV08Store;
pub use v09::InfluxV09Store;

/// Shared contract of the source and destination stores.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Short label used in logs, e.g. `influxdb-0.8`.
    fn name(&self) -> &str;

    /// Read every series matching the filter.
    async fn query(&self, filter: &FetchFilter) -> Result<Vec<RawSeries>, StoreQueryError>;

    /// Persist points. Failures are reported in the outcome, never raised.
    async fn write(&self, points: &[Point]) -> WriteOutcome;

    /// Materialize a downsampled series. Same reporting convention as `write`.
    async fn backfill(&self, spec: &DownsampleSpec) -> WriteOutcome;
}

/// Where and as whom to connect.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Base URL, e.g. `http://localhost:8086`
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub timeout: Duration,
}

impl ConnectionSettings {
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.uri.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub(crate) fn credentials(&self) -> [(&'static str, &str); 2] {
        [("u", self.username.as_str()), ("p", self.password.as_str())]
    }
}
