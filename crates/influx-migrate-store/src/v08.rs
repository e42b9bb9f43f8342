//! InfluxDB 0.8 client (the migration source).
//!
//! 0.8 stores one series per sensor and speaks JSON in both directions:
//! `GET /db/<db>/series?q=...` returns `[{"name", "columns", "points"}]`.

use crate::http::{with_params, HttpClient};
use crate::{influxql, ConnectionSettings, StoreQueryError, TimeSeriesStore, WriteOutcome};
use async_trait::async_trait;
use influx_migrate_core::field_names::TIME;
use influx_migrate_core::{
    DownsampleSpec, FetchFilter, Point, RawSeries, Scalar, DEFAULT_RESOLUTION, READING_SERIES,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub struct InfluxV08Store {
    settings: ConnectionSettings,
    http: Arc<dyn HttpClient>,
    measurement: String,
    default_resolution: String,
}

impl InfluxV08Store {
    pub fn new(settings: ConnectionSettings, http: Arc<dyn HttpClient>) -> Self {
        Self {
            settings,
            http,
            measurement: READING_SERIES.to_string(),
            default_resolution: DEFAULT_RESOLUTION.to_string(),
        }
    }

    pub fn with_default_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.default_resolution = resolution.into();
        self
    }

    fn series_url(&self, extra: &[(&str, &str)]) -> anyhow::Result<String> {
        let base = self
            .settings
            .endpoint(&format!("db/{}/series", self.settings.database));
        let mut params: Vec<(&str, &str)> = self.settings.credentials().to_vec();
        params.push(("time_precision", "ms"));
        params.extend_from_slice(extra);
        with_params(&base, &params)
    }
}

/// One series in the 0.8 write payload.
#[derive(Debug, Serialize)]
struct WriteSeries<'a> {
    name: &'a str,
    columns: Vec<&'a str>,
    points: Vec<Vec<&'a Scalar>>,
}

/// 0.8 has no tags: tags and fields alike become columns, one series per point.
fn encode_points(points: &[Point]) -> serde_json::Result<Vec<u8>> {
    let times: Vec<Scalar> = points
        .iter()
        .map(|p| Scalar::Int(p.timestamp_millis()))
        .collect();

    let payload: Vec<WriteSeries<'_>> = points
        .iter()
        .zip(times.iter())
        .map(|(point, time)| {
            let mut columns = vec![TIME];
            let mut values = vec![time];
            for (key, value) in point.tags.iter().chain(point.fields.iter()) {
                columns.push(key.as_str());
                values.push(value);
            }
            WriteSeries {
                name: point.series_name.as_str(),
                columns,
                points: vec![values],
            }
        })
        .collect();

    serde_json::to_vec(&payload)
}

#[async_trait]
impl TimeSeriesStore for InfluxV08Store {
    fn name(&self) -> &str {
        "influxdb-0.8"
    }

    async fn query(&self, filter: &FetchFilter) -> Result<Vec<RawSeries>, StoreQueryError> {
        let query = influxql::v08_select(&self.measurement, filter, &self.default_resolution);
        debug!(store = self.name(), %query, "Querying");

        let url = self
            .series_url(&[("q", query.as_str())])
            .map_err(|e| StoreQueryError::Transport(format!("{:#}", e)))?;
        let response = self
            .http
            .get(&url)
            .await
            .map_err(|e| StoreQueryError::Transport(format!("{:#}", e)))?;

        if !response.is_success() {
            return Err(StoreQueryError::Status {
                status: response.status,
                body: response.body_lossy(),
            });
        }

        response
            .json::<Vec<RawSeries>>()
            .map_err(|e| StoreQueryError::Decode(e.to_string()))
    }

    async fn write(&self, points: &[Point]) -> WriteOutcome {
        if points.is_empty() {
            return WriteOutcome::no_op();
        }

        let body = match encode_points(points) {
            Ok(body) => body,
            Err(e) => {
                return WriteOutcome::transport_failure(format!("Failed to encode points: {}", e))
            }
        };
        let url = match self.series_url(&[]) {
            Ok(url) => url,
            Err(e) => return WriteOutcome::transport_failure(format!("{:#}", e)),
        };

        match self.http.post(&url, "application/json", body).await {
            Ok(response) => WriteOutcome::from_response(&response),
            Err(e) => WriteOutcome::transport_failure(format!("{:#}", e)),
        }
    }

    async fn backfill(&self, spec: &DownsampleSpec) -> WriteOutcome {
        WriteOutcome::unsupported(format!(
            "{} does not support aggregation backfill (requested {})",
            self.name(),
            spec.destination_series
        ))
    }
}
