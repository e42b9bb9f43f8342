//! InfluxDB 0.9 client (the migration destination).
//!
//! Reads go through `/query` with `epoch=ms`, writes through `/write` as line
//! protocol, and backfills are `SELECT ... INTO` statements posted to `/query`.

use crate::http::{with_params, HttpClient, HttpResponse};
use crate::{
    influxql, line_protocol, ConnectionSettings, StoreQueryError, TimeSeriesStore, WriteOutcome,
};
use async_trait::async_trait;
use influx_migrate_core::field_names::SERIAL_NUMBER;
use influx_migrate_core::{
    DownsampleSpec, FetchFilter, Point, RawSeries, Scalar, DEFAULT_RESOLUTION, READING_SERIES,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct InfluxV09Store {
    settings: ConnectionSettings,
    http: Arc<dyn HttpClient>,
    measurement: String,
    default_resolution: String,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<ResultSeries>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultSeries {
    name: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Scalar>>,
}

impl QueryResponse {
    /// First error reported at either the request or statement level.
    fn error(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.results.iter().find_map(|r| r.error.as_deref()))
    }
}

impl ResultSeries {
    /// Label grouped series `<measurement>.<serial>`, the same shape 0.8 uses,
    /// so callers strip decoration identically for both stores.
    fn into_raw(self) -> RawSeries {
        let name = match self.tags.get(SERIAL_NUMBER) {
            Some(serial) => format!("{}.{}", self.name, serial),
            None => self.name,
        };
        RawSeries::new(name, self.columns, self.values)
    }
}

impl InfluxV09Store {
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

    fn url(&self, path: &str, extra: &[(&str, &str)]) -> anyhow::Result<String> {
        let mut params: Vec<(&str, &str)> = vec![("db", self.settings.database.as_str())];
        params.extend_from_slice(&self.settings.credentials());
        params.extend_from_slice(extra);
        with_params(&self.settings.endpoint(path), &params)
    }

    fn outcome(response: &HttpResponse) -> WriteOutcome {
        if !response.is_success() {
            return WriteOutcome::from_response(response);
        }
        // Statement errors come back with a 200 status.
        match response.json::<QueryResponse>() {
            Ok(parsed) => match parsed.error() {
                Some(message) => WriteOutcome::rejected(response.status, message),
                None => WriteOutcome::from_response(response),
            },
            Err(_) => WriteOutcome::from_response(response),
        }
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxV09Store {
    fn name(&self) -> &str {
        "influxdb-0.9"
    }

    async fn query(&self, filter: &FetchFilter) -> Result<Vec<RawSeries>, StoreQueryError> {
        let query = influxql::v09_select(&self.measurement, filter, &self.default_resolution);
        debug!(store = self.name(), %query, "Querying");

        let url = self
            .url("query", &[("epoch", "ms"), ("q", query.as_str())])
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

        let parsed = response
            .json::<QueryResponse>()
            .map_err(|e| StoreQueryError::Decode(e.to_string()))?;
        if let Some(message) = parsed.error() {
            return Err(StoreQueryError::Rejected(message.to_string()));
        }

        Ok(parsed
            .results
            .into_iter()
            .flat_map(|r| r.series)
            .map(ResultSeries::into_raw)
            .collect())
    }

    async fn write(&self, points: &[Point]) -> WriteOutcome {
        let body = line_protocol::encode(points);
        if body.is_empty() {
            return WriteOutcome::no_op();
        }

        let url = match self.url("write", &[("precision", "ms")]) {
            Ok(url) => url,
            Err(e) => return WriteOutcome::transport_failure(format!("{:#}", e)),
        };

        match self.http.post(&url, "text/plain", body.into_bytes()).await {
            Ok(response) => WriteOutcome::from_response(&response),
            Err(e) => WriteOutcome::transport_failure(format!("{:#}", e)),
        }
    }

    async fn backfill(&self, spec: &DownsampleSpec) -> WriteOutcome {
        let statement = influxql::backfill_statement(spec);
        debug!(store = self.name(), %statement, "Backfilling");

        let url = match self.url("query", &[("q", statement.as_str())]) {
            Ok(url) => url,
            Err(e) => return WriteOutcome::transport_failure(format!("{:#}", e)),
        };

        match self
            .http
            .post(&url, "application/x-www-form-urlencoded", Vec::new())
            .await
        {
            Ok(response) => Self::outcome(&response),
            Err(e) => WriteOutcome::transport_failure(format!("{:#}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use influx_migrate_core::{BackfillScheduler, TimeWindow};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Hands out queued responses in order and records requests.
    #[derive(Default)]
    struct ScriptedHttp {
        responses: Mutex<VecDeque<anyhow::Result<HttpResponse>>>,
        urls: Mutex<Vec<String>>,
        bodies: Mutex<Vec<Option<Vec<u8>>>>,
    }

    impl ScriptedHttp {
        fn respond(self: &Arc<Self>, status: u16, body: &str) -> Arc<Self> {
            self.responses.lock().push_back(Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            }));
            Arc::clone(self)
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttp {
        async fn request(
            &self,
            _method: &str,
            url: &str,
            _headers: Vec<(String, String)>,
            body: Option<Vec<u8>>,
        ) -> anyhow::Result<HttpResponse> {
            self.urls.lock().push(url.to_string());
            self.bodies.lock().push(body);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("connection refused")))
        }
    }

    fn store(http: Arc<ScriptedHttp>) -> InfluxV09Store {
        InfluxV09Store::new(
            ConnectionSettings {
                uri: "http://new-influx:8086".into(),
                username: "admin".into(),
                password: "pw".into(),
                database: "sensors".into(),
                timeout: Duration::from_secs(5),
            },
            http,
        )
    }

    fn filter() -> FetchFilter {
        FetchFilter::new(
            ["0000AAAA", "0000BBBB"],
            FetchFilter::parse_time("2020-01-01").unwrap(),
            FetchFilter::parse_time("2020-01-02").unwrap(),
        )
    }

    #[tokio::test]
    async fn query_labels_series_by_serial_tag() {
        let http = Arc::new(ScriptedHttp::default()).respond(
            200,
            r#"{"results":[{"series":[
                {"name":"reading","tags":{"SensorSerialCode":"0000AAAA"},"columns":["time","Humidity"],"values":[[1577836800000,40]]},
                {"name":"reading","tags":{"SensorSerialCode":"0000BBBB"},"columns":["time","Humidity"],"values":[]}
            ]}]}"#,
        );
        let series = store(http.clone()).query(&filter()).await.unwrap();

        let names: Vec<_> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["reading.0000AAAA", "reading.0000BBBB"]);
        assert_eq!(series[0].points[0][1], Scalar::Int(40));
        assert!(http.urls.lock()[0].contains("epoch=ms"));
    }

    #[tokio::test]
    async fn query_surfaces_statement_errors() {
        let http = Arc::new(ScriptedHttp::default())
            .respond(200, r#"{"results":[{"error":"database not found: sensors"}]}"#);
        assert_eq!(
            store(http).query(&filter()).await.unwrap_err(),
            StoreQueryError::Rejected("database not found: sensors".into())
        );

        let unreachable = Arc::new(ScriptedHttp::default());
        assert!(matches!(
            store(unreachable).query(&filter()).await.unwrap_err(),
            StoreQueryError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn write_posts_line_protocol() {
        let http = Arc::new(ScriptedHttp::default()).respond(204, "");
        let point = Point::new("reading", Local.timestamp_millis_opt(5).unwrap())
            .tag("SensorId", 1i64)
            .field("Humidity", 40i64);

        let outcome = store(http.clone()).write(&[point]).await;
        assert_eq!(
            outcome,
            WriteOutcome {
                success: true,
                status_code: 204,
                body: String::new()
            }
        );
        assert!(http.urls.lock()[0].contains("/write?db=sensors"));
        assert_eq!(
            http.bodies.lock()[0].as_deref(),
            Some("reading,SensorId=1 Humidity=40i 5\n".as_bytes())
        );
    }

    #[tokio::test]
    async fn write_failure_is_reported_not_raised() {
        let http = Arc::new(ScriptedHttp::default())
            .respond(400, r#"{"error":"field type conflict"}"#);
        let point = Point::new("reading", Local.timestamp_millis_opt(5).unwrap())
            .field("Humidity", 40i64);

        let outcome = store(http).write(&[point]).await;
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, 400);
        assert!(outcome.body.contains("field type conflict"));
    }

    #[tokio::test]
    async fn backfill_reports_statement_errors() {
        let window = TimeWindow::new(
            FetchFilter::parse_time("2020-01-01").unwrap(),
            FetchFilter::parse_time("2020-01-08").unwrap(),
        )
        .unwrap();
        let spec = BackfillScheduler::default().plan("0000AAAA", &window).remove(0);

        let ok = Arc::new(ScriptedHttp::default()).respond(200, r#"{"results":[{}]}"#);
        assert!(store(ok.clone()).backfill(&spec).await.success);
        assert!(ok.urls.lock()[0].contains("INTO"));

        let rejected = Arc::new(ScriptedHttp::default())
            .respond(200, r#"{"results":[{"error":"retention policy not found"}]}"#);
        let outcome = store(rejected).backfill(&spec).await;
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, 200);
        assert_eq!(outcome.body, "retention policy not found");
    }
}
