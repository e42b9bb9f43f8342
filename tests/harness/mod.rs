//! Shared fixtures for the integration tests
//!
//! - `FakeStore`: in-memory `TimeSeriesStore` that serves 0.8-shaped readings,
//!   can be told to fail batched or per-sensor queries, and records every call
//! - `CapturedLogs`: tracing writer that keeps formatted output for assertions

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDateTime;
use influx_migrate::{MigrationOrchestrator, MigrationSettings};
use influx_migrate_core::{
    BackfillScheduler, DownsampleSpec, FetchFilter, Point, RawSeries, Scalar, SensorRegistry,
    TimeWindow,
};
use influx_migrate_store::{StoreQueryError, TimeSeriesStore, WriteOutcome};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// Column layout of a 0.8 `reading.<serial>` series.
pub const COLUMNS: [&str; 7] = [
    "time",
    "sequence_number",
    "SensorId",
    "RawMessage",
    "Temperature",
    "Humidity",
    "Resistance",
];

/// Sensor id in the legacy id space, present on every source row.
pub const LEGACY_SENSOR_ID: i64 = 999;

pub fn ts(value: &str) -> NaiveDateTime {
    FetchFilter::parse_time(value).unwrap()
}

pub fn millis(value: &str) -> i64 {
    ts(value).and_utc().timestamp_millis()
}

pub fn registry(sensors: &[(&str, i64)]) -> Arc<SensorRegistry> {
    let ids: HashMap<String, i64> = sensors
        .iter()
        .map(|(serial, id)| (serial.to_string(), *id))
        .collect();
    Arc::new(SensorRegistry::new(sensors.iter().map(|(serial, _)| *serial), &ids).unwrap())
}

/// Settings over `[from, to)` with no request delay.
pub fn settings(from: &str, to: &str) -> MigrationSettings {
    let mut settings = MigrationSettings::new(TimeWindow::new(ts(from), ts(to)).unwrap());
    settings.delay = Duration::ZERO;
    settings
}

pub fn orchestrator(
    source: &Arc<FakeStore>,
    destination: &Arc<FakeStore>,
    sensors: &[(&str, i64)],
    settings: MigrationSettings,
) -> MigrationOrchestrator {
    MigrationOrchestrator::new(
        source.clone(),
        destination.clone(),
        registry(sensors),
        BackfillScheduler::default(),
        settings,
    )
}

#[derive(Default)]
pub struct FakeStore {
    /// serial -> rows in `COLUMNS` order, keyed by millisecond timestamp
    rows: Mutex<HashMap<String, BTreeMap<i64, Vec<Scalar>>>>,
    fail_batched: bool,
    failing_serials: HashSet<String>,
    write_outcomes: Mutex<VecDeque<WriteOutcome>>,
    backfill_outcomes: Mutex<VecDeque<WriteOutcome>>,

    pub queries: Mutex<Vec<FetchFilter>>,
    pub writes: Mutex<Vec<Vec<Point>>>,
    pub backfills: Mutex<Vec<DownsampleSpec>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries naming more than one serial fail.
    pub fn failing_batched(mut self) -> Self {
        self.fail_batched = true;
        self
    }

    /// Any query naming this serial fails.
    pub fn failing_serial(mut self, serial: &str) -> Self {
        self.failing_serials.insert(serial.to_string());
        self
    }

    pub fn with_reading(self, serial: &str, at: &str, temperature: i64, humidity: i64) -> Self {
        let time = millis(at);
        self.with_row(
            serial,
            time,
            vec![
                Scalar::Int(time),
                Scalar::Int(1),
                Scalar::Int(LEGACY_SENSOR_ID),
                Scalar::String(format!("T{} H{}", temperature, humidity)),
                Scalar::Int(temperature),
                Scalar::Int(humidity),
                Scalar::Int(1200),
            ],
        )
    }

    /// Insert a raw row, `values` in `COLUMNS` order.
    pub fn with_row(self, serial: &str, time: i64, values: Vec<Scalar>) -> Self {
        self.rows
            .lock()
            .entry(serial.to_string())
            .or_default()
            .insert(time, values);
        self
    }

    pub fn queue_write_outcome(&self, outcome: WriteOutcome) {
        self.write_outcomes.lock().push_back(outcome);
    }

    pub fn queue_backfill_outcome(&self, outcome: WriteOutcome) {
        self.backfill_outcomes.lock().push_back(outcome);
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every written point, in write order.
    pub fn written_points(&self) -> Vec<Point> {
        self.writes.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl TimeSeriesStore for FakeStore {
    fn name(&self) -> &str {
        "fake"
    }

    async fn query(&self, filter: &FetchFilter) -> Result<Vec<RawSeries>, StoreQueryError> {
        self.queries.lock().push(filter.clone());

        if self.fail_batched && filter.serials.len() > 1 {
            return Err(StoreQueryError::Status {
                status: 400,
                body: "Couldn't look up columns".into(),
            });
        }
        if let Some(serial) = filter
            .serials
            .iter()
            .find(|s| self.failing_serials.contains(*s))
        {
            return Err(StoreQueryError::Transport(format!(
                "connection reset while reading {}",
                serial
            )));
        }

        let from = filter.time_from.and_utc().timestamp_millis();
        let to = filter.time_to.and_utc().timestamp_millis();
        let rows = self.rows.lock();

        Ok(filter
            .serials
            .iter()
            .filter_map(|serial| {
                let points: Vec<Vec<Scalar>> = rows
                    .get(serial)?
                    .range(from..to)
                    .map(|(_, values)| values.clone())
                    .collect();
                if points.is_empty() {
                    return None;
                }
                Some(RawSeries::new(
                    format!("reading.{}", serial),
                    COLUMNS.iter().map(|c| c.to_string()).collect(),
                    points,
                ))
            })
            .collect())
    }

    async fn write(&self, points: &[Point]) -> WriteOutcome {
        self.writes.lock().push(points.to_vec());
        self.write_outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| WriteOutcome {
                success: true,
                status_code: 204,
                body: String::new(),
            })
    }

    async fn backfill(&self, spec: &DownsampleSpec) -> WriteOutcome {
        self.backfills.lock().push(spec.clone());
        self.backfill_outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| WriteOutcome {
                success: true,
                status_code: 200,
                body: r#"{"results":[{}]}"#.into(),
            })
    }
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Install as the default subscriber for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

pub struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter(Arc::clone(&self.0))
    }
}
