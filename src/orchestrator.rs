//! The migration and backfill loops.
//!
//! Work is split per sensor, then per time window. A window is the unit of
//! failure: whatever goes wrong inside one is logged with the sensor and the
//! window bounds, and the loop moves on to the next window.

use crate::error::WindowError;
use crate::fetch::{FetchError, FetchStrategy};
use crate::rate_limit::RateLimiter;
use crate::writer::WriteCoordinator;
use chrono::{Local, TimeDelta};
use futures::stream::{self, StreamExt, TryStreamExt};
use influx_migrate_config::RuntimeConfig;
use influx_migrate_core::field_names::{
    HUMIDITY, RAW_MESSAGE, RESISTANCE, SENSOR_ID, SERIAL_NUMBER, TEMPERATURE,
};
use influx_migrate_core::{
    BackfillScheduler, ConfigError, DownsampleSpec, FetchFilter, Point, SchemaTranslator,
    SensorIdentity, SensorRegistry, TimeWindow, WindowIterator, READING_SERIES,
};
use influx_migrate_store::{TimeSeriesStore, WriteOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Placeholder id written by [`MigrationOrchestrator::seed_fields`].
pub const SEED_SENSOR_ID: i64 = -1;
pub const SEED_RAW_MESSAGE: &str = "fakeMessage";

/// Knobs of the loops, resolved from the runtime configuration.
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    /// Overall `[from, to)` range.
    pub range: TimeWindow,
    pub migration_stride: TimeDelta,
    pub backfill_stride: TimeDelta,
    pub delay: Duration,
    pub default_resolution: String,
    pub metric: String,
    pub max_points_per_write: usize,
    pub workers: usize,
    pub halt_on_unreachable_sensor: bool,
}

impl MigrationSettings {
    pub fn new(range: TimeWindow) -> Self {
        Self {
            range,
            migration_stride: TimeDelta::days(1),
            backfill_stride: TimeDelta::days(7),
            delay: Duration::from_millis(250),
            default_resolution: influx_migrate_core::DEFAULT_RESOLUTION.to_string(),
            metric: "*".to_string(),
            max_points_per_write: 5000,
            workers: 1,
            halt_on_unreachable_sensor: false,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ConfigError> {
        let migration = &config.migration;
        Ok(Self {
            range: migration.time_range()?,
            migration_stride: migration.window_stride(),
            backfill_stride: config.backfill.window_stride(),
            delay: migration.delay(),
            default_resolution: migration.default_resolution.clone(),
            metric: migration.metric.clone(),
            max_points_per_write: migration.max_points_per_write,
            workers: migration.workers,
            halt_on_unreachable_sensor: migration.halt_on_unreachable_sensor,
        })
    }
}

/// Counters of the raw-data loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub sensors: usize,
    pub windows: usize,
    pub empty_windows: usize,
    pub failed_windows: usize,
    pub failed_writes: usize,
    pub points_read: usize,
    pub points_written: usize,
}

impl MigrationReport {
    fn absorb(&mut self, other: MigrationReport) {
        self.sensors += other.sensors;
        self.windows += other.windows;
        self.empty_windows += other.empty_windows;
        self.failed_windows += other.failed_windows;
        self.failed_writes += other.failed_writes;
        self.points_read += other.points_read;
        self.points_written += other.points_written;
    }
}

/// Counters of a backfill loop, also used for the seed phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub sensors: usize,
    pub windows: usize,
    pub submitted: usize,
    pub failed: usize,
}

impl BackfillReport {
    fn absorb(&mut self, other: BackfillReport) {
        self.sensors += other.sensors;
        self.windows += other.windows;
        self.submitted += other.submitted;
        self.failed += other.failed;
    }
}

/// What a successful window iteration did.
struct WindowOutcome {
    points: usize,
    write: WriteOutcome,
}

pub struct MigrationOrchestrator {
    source: Arc<dyn TimeSeriesStore>,
    destination: Arc<dyn TimeSeriesStore>,
    registry: Arc<SensorRegistry>,
    scheduler: BackfillScheduler,
    translator: SchemaTranslator,
    limiter: Arc<RateLimiter>,
    fetch: FetchStrategy,
    writer: WriteCoordinator,
    settings: MigrationSettings,
}

impl MigrationOrchestrator {
    pub fn new(
        source: Arc<dyn TimeSeriesStore>,
        destination: Arc<dyn TimeSeriesStore>,
        registry: Arc<SensorRegistry>,
        scheduler: BackfillScheduler,
        settings: MigrationSettings,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(settings.delay));
        let fetch = FetchStrategy::new(Arc::clone(&source), Arc::clone(&limiter));
        let writer = WriteCoordinator::new(
            Arc::clone(&destination),
            Arc::clone(&limiter),
            settings.max_points_per_write,
        );

        Self {
            source,
            destination,
            registry,
            scheduler,
            translator: SchemaTranslator::default(),
            limiter,
            fetch,
            writer,
            settings,
        }
    }

    fn workers(&self) -> usize {
        self.settings.workers.max(1)
    }

    /// Copy raw readings for every sensor, window by window.
    ///
    /// Only returns an error when `halt_on_unreachable_sensor` is set and a
    /// sensor cannot be read at all.
    pub async fn run_migration(&self) -> Result<MigrationReport, FetchError> {
        info!(
            sensors = self.registry.len(),
            range = %self.settings.range,
            workers = self.workers(),
            "Starting migration"
        );

        stream::iter(self.registry.iter())
            .map(|sensor| self.migrate_sensor(sensor))
            .buffer_unordered(self.workers())
            .try_fold(MigrationReport::default(), |mut total, report| async move {
                total.absorb(report);
                Ok(total)
            })
            .await
    }

    async fn migrate_sensor(&self, sensor: &SensorIdentity) -> Result<MigrationReport, FetchError> {
        info!(serial = %sensor.serial, sensor_id = sensor.numeric_id, "Migrating sensor");
        let mut report = MigrationReport {
            sensors: 1,
            ..Default::default()
        };

        let range = &self.settings.range;
        for window in WindowIterator::new(range.start(), range.end(), self.settings.migration_stride)
        {
            report.windows += 1;
            debug!(serial = %sensor.serial, window = %window, "Processing window");

            match self.migrate_window(sensor, &window).await {
                Ok(None) => report.empty_windows += 1,
                Ok(Some(outcome)) => {
                    report.points_read += outcome.points;
                    if outcome.write.success {
                        report.points_written += outcome.points;
                    } else {
                        report.failed_writes += 1;
                        error!(
                            serial = %sensor.serial,
                            sensor_id = sensor.numeric_id,
                            window_start = %window.start(),
                            window_end = %window.end(),
                            status = outcome.write.status_code,
                            body = %outcome.write.body,
                            "Write failed"
                        );
                    }
                }
                Err(WindowError::Fetch(fatal)) if self.settings.halt_on_unreachable_sensor => {
                    error!(
                        serial = %sensor.serial,
                        sensor_id = sensor.numeric_id,
                        window_start = %window.start(),
                        window_end = %window.end(),
                        "Sensor unreachable, halting run"
                    );
                    return Err(fatal);
                }
                Err(e) => {
                    report.failed_windows += 1;
                    error!(
                        serial = %sensor.serial,
                        sensor_id = sensor.numeric_id,
                        window_start = %window.start(),
                        window_end = %window.end(),
                        error = %format!("{:#}", anyhow::Error::from(e)),
                        "Window failed"
                    );
                }
            }
        }

        info!(
            serial = %sensor.serial,
            windows = report.windows,
            failed_windows = report.failed_windows,
            points_written = report.points_written,
            "Sensor done"
        );
        Ok(report)
    }

    /// Fetch, translate and write one window. `None` when the window is empty.
    async fn migrate_window(
        &self,
        sensor: &SensorIdentity,
        window: &TimeWindow,
    ) -> Result<Option<WindowOutcome>, WindowError> {
        let filter = FetchFilter::for_sensor(&sensor.serial, window)
            .with_resolution(self.settings.default_resolution.as_str())
            .with_metric(self.settings.metric.as_str());

        let series = self.fetch.fetch(&filter).await?;
        if series.iter().all(|s| s.is_empty()) {
            debug!(serial = %sensor.serial, window = %window, "No data");
            return Ok(None);
        }
        for s in &series {
            debug!(serial = %sensor.serial, series = %s.name, points = s.len(), "Fetched series");
        }

        let points = self.translator.translate_all(&series, &self.registry)?;
        let write = self.writer.write(&points).await;
        Ok(Some(WindowOutcome {
            points: points.len(),
            write,
        }))
    }

    /// Rebuild the automatic downsample series for every sensor, one
    /// backfill window at a time.
    pub async fn run_backfill(&self) -> BackfillReport {
        info!(
            sensors = self.registry.len(),
            range = %self.settings.range,
            intervals = ?self.scheduler.intervals(),
            "Starting backfill"
        );

        stream::iter(self.registry.iter())
            .map(|sensor| self.backfill_sensor(sensor))
            .buffer_unordered(self.workers())
            .fold(BackfillReport::default(), |mut total, report| async move {
                total.absorb(report);
                total
            })
            .await
    }

    async fn backfill_sensor(&self, sensor: &SensorIdentity) -> BackfillReport {
        info!(serial = %sensor.serial, sensor_id = sensor.numeric_id, "Backfilling sensor");
        let mut report = BackfillReport {
            sensors: 1,
            ..Default::default()
        };

        let range = &self.settings.range;
        for window in WindowIterator::new(range.start(), range.end(), self.settings.backfill_stride) {
            report.windows += 1;
            debug!(serial = %sensor.serial, window = %window, "Backfilling window");

            for spec in self.scheduler.plan(&sensor.serial, &window) {
                self.submit_backfill(sensor, &spec, &mut report).await;
            }
        }

        info!(
            serial = %sensor.serial,
            submitted = report.submitted,
            failed = report.failed,
            "Sensor done"
        );
        report
    }

    /// Submit the `1w` downsample once per sensor over the whole range.
    pub async fn run_weekly_backfill(&self) -> BackfillReport {
        info!(
            sensors = self.registry.len(),
            range = %self.settings.range,
            "Starting weekly backfill"
        );

        let mut report = BackfillReport::default();
        for sensor in self.registry.iter() {
            report.sensors += 1;
            report.windows += 1;
            let spec = self.scheduler.plan_weekly(&sensor.serial, &self.settings.range);
            self.submit_backfill(sensor, &spec, &mut report).await;
        }
        report
    }

    async fn submit_backfill(
        &self,
        sensor: &SensorIdentity,
        spec: &DownsampleSpec,
        report: &mut BackfillReport,
    ) {
        self.limiter.acquire().await;
        let outcome = self.destination.backfill(spec).await;
        report.submitted += 1;

        if outcome.success {
            debug!(
                serial = %sensor.serial,
                interval = %spec.interval,
                window = %spec.window,
                "Backfill submitted"
            );
        } else {
            report.failed += 1;
            error!(
                serial = %sensor.serial,
                sensor_id = sensor.numeric_id,
                interval = %spec.interval,
                window_start = %spec.window.start(),
                window_end = %spec.window.end(),
                status = outcome.status_code,
                body = %outcome.body,
                "Backfill failed"
            );
        }
    }

    /// Write one placeholder reading per sensor into the source store so every
    /// column exists in each sensor's series before `select *` runs against it.
    pub async fn seed_fields(&self) -> BackfillReport {
        info!(sensors = self.registry.len(), "Seeding fields");

        let mut report = BackfillReport::default();
        for sensor in self.registry.iter() {
            report.sensors += 1;
            self.limiter.acquire().await;
            let outcome = self.source.write(&[seed_point(&sensor.serial)]).await;
            report.submitted += 1;

            if !outcome.success {
                report.failed += 1;
                error!(
                    serial = %sensor.serial,
                    status = outcome.status_code,
                    body = %outcome.body,
                    "Seeding failed"
                );
            }
        }
        report
    }
}

/// Placeholder reading in the sensor's source series.
pub fn seed_point(serial: &str) -> Point {
    Point::new(format!("{}.{}", READING_SERIES, serial), Local::now())
        .tag(SENSOR_ID, SEED_SENSOR_ID)
        .tag(SERIAL_NUMBER, serial)
        .field(RAW_MESSAGE, SEED_RAW_MESSAGE)
        .field(HUMIDITY, 0i64)
        .field(TEMPERATURE, 0i64)
        .field(RESISTANCE, 0i64)
}
