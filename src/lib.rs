// influx-migrate - Move sensor readings from InfluxDB 0.8 to 0.9
//
// The library drives two loops over the configured sensor roster:
// - migration: fetch raw readings per day window, translate them to the 0.9
//   point shape, write them to the destination
// - backfill: ask the destination to materialize downsampled rollups per
//   week window and interval
//
// Store clients live in influx-migrate-store, the pure planning and
// translation logic in influx-migrate-core.

use anyhow::{Context, Result};
use influx_migrate_config::RuntimeConfig;
use std::sync::Arc;
use tracing::info;

mod error;
mod fetch;
mod init;
mod orchestrator;
mod rate_limit;
mod writer;

pub use error::WindowError;
pub use fetch::{FetchError, FetchStrategy};
pub use init::{build_store, init_tracing, with_startup_logging};
pub use orchestrator::{
    seed_point, BackfillReport, MigrationOrchestrator, MigrationReport, MigrationSettings,
    SEED_RAW_MESSAGE, SEED_SENSOR_ID,
};
pub use rate_limit::RateLimiter;
pub use writer::WriteCoordinator;

/// Which part of the run to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Migration followed by the automatic backfill.
    #[default]
    All,
    Migrate,
    Backfill,
    /// The manually triggered `1w` backfill over the whole range.
    WeeklyBackfill,
    /// Placeholder readings so every source series has every column.
    SeedFields,
}

/// Build stores and the orchestrator from a validated config.
pub fn build_orchestrator(config: &RuntimeConfig) -> Result<MigrationOrchestrator> {
    let resolution = config.migration.default_resolution.as_str();
    let source = init::build_store("source", &config.source, resolution)?;
    let destination = init::build_store("destination", &config.destination, resolution)?;

    let registry = config.sensors.registry().context("Invalid sensor roster")?;
    let scheduler = config
        .backfill
        .scheduler()
        .context("Invalid backfill intervals")?;
    let settings =
        MigrationSettings::from_config(config).context("Invalid migration time range")?;

    Ok(MigrationOrchestrator::new(
        source,
        destination,
        Arc::new(registry),
        scheduler,
        settings,
    ))
}

/// Run one phase against the configured stores.
pub async fn run_with_config(config: RuntimeConfig, phase: Phase) -> Result<()> {
    init_tracing(&config);
    let orchestrator = build_orchestrator(&config)?;
    run_phase(&orchestrator, phase).await
}

/// Run one phase with an already built orchestrator.
///
/// Window failures are logged and counted, never returned; the only error is
/// an unreachable sensor when the config asks to halt on it.
pub async fn run_phase(orchestrator: &MigrationOrchestrator, phase: Phase) -> Result<()> {
    if matches!(phase, Phase::SeedFields) {
        let report = orchestrator.seed_fields().await;
        info!(
            sensors = report.sensors,
            failed = report.failed,
            "Seeding complete"
        );
        return Ok(());
    }

    if matches!(phase, Phase::All | Phase::Migrate) {
        let report = orchestrator
            .run_migration()
            .await
            .context("Migration halted")?;
        info!(
            sensors = report.sensors,
            windows = report.windows,
            empty_windows = report.empty_windows,
            failed_windows = report.failed_windows,
            failed_writes = report.failed_writes,
            points_read = report.points_read,
            points_written = report.points_written,
            "Migration complete"
        );
    }

    if matches!(phase, Phase::All | Phase::Backfill) {
        let report = orchestrator.run_backfill().await;
        info!(
            sensors = report.sensors,
            windows = report.windows,
            submitted = report.submitted,
            failed = report.failed,
            "Backfill complete"
        );
    }

    if matches!(phase, Phase::WeeklyBackfill) {
        let report = orchestrator.run_weekly_backfill().await;
        info!(
            sensors = report.sensors,
            submitted = report.submitted,
            failed = report.failed,
            "Weekly backfill complete"
        );
    }

    Ok(())
}
