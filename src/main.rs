use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use influx_migrate::Phase;
use influx_migrate_config::RuntimeConfig;
use std::path::PathBuf;

/// Migrate sensor readings from InfluxDB 0.8 to 0.9 and rebuild rollups
#[derive(Parser)]
#[command(name = "influx-migrate")]
#[command(version)]
#[command(about = "Migrate sensor readings from InfluxDB 0.8 to 0.9 and rebuild rollups", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Which part of the run to execute
    #[arg(short, long, value_enum, default_value_t = PhaseArg::All)]
    phase: PhaseArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PhaseArg {
    /// Migrate raw readings, then backfill rollups
    All,
    /// Migrate raw readings only
    Migrate,
    /// Backfill the automatic rollup intervals only
    Backfill,
    /// Backfill the weekly rollup over the whole range
    WeeklyBackfill,
    /// Write one placeholder reading per sensor to the source
    SeedFields,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::All => Phase::All,
            PhaseArg::Migrate => Phase::Migrate,
            PhaseArg::Backfill => Phase::Backfill,
            PhaseArg::WeeklyBackfill => Phase::WeeklyBackfill,
            PhaseArg::SeedFields => Phase::SeedFields,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // Step 1: Load configuration (file, env overrides, validation)
    let mut config =
        influx_migrate::with_startup_logging(std::io::stderr, || load_config(&cli))?;

    // Step 2: Apply CLI overrides (highest priority)
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }

    // Step 3: Initialize tracing early so startup info shows up
    // Note: run_with_config will also call init_tracing, but that's idempotent
    influx_migrate::init_tracing(&config);

    display_startup_info(&config, cli.phase);

    influx_migrate::run_with_config(config, cli.phase.into()).await
}

fn load_config(cli: &Cli) -> Result<RuntimeConfig> {
    if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))
    } else {
        RuntimeConfig::load().context("Failed to load configuration")
    }
}

fn display_startup_info(config: &RuntimeConfig, phase: PhaseArg) {
    use tracing::info;

    info!("╭─────────────────────────────────────────────────");
    info!("│ influx-migrate v{}", env!("CARGO_PKG_VERSION"));
    info!("├─────────────────────────────────────────────────");
    info!("│ Phase: {:?}", phase);
    info!(
        "│ Source: InfluxDB {} at {} ({})",
        config.source.version, config.source.uri, config.source.database
    );
    info!(
        "│ Destination: InfluxDB {} at {} ({})",
        config.destination.version, config.destination.uri, config.destination.database
    );
    info!(
        "│ Range: {} .. {}",
        config.migration.from,
        config.migration.to.as_deref().unwrap_or("now")
    );
    info!("│ Sensors: {}", config.sensors.roster.len());
    info!("│ Request delay: {} ms", config.migration.delay_ms);
    info!("│ Workers: {}", config.migration.workers);
    info!("│ Backfill intervals: {}", config.backfill.intervals.join(", "));
    info!("│ Log level: {}", config.log.level);
    info!("╰─────────────────────────────────────────────────");
}
