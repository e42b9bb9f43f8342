// Initialization utilities
//
// Store clients and logging/tracing setup

use anyhow::Result;
use influx_migrate_config::{LogFormat, RuntimeConfig, StoreConfig, StoreVersion};
use influx_migrate_store::{
    ConnectionSettings, InfluxV08Store, InfluxV09Store, ReqwestHttpClient, TimeSeriesStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;

/// Build the client for one configured store.
pub fn build_store(
    role: &str,
    config: &StoreConfig,
    default_resolution: &str,
) -> Result<Arc<dyn TimeSeriesStore>> {
    info!(
        "Initializing {} store: InfluxDB {} at {} (database {})",
        role, config.version, config.uri, config.database
    );

    let http = Arc::new(ReqwestHttpClient::new(config.timeout())?);
    let settings = ConnectionSettings {
        uri: config.uri.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
        database: config.database.clone(),
        timeout: config.timeout(),
    };

    let store: Arc<dyn TimeSeriesStore> = match config.version {
        StoreVersion::V08 => Arc::new(
            InfluxV08Store::new(settings, http).with_default_resolution(default_resolution),
        ),
        StoreVersion::V09 => Arc::new(
            InfluxV09Store::new(settings, http).with_default_resolution(default_resolution),
        ),
    };
    Ok(store)
}

/// Run `f` under a warn-level subscriber writing to `writer`.
///
/// Config loading happens before the configured subscriber is installed; this
/// keeps its validation warnings visible.
pub fn with_startup_logging<W, T>(writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

/// Initialize tracing/logging from RuntimeConfig
pub fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.log.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}
