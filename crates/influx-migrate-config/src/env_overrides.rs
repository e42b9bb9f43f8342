use super::{LogFormat, RuntimeConfig, StoreConfig, StoreVersion};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "INFLUX_MIGRATE_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    /// Get a variable by its name without the INFLUX_MIGRATE_ prefix.
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    apply_store_overrides(&mut config.source, env, "SOURCE")?;
    apply_store_overrides(&mut config.destination, env, "DESTINATION")?;

    // Migration loop
    if let Some(from) = get_env_string(env, "FROM") {
        config.migration.from = from;
    }
    if let Some(to) = get_env_string(env, "TO") {
        config.migration.to = if to.is_empty() { None } else { Some(to) };
    }
    if let Some(val) = get_env_u64(env, "DELAY_MS")? {
        config.migration.delay_ms = val;
    }
    if let Some(val) = get_env_u64(env, "WINDOW_HOURS")? {
        config.migration.window_hours = val;
    }
    if let Some(val) = get_env_string(env, "DEFAULT_RESOLUTION") {
        config.migration.default_resolution = val;
    }
    if let Some(val) = get_env_string(env, "METRIC") {
        config.migration.metric = val;
    }
    if let Some(val) = get_env_usize(env, "MAX_POINTS_PER_WRITE")? {
        config.migration.max_points_per_write = val;
    }
    if let Some(val) = get_env_usize(env, "WORKERS")? {
        config.migration.workers = val;
    }
    if let Some(val) = get_env_bool(env, "HALT_ON_UNREACHABLE_SENSOR")? {
        config.migration.halt_on_unreachable_sensor = val;
    }

    // Backfill loop
    if let Some(list) = get_env_string(env, "BACKFILL_INTERVALS") {
        config.backfill.intervals = split_list(&list);
    }
    if let Some(val) = get_env_u64(env, "BACKFILL_WINDOW_DAYS")? {
        config.backfill.window_days = val;
    }

    // Sensors, as a comma-separated roster of serial=id pairs
    if let Some(list) = get_env_string(env, "SENSORS") {
        let mut roster = Vec::new();
        let mut ids = std::collections::HashMap::new();
        for entry in split_list(&list) {
            let (serial, id) = entry.split_once('=').ok_or_else(|| {
                anyhow!(
                    "Invalid {}SENSORS entry '{}' (expected SERIAL=ID)",
                    ENV_PREFIX,
                    entry
                )
            })?;
            let id = id.trim().parse::<i64>().with_context(|| {
                format!("Invalid sensor id for '{}' in {}SENSORS", serial, ENV_PREFIX)
            })?;
            roster.push(serial.trim().to_string());
            ids.insert(serial.trim().to_string(), id);
        }
        config.sensors.roster = roster;
        config.sensors.ids = ids;
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.log.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.log.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn apply_store_overrides<E: EnvSource>(
    store: &mut StoreConfig,
    env: &E,
    section: &str,
) -> Result<()> {
    let key = |name: &str| format!("{}_{}", section, name);

    if let Some(version) = get_env_string(env, &key("VERSION")) {
        store.version = version
            .parse::<StoreVersion>()
            .with_context(|| format!("Invalid {}{} value", ENV_PREFIX, key("VERSION")))?;
    }
    if let Some(uri) = get_env_string(env, &key("URI")) {
        store.uri = uri;
    }
    if let Some(username) = get_env_string(env, &key("USERNAME")) {
        store.username = username;
    }
    if let Some(password) = get_env_string(env, &key("PASSWORD")) {
        store.password = password;
    }
    if let Some(database) = get_env_string(env, &key("DATABASE")) {
        store.database = database;
    }
    if let Some(val) = get_env_u64(env, &key("TIMEOUT_SECS"))? {
        store.timeout_secs = val;
    }
    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val.parse::<bool>().map_err(|e| {
                anyhow!(
                    "Failed to parse {}{} (expected bool): {}",
                    ENV_PREFIX,
                    key,
                    e
                )
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
