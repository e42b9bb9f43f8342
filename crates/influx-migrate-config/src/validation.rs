// Configuration validation
//
// Checks everything the run depends on before the first request is sent.

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_store_config("source", &config.source)?;
    validate_store_config("destination", &config.destination)?;
    validate_migration_config(&config.migration)?;
    validate_backfill_config(&config.backfill)?;
    validate_sensors_config(&config.sensors)?;

    if config.log.level.trim().is_empty() {
        bail!("log.level must not be empty");
    }

    Ok(())
}

fn validate_store_config(section: &str, config: &StoreConfig) -> Result<()> {
    if config.uri.trim().is_empty() {
        bail!("{}.uri must not be empty", section);
    }

    if !config.uri.starts_with("http://") && !config.uri.starts_with("https://") {
        bail!(
            "{}.uri must be an http(s) URL, got '{}'. How to fix: use e.g. http://localhost:8086",
            section,
            config.uri
        );
    }

    if config.database.trim().is_empty() {
        bail!(
            "{}.database is required. How to fix: set it in the [{}] section or via {}{}_DATABASE",
            section,
            section,
            ENV_PREFIX,
            section.to_uppercase()
        );
    }

    if config.timeout_secs == 0 {
        bail!("{}.timeout_secs must be greater than 0", section);
    }

    Ok(())
}

fn validate_migration_config(config: &MigrationConfig) -> Result<()> {
    config.time_range()?;

    if config.window_hours == 0 {
        bail!("migration.window_hours must be greater than 0");
    }

    if config.max_points_per_write == 0 {
        bail!("migration.max_points_per_write must be greater than 0");
    }

    if config.workers == 0 {
        bail!("migration.workers must be at least 1");
    }

    if config.metric.trim().is_empty() {
        bail!("migration.metric must not be empty (use \"*\" for every column)");
    }

    if config.delay_ms > 60_000 {
        warn!(
            delay_ms = config.delay_ms,
            "migration.delay_ms is very large; the run will take a long time"
        );
    }

    if config.workers > 16 {
        warn!(
            workers = config.workers,
            "migration.workers is high; the shared rate limit still caps throughput"
        );
    }

    Ok(())
}

fn validate_backfill_config(config: &BackfillConfig) -> Result<()> {
    if config.window_days == 0 {
        bail!("backfill.window_days must be greater than 0");
    }

    if config.source_series.trim().is_empty() {
        bail!("backfill.source_series must not be empty");
    }

    if config.intervals.is_empty() {
        warn!("backfill.intervals is empty; the backfill phase will do nothing");
    }

    config.scheduler()?;
    Ok(())
}

fn validate_sensors_config(config: &SensorsConfig) -> Result<()> {
    config.registry()?;

    let unused = config
        .ids
        .keys()
        .filter(|serial| !config.roster.contains(*serial))
        .count();
    if unused > 0 {
        warn!(unused, "sensors.ids has entries for serials outside the roster");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.source.database = "legacy".into();
        config.destination.database = "sensors".into();
        config.sensors.roster = vec!["0000AAAA".into()];
        config.sensors.ids.insert("0000AAAA".into(), 7);
        config
    }

    #[test]
    fn defaults_with_required_fields_are_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn rejects_missing_sensor_id() {
        let mut config = valid();
        config.sensors.roster.push("0000BBBB".into());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("0000BBBB"));
    }

    #[test]
    fn rejects_weekly_in_automatic_set() {
        let mut config = valid();
        config.backfill.intervals.push("1w".into());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("weekly"));
    }

    #[test]
    fn rejects_unknown_interval() {
        let mut config = valid();
        config.backfill.intervals = vec!["2h".into()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_inverted_range() {
        let mut config = valid();
        config.migration.from = "2020-01-02 00:00:00".into();
        config.migration.to = Some("2020-01-01 00:00:00".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_missing_database_with_hint() {
        let mut config = valid();
        config.destination.database.clear();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("destination.database"));
        assert!(err.contains("INFLUX_MIGRATE_DESTINATION_DATABASE"));
    }

    #[test]
    fn rejects_zero_sizes() {
        let cases: [fn(&mut RuntimeConfig); 5] = [
            |c| c.migration.window_hours = 0,
            |c| c.migration.max_points_per_write = 0,
            |c| c.migration.workers = 0,
            |c| c.backfill.window_days = 0,
            |c| c.source.timeout_secs = 0,
        ];
        for mutate in cases {
            let mut config = valid();
            mutate(&mut config);
            assert!(validate_config(&config).is_err());
        }
    }
}
