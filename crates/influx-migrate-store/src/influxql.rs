//! InfluxQL statement builders for both store generations.

use influx_migrate_core::field_names::SERIAL_NUMBER;
use influx_migrate_core::{quote_literal, DownsampleSpec, FetchFilter, STORE_TIME_FORMAT};

/// 0.8 keeps one series per sensor: `reading.<serial>`, prefixed with the
/// resolution for pre-aggregated series (`1h.reading.<serial>`).
pub fn v08_series_name(
    measurement: &str,
    serial: &str,
    filter: &FetchFilter,
    default_resolution: &str,
) -> String {
    let series = format!("{}.{}", measurement, serial);
    match filter.effective_resolution(default_resolution) {
        Some(resolution) => format!("{}.{}", resolution, series),
        None => series,
    }
}

/// `select <metric> from <series>, ... where time >= '<from>' and time < '<to>'`
pub fn v08_select(measurement: &str, filter: &FetchFilter, default_resolution: &str) -> String {
    let mut series: Vec<String> = Vec::with_capacity(filter.serials.len());
    for serial in &filter.serials {
        let name = v08_series_name(measurement, serial, filter, default_resolution);
        if !series.contains(&name) {
            series.push(name);
        }
    }

    format!(
        "select {} from {} where time >= '{}' and time < '{}'",
        filter.metric,
        series.join(", "),
        filter.time_from_literal(),
        filter.time_to_literal()
    )
}

/// 0.9 keeps a single measurement tagged by serial; aggregated resolutions live
/// in the `<measurement>.downsample.<resolution>` measurements.
pub fn v09_select(measurement: &str, filter: &FetchFilter, default_resolution: &str) -> String {
    let source = match filter.effective_resolution(default_resolution) {
        Some(resolution) => format!("{}.downsample.{}", measurement, resolution),
        None => measurement.to_string(),
    };

    let serials = filter
        .serials
        .iter()
        .map(|s| format!("{}={}", quote_ident(SERIAL_NUMBER), quote_literal(s)))
        .collect::<Vec<_>>()
        .join(" OR ");

    format!(
        "SELECT {} FROM {} WHERE ({}) AND time >= {} AND time < {} GROUP BY {}",
        filter.metric,
        quote_ident(&source),
        serials,
        quote_literal(&filter.time_from_literal()),
        quote_literal(&filter.time_to_literal()),
        quote_ident(SERIAL_NUMBER)
    )
}

/// `SELECT <aggregations> INTO <destination> FROM <source> WHERE <filters> AND
/// <window> GROUP BY time(<interval>), <tags> fill(<policy>)`
pub fn backfill_statement(spec: &DownsampleSpec) -> String {
    let aggregations = spec
        .aggregations
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let mut predicates: Vec<String> = spec.filters.clone();
    predicates.push(format!(
        "time >= {}",
        quote_literal(&spec.window.start().format(STORE_TIME_FORMAT).to_string())
    ));
    predicates.push(format!(
        "time < {}",
        quote_literal(&spec.window.end().format(STORE_TIME_FORMAT).to_string())
    ));

    let mut group_by = vec![format!("time({})", spec.interval.label())];
    group_by.extend(spec.tags.iter().map(|t| quote_ident(t)));

    format!(
        "SELECT {} INTO {} FROM {} WHERE {} GROUP BY {} fill({})",
        aggregations,
        quote_ident(&spec.destination_series),
        quote_ident(&spec.source_series),
        predicates.join(" AND "),
        group_by.join(", "),
        spec.fill.as_str()
    )
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('\\', "\\\\").replace('"', "\\\""))
}
