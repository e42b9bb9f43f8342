//! InfluxDB 0.9 line protocol encoding with millisecond precision.
//!
//! `measurement,tag=value field=1i,other="text" 1577836800000`

use influx_migrate_core::{Point, Scalar};
use std::fmt::Write;

/// Encode points one per line. Points without any non-null field cannot be
/// represented and are left out.
pub fn encode(points: &[Point]) -> String {
    let mut out = String::new();
    for point in points {
        if let Some(line) = encode_point(point) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

pub fn encode_point(point: &Point) -> Option<String> {
    let fields: Vec<String> = point
        .fields
        .iter()
        .filter_map(|(key, value)| field_value(value).map(|v| format!("{}={}", escape_key(key), v)))
        .collect();
    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(&point.series_name);
    for (key, value) in &point.tags {
        if value.is_null() {
            continue;
        }
        // Writing to a String cannot fail.
        let _ = write!(line, ",{}={}", escape_key(key), escape_key(&value.to_string()));
    }
    line.push(' ');
    line.push_str(&fields.join(","));
    let _ = write!(line, " {}", point.timestamp_millis());
    Some(line)
}

fn field_value(value: &Scalar) -> Option<String> {
    match value {
        Scalar::Null => None,
        Scalar::Bool(v) => Some(v.to_string()),
        Scalar::Int(v) => Some(format!("{}i", v)),
        Scalar::Float(v) if v.is_finite() => Some(format!("{:?}", v)),
        Scalar::Float(_) => None,
        Scalar::String(v) => Some(format!(
            "\"{}\"",
            v.replace('\\', "\\\\").replace('"', "\\\"")
        )),
    }
}

fn escape_measurement(name: &str) -> String {
    name.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(key: &str) -> String {
    key.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
