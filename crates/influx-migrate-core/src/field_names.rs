//! Column, tag and field names shared by both schema versions.
//!
//! The 0.8 schema stores every value as a column of a per-sensor series.
//! The 0.9 schema splits the same names into tags (identity) and fields
//! (measurements) of the single `reading` measurement.

/// Numeric sensor id. Column in 0.8, tag in 0.9.
pub const SENSOR_ID: &str = "SensorId";
/// Sensor serial code. Tag in 0.9; implicit in the series name in 0.8.
pub const SERIAL_NUMBER: &str = "SensorSerialCode";
/// Raw device payload as received.
pub const RAW_MESSAGE: &str = "RawMessage";
pub const HUMIDITY: &str = "Humidity";
pub const TEMPERATURE: &str = "Temperature";
pub const RESISTANCE: &str = "Resistance";
/// Timestamp column, milliseconds since the Unix epoch when queried with ms precision.
pub const TIME: &str = "time";

/// Measured metrics that get downsampled, in aggregation order.
pub const METRICS: [&str; 3] = [TEMPERATURE, HUMIDITY, RESISTANCE];

/// Tags preserved on every destination point and every downsampled series.
pub const TAGS: [&str; 2] = [SENSOR_ID, SERIAL_NUMBER];
