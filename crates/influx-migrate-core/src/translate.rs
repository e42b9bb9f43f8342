//! Source row → destination point translation.
//!
//! Every value is located by column name. The source store makes no promise
//! about column order and 0.8 servers add bookkeeping columns such as
//! `sequence_number` wherever they like.
//!
//! Timestamps come back as milliseconds since the epoch and are held as
//! `DateTime<Local>`. The destination receives the absolute instant, but any
//! rendering of a point (logs, debug output) follows the host time zone, so
//! two hosts in different zones print different wall-clock times for the same
//! point.

use crate::error::TranslationError;
use crate::field_names::{
    HUMIDITY, RAW_MESSAGE, RESISTANCE, SENSOR_ID, SERIAL_NUMBER, TEMPERATURE, TIME,
};
use crate::point::Point;
use crate::scalar::Scalar;
use crate::sensors::{SensorIdentity, SensorRegistry};
use crate::series::{RawRow, RawSeries};
use crate::READING_SERIES;
use chrono::{DateTime, Local, TimeZone};

/// Maps source rows onto the destination `reading` point shape.
#[derive(Debug, Clone)]
pub struct SchemaTranslator {
    series_name: String,
}

impl Default for SchemaTranslator {
    fn default() -> Self {
        Self::new(READING_SERIES)
    }
}

impl SchemaTranslator {
    pub fn new(series_name: impl Into<String>) -> Self {
        Self {
            series_name: series_name.into(),
        }
    }

    /// Translate one row for a known sensor.
    pub fn translate(
        &self,
        row: &RawRow<'_>,
        sensor: &SensorIdentity,
    ) -> Result<Point, TranslationError> {
        if row.columns.len() != row.values.len() {
            return Err(TranslationError::RowShape {
                columns: row.columns.len(),
                values: row.values.len(),
            });
        }

        // The source id is from the old id space; only its presence is checked.
        required(row, SENSOR_ID)?;

        let raw_message = non_null(row, RAW_MESSAGE)?.to_string();
        let temperature = integer(row, TEMPERATURE)?;
        let humidity = integer(row, HUMIDITY)?;
        let resistance = integer(row, RESISTANCE)?;
        let timestamp = timestamp(row, TIME)?;

        Ok(Point::new(self.series_name.as_str(), timestamp)
            .tag(SENSOR_ID, sensor.numeric_id)
            .tag(SERIAL_NUMBER, sensor.serial.as_str())
            .field(RAW_MESSAGE, raw_message)
            .field(HUMIDITY, humidity)
            .field(TEMPERATURE, temperature)
            .field(RESISTANCE, resistance))
    }

    /// Translate every row of a series whose name has already been reduced to
    /// the sensor serial. Stops at the first bad row.
    pub fn translate_series(
        &self,
        series: &RawSeries,
        registry: &SensorRegistry,
    ) -> Result<Vec<Point>, TranslationError> {
        let sensor = registry
            .get(&series.name)
            .ok_or_else(|| TranslationError::UnknownSensor {
                series: series.name.clone(),
            })?;

        series.rows().map(|row| self.translate(&row, sensor)).collect()
    }

    /// Translate a whole query result.
    pub fn translate_all(
        &self,
        series: &[RawSeries],
        registry: &SensorRegistry,
    ) -> Result<Vec<Point>, TranslationError> {
        let mut points = Vec::with_capacity(series.iter().map(RawSeries::len).sum());
        for s in series {
            points.extend(self.translate_series(s, registry)?);
        }
        Ok(points)
    }
}

fn required<'a>(row: &RawRow<'a>, column: &str) -> Result<&'a Scalar, TranslationError> {
    row.get(column)
        .ok_or_else(|| TranslationError::MissingColumn {
            column: column.to_string(),
            available: row.columns.join(", "),
        })
}

fn non_null<'a>(row: &RawRow<'a>, column: &str) -> Result<&'a Scalar, TranslationError> {
    let value = required(row, column)?;
    if value.is_null() {
        return Err(TranslationError::NullValue {
            column: column.to_string(),
        });
    }
    Ok(value)
}

fn integer(row: &RawRow<'_>, column: &str) -> Result<i64, TranslationError> {
    let value = non_null(row, column)?;
    value
        .as_integer()
        .ok_or_else(|| TranslationError::InvalidInteger {
            column: column.to_string(),
            value: value.to_string(),
        })
}

fn timestamp(row: &RawRow<'_>, column: &str) -> Result<DateTime<Local>, TranslationError> {
    let value = non_null(row, column)?;
    let invalid = || TranslationError::InvalidTimestamp {
        column: column.to_string(),
        value: value.to_string(),
    };
    let millis = value.as_integer().ok_or_else(invalid)?;
    Local.timestamp_millis_opt(millis).single().ok_or_else(invalid)
}
