use crate::scalar::Scalar;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;

/// A destination point: measurement name, identity tags, measured fields and
/// a millisecond timestamp.
///
/// Tags and fields are ordered maps so two points built from the same data
/// compare and serialize identically regardless of input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub series_name: String,
    pub tags: BTreeMap<String, Scalar>,
    pub fields: BTreeMap<String, Scalar>,
    /// Held in the host time zone; the store receives the absolute instant.
    pub timestamp: DateTime<Local>,
}

impl Point {
    pub fn new(series_name: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            series_name: series_name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}
