//! Columnar query results.

use crate::scalar::Scalar;
use serde::{Deserialize, Serialize};

/// One series returned by a store query: a name, an ordered column list and
/// rows of values. Column order is whatever the store chose; nothing may rely
/// on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub points: Vec<Vec<Scalar>>,
}

impl RawSeries {
    pub fn new(name: impl Into<String>, columns: Vec<String>, points: Vec<Vec<Scalar>>) -> Self {
        Self {
            name: name.into(),
            columns,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.points.iter().map(move |values| RawRow {
            columns: &self.columns,
            values,
        })
    }

    /// Strip store naming decoration, keeping the part after the last `.`.
    ///
    /// `reading.0000AAAA` and `5m.reading.0000AAAA` both become `0000AAAA`.
    pub fn strip_namespace(&mut self) {
        if let Some(idx) = self.name.rfind('.') {
            self.name = self.name[idx + 1..].to_string();
        }
    }
}

/// A borrowed view of one row together with its column names.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    pub columns: &'a [String],
    pub values: &'a [Scalar],
}

impl<'a> RawRow<'a> {
    pub fn new(columns: &'a [String], values: &'a [Scalar]) -> Self {
        Self { columns, values }
    }

    /// Look a value up by column name.
    pub fn get(&self, column: &str) -> Option<&'a Scalar> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }
}
