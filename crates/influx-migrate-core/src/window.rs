//! Half-open time windows and the iterator that tiles a range with them.

use crate::error::ConfigError;
use crate::filter::STORE_TIME_FORMAT;
use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ConfigError> {
        if start >= end {
            return Err(ConfigError::EmptyWindow {
                start: start.format(STORE_TIME_FORMAT).to_string(),
                end: end.format(STORE_TIME_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format(STORE_TIME_FORMAT),
            self.end.format(STORE_TIME_FORMAT)
        )
    }
}

/// Lazily tiles `[start, end)` with windows of a fixed stride.
///
/// A window is produced while its start is strictly before `end`. The last
/// window is not clipped and may reach up to one stride past `end`.
/// Clone before consuming to walk the same range again.
#[derive(Debug, Clone)]
pub struct WindowIterator {
    next_start: NaiveDateTime,
    end: NaiveDateTime,
    stride: TimeDelta,
}

impl WindowIterator {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, stride: TimeDelta) -> Self {
        Self {
            next_start: start,
            end,
            stride,
        }
    }
}

impl Iterator for WindowIterator {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stride <= TimeDelta::zero() || self.next_start >= self.end {
            return None;
        }
        let start = self.next_start;
        let end = start.checked_add_signed(self.stride)?;
        self.next_start = end;
        Some(TimeWindow { start, end })
    }
}
