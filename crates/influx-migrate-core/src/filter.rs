use crate::error::ConfigError;
use crate::window::TimeWindow;
use chrono::NaiveDateTime;

/// Time format understood by InfluxQL time literals.
pub const STORE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What to read from the source store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFilter {
    /// Sensor serial codes, de-duplicated, in first-seen order.
    pub serials: Vec<String>,
    pub time_from: NaiveDateTime,
    pub time_to: NaiveDateTime,
    /// Point density such as `1m` or `1h`. `None` or the default resolution
    /// means raw readings.
    pub resolution: Option<String>,
    /// Column selector, `*` for everything.
    pub metric: String,
}

impl FetchFilter {
    pub fn new<I, S>(serials: I, time_from: NaiveDateTime, time_to: NaiveDateTime) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for serial in serials {
            let serial = serial.into();
            if !unique.contains(&serial) {
                unique.push(serial);
            }
        }

        Self {
            serials: unique,
            time_from,
            time_to,
            resolution: None,
            metric: "*".to_string(),
        }
    }

    /// Filter for one sensor over one window, all columns, raw resolution.
    pub fn for_sensor(serial: &str, window: &TimeWindow) -> Self {
        Self::new([serial], window.start(), window.end())
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    pub fn is_single(&self) -> bool {
        self.serials.len() == 1
    }

    /// Narrow the filter down to one of its serials.
    pub fn single(&self, serial: &str) -> Self {
        Self {
            serials: vec![serial.to_string()],
            ..self.clone()
        }
    }

    /// Resolution to query at, or `None` for raw data.
    pub fn effective_resolution(&self, default_resolution: &str) -> Option<&str> {
        match self.resolution.as_deref() {
            Some(r) if !r.is_empty() && r != default_resolution => Some(r),
            _ => None,
        }
    }

    pub fn time_from_literal(&self) -> String {
        self.time_from.format(STORE_TIME_FORMAT).to_string()
    }

    pub fn time_to_literal(&self) -> String {
        self.time_to.format(STORE_TIME_FORMAT).to_string()
    }

    /// Parse `yyyy-MM-dd HH:mm:ss` (or the ISO `T`-separated form).
    pub fn parse_time(input: &str) -> Result<NaiveDateTime, ConfigError> {
        let trimmed = input.trim();
        NaiveDateTime::parse_from_str(trimmed, STORE_TIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| {
                chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .map(|d| d.and_time(chrono::NaiveTime::MIN))
            })
            .map_err(|_| ConfigError::InvalidTime {
                value: input.to_string(),
            })
    }
}

/// Single-quoted InfluxQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
