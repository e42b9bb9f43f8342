//! Downsample (rollup) planning.
//!
//! A [`DownsampleSpec`] describes one aggregation-backfill request: which
//! aggregates to compute over which interval, where to read from, where to
//! write to and for which sensor. Rendering it into a store statement is the
//! store client's business.

use crate::error::ConfigError;
use crate::field_names::{METRICS, SERIAL_NUMBER, TAGS};
use crate::filter::quote_literal;
use crate::window::TimeWindow;
use crate::READING_SERIES;
use std::fmt;
use std::str::FromStr;

/// Rollup granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DownsampleInterval {
    ThirtySeconds,
    OneMinute,
    FiveMinutes,
    OneHour,
    OneDay,
    OneWeek,
}

impl DownsampleInterval {
    /// Intervals backfilled window by window. `1w` is left out: on 7-day
    /// windows that do not line up with week boundaries it produces partial
    /// buckets at both edges, so it runs once over the full range instead.
    pub const AUTOMATIC: [DownsampleInterval; 5] = [
        DownsampleInterval::ThirtySeconds,
        DownsampleInterval::OneMinute,
        DownsampleInterval::FiveMinutes,
        DownsampleInterval::OneHour,
        DownsampleInterval::OneDay,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ThirtySeconds => "30s",
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
        }
    }

    pub fn is_weekly(&self) -> bool {
        matches!(self, Self::OneWeek)
    }
}

impl fmt::Display for DownsampleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DownsampleInterval {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "30s" => Ok(Self::ThirtySeconds),
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "1h" => Ok(Self::OneHour),
            "1d" => Ok(Self::OneDay),
            "1w" => Ok(Self::OneWeek),
            other => Err(ConfigError::UnknownInterval(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Mean,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Suffix appended to the metric name to form the output alias.
    fn alias_suffix(&self) -> &'static str {
        match self {
            Self::Mean => "",
            Self::Min => "Min",
            Self::Max => "Max",
        }
    }
}

/// `function(source_field) as alias`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationExpression {
    pub function: AggregateFunction,
    pub source_field: String,
    pub alias: String,
}

impl AggregationExpression {
    pub fn new(function: AggregateFunction, metric: &str) -> Self {
        Self {
            function,
            source_field: metric.to_string(),
            alias: format!("{}{}", metric, function.alias_suffix()),
        }
    }
}

impl fmt::Display for AggregationExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) as {}",
            self.function.name(),
            self.source_field,
            self.alias
        )
    }
}

/// How empty interval buckets are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    /// Empty buckets produce no point.
    None,
}

impl FillPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownsampleSpec {
    pub interval: DownsampleInterval,
    pub aggregations: Vec<AggregationExpression>,
    pub source_series: String,
    pub destination_series: String,
    /// Source tags kept on the downsampled points.
    pub tags: Vec<String>,
    /// Predicates ANDed into the source selection.
    pub filters: Vec<String>,
    pub fill: FillPolicy,
    pub window: TimeWindow,
}

impl DownsampleSpec {
    pub fn new(
        source_series: &str,
        interval: DownsampleInterval,
        serial: &str,
        window: TimeWindow,
    ) -> Self {
        Self {
            interval,
            aggregations: default_aggregations(),
            source_series: source_series.to_string(),
            destination_series: destination_series(source_series, interval),
            tags: TAGS.iter().map(|t| t.to_string()).collect(),
            filters: vec![format!("{}={}", SERIAL_NUMBER, quote_literal(serial))],
            fill: FillPolicy::None,
            window,
        }
    }
}

/// `"<source>.downsample.<interval>"`
pub fn destination_series(source_series: &str, interval: DownsampleInterval) -> String {
    format!("{}.downsample.{}", source_series, interval.label())
}

/// mean, then min, then max; each over Temperature, Humidity, Resistance.
fn default_aggregations() -> Vec<AggregationExpression> {
    [
        AggregateFunction::Mean,
        AggregateFunction::Min,
        AggregateFunction::Max,
    ]
    .iter()
    .flat_map(|function| {
        METRICS
            .iter()
            .map(move |metric| AggregationExpression::new(*function, metric))
    })
    .collect()
}

/// Turns (sensor, window) pairs into downsample specs.
#[derive(Debug, Clone)]
pub struct BackfillScheduler {
    intervals: Vec<DownsampleInterval>,
    source_series: String,
}

impl Default for BackfillScheduler {
    fn default() -> Self {
        Self {
            intervals: DownsampleInterval::AUTOMATIC.to_vec(),
            source_series: READING_SERIES.to_string(),
        }
    }
}

impl BackfillScheduler {
    /// Build a scheduler for an explicit interval list. `1w` is refused here;
    /// use [`BackfillScheduler::plan_weekly`] for it.
    pub fn new(
        intervals: Vec<DownsampleInterval>,
        source_series: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(weekly) = intervals.iter().find(|i| i.is_weekly()) {
            return Err(ConfigError::WeeklyInAutomaticSet(weekly.label().to_string()));
        }
        Ok(Self {
            intervals,
            source_series: source_series.into(),
        })
    }

    pub fn intervals(&self) -> &[DownsampleInterval] {
        &self.intervals
    }

    /// One spec per configured interval, in configured order.
    pub fn plan(&self, serial: &str, window: &TimeWindow) -> Vec<DownsampleSpec> {
        self.intervals
            .iter()
            .map(|interval| DownsampleSpec::new(&self.source_series, *interval, serial, *window))
            .collect()
    }

    /// The `1w` spec, meant to cover the whole migration range in one request.
    pub fn plan_weekly(&self, serial: &str, range: &TimeWindow) -> DownsampleSpec {
        DownsampleSpec::new(
            &self.source_series,
            DownsampleInterval::OneWeek,
            serial,
            *range,
        )
    }
}
