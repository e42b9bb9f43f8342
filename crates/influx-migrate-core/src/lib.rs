// influx-migrate-core - Store-agnostic migration logic
//
// Everything in here is PURE: time windowing, fetch filters, the sensor
// registry, row-to-point translation and downsample planning.
// No I/O, no async, no runtime dependencies. Talking to a store is the job of
// influx-migrate-store; driving the loops is the job of the root crate.

pub mod downsample;
pub mod error;
pub mod field_names;
pub mod filter;
pub mod point;
pub mod scalar;
pub mod sensors;
pub mod series;
pub mod translate;
pub mod window;

pub use downsample::{
    AggregateFunction, AggregationExpression, BackfillScheduler, DownsampleInterval,
    DownsampleSpec, FillPolicy,
};
pub use error::{ConfigError, TranslationError};
pub use filter::{quote_literal, FetchFilter, STORE_TIME_FORMAT};
pub use point::Point;
pub use scalar::Scalar;
pub use sensors::{SensorIdentity, SensorRegistry};
pub use series::{RawRow, RawSeries};
pub use translate::SchemaTranslator;
pub use window::{TimeWindow, WindowIterator};

/// Series (measurement) holding raw readings in both schema versions.
pub const READING_SERIES: &str = "reading";

/// Resolution at which readings are stored unaggregated.
pub const DEFAULT_RESOLUTION: &str = "5s";
