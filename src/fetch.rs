//! Reading from the source store with a per-sensor fallback.

use crate::rate_limit::RateLimiter;
use influx_migrate_core::{FetchFilter, RawSeries};
use influx_migrate_store::{StoreQueryError, TimeSeriesStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("sensor {serial} could not be read")]
    SensorUnavailable {
        serial: String,
        #[source]
        source: StoreQueryError,
    },
}

/// Batched read that degrades to one query per sensor.
///
/// The batched query is tried first. If the store rejects it, every serial is
/// queried on its own:
///
/// - with a single serial in the filter, that serial's failure is returned as
///   [`FetchError::SensorUnavailable`];
/// - with several serials, a failing serial is logged and contributes nothing,
///   so a multi-sensor fetch never fails.
///
/// Returned series are named by bare serial (`reading.S1` becomes `S1`).
pub struct FetchStrategy {
    store: Arc<dyn TimeSeriesStore>,
    limiter: Arc<RateLimiter>,
}

impl FetchStrategy {
    pub fn new(store: Arc<dyn TimeSeriesStore>, limiter: Arc<RateLimiter>) -> Self {
        Self { store, limiter }
    }

    pub async fn fetch(&self, filter: &FetchFilter) -> Result<Vec<RawSeries>, FetchError> {
        if filter.serials.is_empty() {
            return Ok(Vec::new());
        }

        self.limiter.acquire().await;
        let series = match self.store.query(filter).await {
            Ok(series) => series,
            Err(e) => {
                warn!(
                    store = self.store.name(),
                    sensors = filter.serials.len(),
                    error = %e,
                    "Batched query failed, falling back to per-sensor queries"
                );
                self.fetch_each(filter).await?
            }
        };

        Ok(series
            .into_iter()
            .map(|mut s| {
                s.strip_namespace();
                s
            })
            .collect())
    }

    async fn fetch_each(&self, filter: &FetchFilter) -> Result<Vec<RawSeries>, FetchError> {
        let mut collected = Vec::new();

        for serial in &filter.serials {
            self.limiter.acquire().await;
            match self.store.query(&filter.single(serial)).await {
                Ok(series) => {
                    debug!(serial = %serial, series = series.len(), "Per-sensor query succeeded");
                    collected.extend(series);
                }
                Err(source) if filter.is_single() => {
                    return Err(FetchError::SensorUnavailable {
                        serial: serial.clone(),
                        source,
                    });
                }
                Err(e) => {
                    warn!(serial = %serial, error = %e, "Skipping sensor whose query failed");
                }
            }
        }

        Ok(collected)
    }
}
