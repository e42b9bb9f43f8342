use crate::rate_limit::RateLimiter;
use influx_migrate_core::Point;
use influx_migrate_store::{TimeSeriesStore, WriteOutcome};
use std::sync::Arc;
use tracing::{debug, warn};

/// Submits translated points to the destination in bounded chunks.
///
/// Every chunk is attempted exactly once, each behind the rate limiter. The
/// first failing chunk's outcome is returned, otherwise the last success.
pub struct WriteCoordinator {
    store: Arc<dyn TimeSeriesStore>,
    limiter: Arc<RateLimiter>,
    max_points_per_write: usize,
}

impl WriteCoordinator {
    pub fn new(
        store: Arc<dyn TimeSeriesStore>,
        limiter: Arc<RateLimiter>,
        max_points_per_write: usize,
    ) -> Self {
        Self {
            store,
            limiter,
            max_points_per_write: max_points_per_write.max(1),
        }
    }

    pub async fn write(&self, points: &[Point]) -> WriteOutcome {
        if points.is_empty() {
            return WriteOutcome::no_op();
        }

        let chunks = points.len().div_ceil(self.max_points_per_write);
        let mut first_failure: Option<WriteOutcome> = None;
        let mut last = WriteOutcome::no_op();

        for (index, chunk) in points.chunks(self.max_points_per_write).enumerate() {
            self.limiter.acquire().await;
            let outcome = self.store.write(chunk).await;
            debug!(
                chunk = index + 1,
                chunks,
                points = chunk.len(),
                status = outcome.status_code,
                "Wrote chunk"
            );

            if !outcome.success {
                warn!(
                    chunk = index + 1,
                    chunks,
                    status = outcome.status_code,
                    body = %outcome.body,
                    "Chunk write failed"
                );
                if first_failure.is_none() {
                    first_failure = Some(outcome.clone());
                }
            }
            last = outcome;
        }

        first_failure.unwrap_or(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Local, TimeZone};
    use influx_migrate_core::{DownsampleSpec, FetchFilter, RawSeries};
    use influx_migrate_store::StoreQueryError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Records chunk sizes and replays queued outcomes (success when empty).
    #[derive(Default)]
    struct RecordingStore {
        chunks: Mutex<Vec<usize>>,
        outcomes: Mutex<VecDeque<WriteOutcome>>,
    }

    #[async_trait]
    impl TimeSeriesStore for RecordingStore {
        fn name(&self) -> &str {
            "recording"
        }

        async fn query(&self, _filter: &FetchFilter) -> Result<Vec<RawSeries>, StoreQueryError> {
            Ok(Vec::new())
        }

        async fn write(&self, points: &[Point]) -> WriteOutcome {
            self.chunks.lock().push(points.len());
            self.outcomes.lock().pop_front().unwrap_or(WriteOutcome {
                success: true,
                status_code: 204,
                body: String::new(),
            })
        }

        async fn backfill(&self, _spec: &DownsampleSpec) -> WriteOutcome {
            WriteOutcome::no_op()
        }
    }

    fn points(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                Point::new("reading", Local.timestamp_millis_opt(i as i64).unwrap())
                    .field("Humidity", 40i64)
            })
            .collect()
    }

    fn coordinator(store: &Arc<RecordingStore>, max: usize) -> WriteCoordinator {
        WriteCoordinator::new(store.clone(), Arc::new(RateLimiter::unlimited()), max)
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let store = Arc::new(RecordingStore::default());
        let outcome = coordinator(&store, 10).write(&[]).await;

        assert!(outcome.success);
        assert_eq!(outcome.status_code, 204);
        assert!(store.chunks.lock().is_empty());
    }

    #[tokio::test]
    async fn splits_into_bounded_chunks() {
        let store = Arc::new(RecordingStore::default());
        let outcome = coordinator(&store, 4).write(&points(10)).await;

        assert!(outcome.success);
        assert_eq!(*store.chunks.lock(), vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn attempts_every_chunk_and_reports_first_failure() {
        let store = Arc::new(RecordingStore::default());
        store.outcomes.lock().extend([
            WriteOutcome::no_op(),
            WriteOutcome::rejected(400, "partial write: field type conflict"),
            WriteOutcome::transport_failure("connection reset"),
        ]);

        let outcome = coordinator(&store, 1).write(&points(4)).await;

        assert_eq!(store.chunks.lock().len(), 4);
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, 400);
        assert_eq!(outcome.body, "partial write: field type conflict");
    }

    #[tokio::test]
    async fn zero_chunk_size_is_treated_as_one() {
        let store = Arc::new(RecordingStore::default());
        coordinator(&store, 0).write(&points(2)).await;
        assert_eq!(*store.chunks.lock(), vec![1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn each_chunk_waits_for_the_limiter() {
        let store = Arc::new(RecordingStore::default());
        let writer = WriteCoordinator::new(
            store,
            Arc::new(RateLimiter::new(std::time::Duration::from_millis(250))),
            2,
        );
        let start = tokio::time::Instant::now();
        writer.write(&points(6)).await;
        assert_eq!(start.elapsed(), std::time::Duration::from_millis(500));
    }
}
