use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, warn};

use super::{GeocodeError, Geocoder};
use crate::records::Coordinates;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_ERROR_WAIT: Duration = Duration::from_secs(5);

/// Wraps a [`Geocoder`] so that successive lookups start at least
/// `min_interval` apart. Transient failures are retried up to `max_retries`
/// times after waiting `error_wait`.
///
/// Calls are serialized: the lock is held for the whole lookup.
pub struct RateLimited<G> {
    inner: G,
    min_interval: Duration,
    max_retries: u32,
    error_wait: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl<G> RateLimited<G> {
    pub fn new(inner: G, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            max_retries: DEFAULT_MAX_RETRIES,
            error_wait: DEFAULT_ERROR_WAIT,
            last_call: Mutex::new(None),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, error_wait: Duration) -> Self {
        self.max_retries = max_retries;
        self.error_wait = error_wait;
        self
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for RateLimited<G> {
    async fn resolve(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let mut last_call = self.last_call.lock().await;
        let mut attempt = 0;

        loop {
            if let Some(previous) = *last_call {
                let ready_at = previous + self.min_interval;
                if ready_at > Instant::now() {
                    debug!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "Throttling geocoder");
                    sleep_until(ready_at).await;
                }
            }
            *last_call = Some(Instant::now());

            match self.inner.resolve(query).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(query, attempt, error = %e, "Transient geocoding failure, retrying");
                    sleep(self.error_wait).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for Flaky {
        async fn resolve(&self, _query: &str) -> Result<Option<Coordinates>, GeocodeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(GeocodeError::Status {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                })
            } else {
                Ok(Some(Coordinates::new(44.3, 8.48)))
            }
        }
    }

    fn flaky(failures: usize) -> Flaky {
        Flaky {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_successive_calls_are_spaced() {
        let limited = RateLimited::new(flaky(0), Duration::from_millis(40));

        let start = Instant::now();
        for _ in 0..3 {
            limited.resolve("Piazza Mameli").await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(80));
        assert_eq!(limited.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_call_is_not_delayed() {
        let limited = RateLimited::new(flaky(0), Duration::from_secs(30));

        let start = Instant::now();
        limited.resolve("Via Paleocapa").await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let limited = RateLimited::new(flaky(2), Duration::from_millis(1))
            .with_retries(2, Duration::from_millis(1));

        let result = limited.resolve("Corso Italia").await.unwrap();
        assert!(result.is_some());
        assert_eq!(limited.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let limited = RateLimited::new(flaky(5), Duration::from_millis(1))
            .with_retries(1, Duration::from_millis(1));

        assert!(limited.resolve("Corso Italia").await.is_err());
        assert_eq!(limited.inner().calls.load(Ordering::SeqCst), 2);
    }
}
