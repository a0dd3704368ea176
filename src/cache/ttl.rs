//! Read-through TTL cache with single-flight population.

use std::{future::Future, sync::Arc, time::Duration};

use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::{
    config::CacheConfig,
    flight::{FlightAborted, InFlight},
    store::{CacheStore, MemoryStore},
};

const METRIC_CACHE_HIT: &str = "feedline_cache_hit_total";
const METRIC_CACHE_MISS: &str = "feedline_cache_miss_total";
const METRIC_CACHE_COALESCED: &str = "feedline_cache_coalesced_total";

/// Serves values younger than the TTL from the store and runs the producer
/// otherwise. Only successful values are stored.
pub struct TtlCache<T, E> {
    store: Arc<dyn CacheStore<T>>,
    flights: InFlight<T, E>,
    ttl: Duration,
}

impl<T, E> Clone for TtlCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            flights: self.flights.clone(),
            ttl: self.ttl,
        }
    }
}

impl<T, E> TtlCache<T, E>
where
    T: Send + Sync + 'static,
    E: From<FlightAborted> + Clone + Send + Sync + 'static,
{
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: &CacheConfig, store: Arc<dyn CacheStore<T>>) -> Self {
        Self {
            store,
            flights: InFlight::new(),
            ttl: config.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key` if one is stored.
    pub fn peek(&self, key: &str) -> Option<Arc<T>> {
        self.store
            .get(key)
            .filter(|entry| entry.is_fresh(Instant::now(), self.ttl))
            .map(|entry| entry.value)
    }

    /// Return the fresh value for `key`, or produce, store and return a new one.
    ///
    /// Concurrent misses on the same key share one producer run. A failed
    /// run leaves the store untouched so the next call tries again. A run
    /// whose callers all went away still completes and stores its value.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, producer: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(value) = self.peek(key) {
            counter!(METRIC_CACHE_HIT).increment(1);
            debug!(key, result = "hit", "cache lookup");
            return Ok(value);
        }

        let store = Arc::clone(&self.store);
        let owned_key = key.to_string();
        let (flight, started) = self.flights.join_or_start(key, move || {
            let work = producer();
            async move {
                let value = Arc::new(work.await?);
                store.set(&owned_key, Arc::clone(&value), Instant::now());
                Ok(value)
            }
        });

        if started {
            counter!(METRIC_CACHE_MISS).increment(1);
            debug!(key, result = "miss", "cache lookup");
        } else {
            counter!(METRIC_CACHE_COALESCED).increment(1);
            debug!(key, result = "coalesced", "cache lookup");
        }

        flight.await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn cache(ttl_secs: u64) -> TtlCache<String, String> {
        TtlCache::new(&CacheConfig {
            ttl: Duration::from_secs(ttl_secs),
        })
    }

    fn counting_producer(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> std::future::Ready<Result<String, String>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value.to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entries_skip_the_producer() {
        let cache = cache(60);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_fetch("k", counting_producer(&calls, "v1"))
            .await
            .expect("first");
        tokio::time::advance(Duration::from_secs(59)).await;
        let second = cache
            .get_or_fetch("k", counting_producer(&calls, "v2"))
            .await
            .expect("second");

        assert_eq!(*first, "v1");
        assert_eq!(*second, "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_refetched() {
        let cache = cache(60);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_fetch("k", counting_producer(&calls, "v1"))
            .await
            .expect("first");
        tokio::time::advance(Duration::from_secs(60)).await;
        let refreshed = cache
            .get_or_fetch("k", counting_producer(&calls, "v2"))
            .await
            .expect("refreshed");

        assert_eq!(*refreshed, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_stored() {
        let cache = cache(60);

        let failed = cache
            .get_or_fetch("k", || async { Err::<String, _>("boom".to_string()) })
            .await;
        assert_eq!(failed.expect_err("failure"), "boom");
        assert!(cache.peek("k").is_none());

        let recovered = cache
            .get_or_fetch("k", || async { Ok::<_, String>("ok".to_string()) })
            .await
            .expect("recovered");
        assert_eq!(*recovered, "ok");
        assert_eq!(cache.peek("k").as_deref().map(String::as_str), Some("ok"));
    }

    #[tokio::test]
    async fn concurrent_misses_run_one_producer() {
        let cache = cache(60);
        let calls = Arc::new(AtomicUsize::new(0));

        let producer = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<_, String>("shared".to_string())
            }
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch("k", producer(Arc::clone(&calls))),
            cache.get_or_fetch("k", producer(Arc::clone(&calls))),
            cache.get_or_fetch("k", producer(Arc::clone(&calls))),
        );

        assert_eq!(*a.expect("a"), "shared");
        assert_eq!(*b.expect("b"), "shared");
        assert_eq!(*c.expect("c"), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_fetch_still_fills_the_store() {
        let cache = cache(3600);
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, String>("late".to_string())
            }
        };
        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), cache.get_or_fetch("k", slow)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(cache.peek("k").as_deref().map(String::as_str), Some("late"));

        let later = cache
            .get_or_fetch("k", counting_producer(&calls, "unused"))
            .await
            .expect("stored value");
        assert_eq!(*later, "late");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
