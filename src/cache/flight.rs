//! Single-flight registry.
//!
//! At most one producer runs per key. Callers arriving while it runs join
//! the same shared future and observe the same outcome. The producer runs on
//! its own task, so it settles even when every caller has gone away.

use std::{future::Future, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::warn;

pub type Flight<T, E> = Shared<BoxFuture<'static, Result<Arc<T>, E>>>;

type Flights<T, E> = Arc<DashMap<String, Flight<T, E>>>;

/// The producer task panicked or was cancelled before it settled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cache producer task ended without a result: {0}")]
pub struct FlightAborted(pub String);

/// Tracks keys with a producer currently in progress.
pub struct InFlight<T, E> {
    flights: Flights<T, E>,
}

impl<T, E> Clone for InFlight<T, E> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<T, E> Default for InFlight<T, E> {
    fn default() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
        }
    }
}

impl<T, E> InFlight<T, E>
where
    T: Send + Sync + 'static,
    E: From<FlightAborted> + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the running flight for `key`, or start one from `start`.
    ///
    /// The boolean is `true` for the caller that started the flight. The
    /// producer is spawned onto the runtime and releases its registry entry
    /// when it settles, whether or not anyone is still waiting for it.
    pub fn join_or_start<F, Fut>(&self, key: &str, start: F) -> (Flight<T, E>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>, E>> + Send + 'static,
    {
        match self.flights.entry(key.to_string()) {
            Entry::Occupied(occupied) => (occupied.get().clone(), false),
            Entry::Vacant(vacant) => {
                let release = Release {
                    flights: Arc::clone(&self.flights),
                    key: key.to_string(),
                };
                let work = start();
                let task = tokio::spawn(async move {
                    let _release = release;
                    work.await
                });

                let owned_key = key.to_string();
                let flight = async move {
                    task.await.unwrap_or_else(|err| {
                        warn!(
                            target = "cache::flight::join_or_start",
                            key = %owned_key,
                            error = %err,
                            "cache producer task aborted"
                        );
                        Err(E::from(FlightAborted(err.to_string())))
                    })
                }
                .boxed()
                .shared();
                vacant.insert(flight.clone());
                (flight, true)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self, key: &str) -> bool {
        self.flights.contains_key(key)
    }
}

// Dropped with the producer task, including when it panics.
struct Release<T, E> {
    flights: Flights<T, E>,
    key: String,
}

impl<T, E> Drop for Release<T, E> {
    fn drop(&mut self) {
        self.flights.remove(&self.key);
    }
}

#[cfg(test)]
impl From<FlightAborted> for String {
    fn from(err: FlightAborted) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_producer() {
        let registry: InFlight<u32, String> = InFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (release, gate) = oneshot::channel::<()>();

        let start = {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = gate.await;
                Ok(Arc::new(42))
            }
        };
        let (leader, started) = registry.join_or_start("posts", start);
        assert!(started);
        assert!(registry.is_running("posts"));

        let (follower, started) = registry.join_or_start("posts", || async {
            Err::<Arc<u32>, String>("second producer must not run".to_string())
        });
        assert!(!started);

        release.send(()).expect("gate open");
        let (first, second) = tokio::join!(leader, follower);

        assert_eq!(*first.expect("leader result"), 42);
        assert_eq!(*second.expect("follower result"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!registry.is_running("posts"));
    }

    #[tokio::test]
    async fn failures_are_shared_and_released() {
        let registry: InFlight<u32, String> = InFlight::new();

        let (flight, _) = registry.join_or_start("posts", || async {
            Err::<Arc<u32>, String>("upstream down".to_string())
        });
        assert_eq!(flight.await.expect_err("failure"), "upstream down");
        assert!(!registry.is_running("posts"));

        let (flight, started) = registry.join_or_start("posts", || async { Ok(Arc::new(1)) });
        assert!(started);
        assert_eq!(*flight.await.expect("retry result"), 1);
    }

    #[tokio::test]
    async fn keys_fly_independently() {
        let registry: InFlight<&'static str, String> = InFlight::new();
        let (first, first_started) =
            registry.join_or_start("a", || async { Ok(Arc::new("a")) });
        let (second, second_started) =
            registry.join_or_start("b", || async { Ok(Arc::new("b")) });

        assert!(first_started && second_started);
        assert_eq!(*first.await.expect("a"), "a");
        assert_eq!(*second.await.expect("b"), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn producer_settles_after_every_caller_gives_up() {
        let registry: InFlight<u32, String> = InFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let start = {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(Arc::new(7))
            }
        };
        let (flight, _) = registry.join_or_start("posts", start);
        assert!(
            tokio::time::timeout(Duration::from_millis(10), flight)
                .await
                .is_err()
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!registry.is_running("posts"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (flight, started) = registry.join_or_start("posts", || async { Ok(Arc::new(8)) });
        assert!(started);
        assert_eq!(*flight.await.expect("fresh flight"), 8);
    }

    #[tokio::test]
    async fn panicking_producer_is_reported_and_released() {
        let registry: InFlight<u32, String> = InFlight::new();

        let (flight, _) = registry.join_or_start("posts", || async {
            if true {
                panic!("producer blew up");
            }
            Ok(Arc::new(0))
        });
        let err = flight.await.expect_err("aborted flight");

        assert!(err.starts_with("cache producer task ended without a result"));
        assert!(!registry.is_running("posts"));
    }
}
