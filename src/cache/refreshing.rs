//! Time-bounded single-slot cache with stale-while-revalidate serving
//!
//! Holds the last successfully fetched value and serves it for `ttl`. Past
//! that age, callers still get the stale copy immediately while a single
//! background fetch replaces it. A periodic timer keeps the slot warm
//! independently of traffic.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::retry::{FetchError, RetryPolicy};

/// Timing configuration for a [`RefreshingCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Age past which the stored value is considered stale.
    pub ttl: Duration,
    /// Period of the autonomous background refresh timer. Independent of the
    /// TTL; typically around half of it so refreshes land before expiry.
    pub refresh_interval: Duration,
    /// Retry policy applied to every fetch, first load included.
    pub retry: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(12 * 60 * 60),             // 12 hours
            refresh_interval: Duration::from_secs(6 * 60 * 60), // 6 hours
            retry: RetryPolicy::default(),
        }
    }
}

/// Errors surfaced by cache reads.
#[derive(Debug, Error)]
pub enum CacheError<E> {
    /// The fetch kept failing until the retry policy gave up
    #[error("fetch failed after {attempts} attempt(s): {cause}")]
    FetchFailed {
        /// How many attempts were made
        attempts: u32,
        /// The failure of the final attempt
        cause: FetchError<E>,
    },
    /// No value has ever been fetched successfully
    #[error("no data available yet")]
    NoData,
}

/// Read-only snapshot of the cache state, for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatus {
    /// Whether a value has been fetched successfully at least once.
    pub has_entry: bool,
    /// Age of the stored value, `None` before the first successful fetch.
    pub age: Option<Duration>,
    /// Whether a refresh fetch is currently in flight.
    pub refreshing: bool,
}

/// The single stored unit: the last good value and when it was fetched.
struct Entry<T> {
    value: T,
    fetched_at: Instant,
}

type FetchFn<T, E> = dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync;

/// State shared between callers, the refresh tasks, and the timer task.
struct Inner<T, E> {
    /// The slot. Readers hold the read lock just long enough to copy out.
    slot: RwLock<Option<Entry<T>>>,
    /// Claim on the right to refresh; upholds at-most-one-fetch-in-flight.
    refreshing: AtomicBool,
    /// Serializes first loads so concurrent cold callers share one fetch.
    init: AsyncMutex<()>,
    /// Whether the most recent `get` was answered from the slot.
    served_from_cache: AtomicBool,
    config: CacheConfig,
    fetch: Box<FetchFn<T, E>>,
}

/// Caches one value produced by an owner-supplied async fetch function.
///
/// Reads are served from memory and never block on the network once a value
/// exists; a stale read hands back the old value and triggers at most one
/// background refresh. The owner starts and stops the periodic refresh
/// explicitly, typically at process startup and shutdown. Share the cache by
/// wrapping it in an `Arc`.
pub struct RefreshingCache<T, E> {
    inner: Arc<Inner<T, E>>,
    /// Handle of the interval task while auto-refresh is running.
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl<T, E> RefreshingCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: std::fmt::Display + Send + 'static,
{
    /// Creates a cache around `fetch`. Nothing is fetched until the first
    /// `get` call or timer tick.
    ///
    /// # Arguments
    /// * `config` - TTL, refresh period and retry policy
    /// * `fetch` - Async operation producing a fresh value; retried per the
    ///   policy on failure
    pub fn new<F, Fut>(config: CacheConfig, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let fetch: Box<FetchFn<T, E>> = Box::new(move || Box::pin(fetch()));
        Self {
            inner: Arc::new(Inner {
                slot: RwLock::new(None),
                refreshing: AtomicBool::new(false),
                init: AsyncMutex::new(()),
                served_from_cache: AtomicBool::new(false),
                config,
                fetch,
            }),
            ticker: Mutex::new(None),
        }
    }

    /// Returns the cached value, fetching only when the slot is empty.
    ///
    /// * Empty slot: performs the fetch (with retries) and blocks until it
    ///   resolves; concurrent cold callers wait for the same fetch instead
    ///   of issuing their own.
    /// * Fresh value (age within TTL): returns it immediately.
    /// * Stale value: returns it immediately and starts one background
    ///   refresh unless a refresh is already in flight. Callers are never
    ///   penalized by a slow upstream once a value exists.
    ///
    /// # Returns
    /// * `Ok(value)` - the cached or freshly loaded value
    /// * `Err(CacheError::FetchFailed)` - the slot was empty and the fetch
    ///   exhausted its retries; no entry is created
    pub async fn get(&self) -> Result<T, CacheError<E>> {
        if let Some((value, age)) = self.inner.read_slot() {
            self.inner.served_from_cache.store(true, Ordering::Relaxed);
            if age > self.inner.config.ttl {
                Arc::clone(&self.inner).spawn_refresh();
            }
            return Ok(value);
        }

        self.inner.served_from_cache.store(false, Ordering::Relaxed);
        self.inner.first_load().await
    }

    /// Returns the cached value without ever fetching.
    ///
    /// # Returns
    /// * `Ok(value)` if a fetch has succeeded at least once
    /// * `Err(CacheError::NoData)` otherwise
    pub fn peek(&self) -> Result<T, CacheError<E>> {
        self.inner
            .read_slot()
            .map(|(value, _)| value)
            .ok_or(CacheError::NoData)
    }

    /// Starts the periodic background refresh. A no-op while a timer is
    /// already running.
    ///
    /// Each tick refreshes the slot through the same claim-guarded path as
    /// stale reads, so a tick that lands during an in-flight refresh is
    /// skipped. A tick that finds the slot still empty performs the first
    /// load instead.
    pub fn start_auto_refresh(&self) {
        let mut ticker = self.ticker.lock().unwrap();
        if ticker.is_some() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        *ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.config.refresh_interval);
            // Skip the first tick (immediate)
            interval.tick().await;
            loop {
                interval.tick().await;
                Arc::clone(&inner).tick();
            }
        }));
    }

    /// Stops the periodic background refresh. Idempotent. An in-flight
    /// refresh is left to complete; only future ticks are cancelled.
    pub fn stop_auto_refresh(&self) {
        if let Some(handle) = self.ticker.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Whether the most recent `get` was answered from the slot rather than
    /// by a blocking first load. Observability only.
    pub fn last_served_from_cache(&self) -> bool {
        self.inner.served_from_cache.load(Ordering::Relaxed)
    }

    /// Read-only snapshot of the cache state. Never mutates anything.
    pub fn status(&self) -> CacheStatus {
        let age = self
            .inner
            .slot
            .read()
            .unwrap()
            .as_ref()
            .map(|entry| entry.fetched_at.elapsed());
        CacheStatus {
            has_entry: age.is_some(),
            age,
            refreshing: self.inner.refreshing.load(Ordering::Acquire),
        }
    }
}

impl<T, E> Drop for RefreshingCache<T, E> {
    fn drop(&mut self) {
        // The interval task must not outlive its cache.
        if let Ok(mut ticker) = self.ticker.lock() {
            if let Some(handle) = ticker.take() {
                handle.abort();
            }
        }
    }
}

impl<T, E> Inner<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: std::fmt::Display + Send + 'static,
{
    /// Copies the stored value and its age out of the slot.
    fn read_slot(&self) -> Option<(T, Duration)> {
        let guard = self.slot.read().unwrap();
        guard
            .as_ref()
            .map(|entry| (entry.value.clone(), entry.fetched_at.elapsed()))
    }

    /// Commits a freshly fetched value. Readers observe either the previous
    /// entry or the new one, never a partial state.
    fn commit(&self, value: T) {
        let mut guard = self.slot.write().unwrap();
        *guard = Some(Entry {
            value,
            fetched_at: Instant::now(),
        });
    }

    /// Claims the refresh flag and spawns a background fetch. Does nothing
    /// if another refresh already holds the claim.
    fn spawn_refresh(self: Arc<Self>) {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        tokio::spawn(async move {
            match self.config.retry.run(|| (self.fetch)()).await {
                Ok(value) => {
                    self.commit(value);
                    tracing::debug!("background refresh committed a new value");
                }
                Err(err) => {
                    // A failed refresh must never erase good data.
                    tracing::warn!(error = %err, "background refresh failed, keeping stale value");
                }
            }
            self.refreshing.store(false, Ordering::Release);
        });
    }

    /// Blocking first load. Cold callers are serialized on the init lock;
    /// whoever wakes after a successful leader reuses the committed value,
    /// and after a failed leader the next waiter takes over the fetch.
    async fn first_load(&self) -> Result<T, CacheError<E>> {
        let _guard = self.init.lock().await;

        // The slot may have been filled while we waited for the lock.
        if let Some((value, _)) = self.read_slot() {
            return Ok(value);
        }

        match self.config.retry.run(|| (self.fetch)()).await {
            Ok(value) => {
                self.commit(value.clone());
                Ok(value)
            }
            Err(cause) => Err(CacheError::FetchFailed {
                attempts: self.config.retry.attempts(),
                cause,
            }),
        }
    }

    /// One timer tick: refresh the slot, or warm it if still empty.
    fn tick(self: Arc<Self>) {
        if self.slot.read().unwrap().is_some() {
            self.spawn_refresh();
            return;
        }

        // First load never happened or never succeeded; warm the slot unless
        // a cold caller is already on it.
        tokio::spawn(async move {
            let Ok(_guard) = self.init.try_lock() else {
                return;
            };
            if self.read_slot().is_some() {
                return;
            }
            match self.config.retry.run(|| (self.fetch)()).await {
                Ok(value) => {
                    self.commit(value);
                    tracing::debug!("timer tick warmed the empty cache");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "timer tick failed to warm the empty cache");
                }
            }
        });
    }
}
