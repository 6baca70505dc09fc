//! Retrying, self-healing cache client
//!
//! `ResilientCache` wraps a `DistributedCache` handle. A failed operation is
//! retried up to `op_attempts` more times: the first retry replaces the
//! connection immediately, later retries wait `op_delay` first. `Miss` and
//! `NotStored` are answers, not failures, and end the loop at once.
//!
//! The current handle lives in an `ArcSwap` so readers never block while a
//! reset installs a new one. Resets are serialized by a mutex and bounded
//! process-wide by a `ResetLimiter`; if no slot frees up in time the reset is
//! skipped and the retry goes ahead on the existing handle.

use arc_swap::ArcSwap;
use hotelres_core::config::{CacheConfig, RetryConfig};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::backend::{CacheConnector, CacheItem, DistributedCache};
use crate::error::CacheError;
use crate::keys::{probe_key, PROBE_VALUE};
use crate::limiter::ResetLimiter;

struct CacheHandle {
    backend: Arc<dyn DistributedCache>,
    generation: u64,
}

struct Inner {
    handle: ArcSwap<CacheHandle>,
    connector: Arc<dyn CacheConnector>,
    servers: Vec<String>,
    retry: RetryConfig,
    op_timeout: Duration,
    limiter: ResetLimiter,
    reset_lock: tokio::sync::Mutex<()>,
    resets: AtomicU64,
}

/// Result of a reset request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// A new handle was installed
    Reset { generation: u64 },
    /// The limiter was saturated; the old handle is still in use
    Skipped,
}

/// Shared cache client; clones share one handle and one reset counter
#[derive(Clone)]
pub struct ResilientCache {
    inner: Arc<Inner>,
}

impl ResilientCache {
    /// Connect and validate, retrying with exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns the last connect or validation error once `connect_attempts`
    /// attempts have failed, or `CacheError::Connection` when no servers are
    /// configured.
    pub async fn connect(
        connector: Arc<dyn CacheConnector>,
        cache: &CacheConfig,
        retry: &RetryConfig,
        limiter: ResetLimiter,
    ) -> Result<Self, CacheError> {
        if cache.servers.is_empty() {
            return Err(CacheError::Connection("no cache servers configured".into()));
        }

        let op_timeout = cache.op_timeout();
        let attempts = retry.connect_attempts.max(1);
        let mut last_err = CacheError::Connection("cache connect not attempted".into());

        for attempt in 1..=attempts {
            match Self::open(connector.as_ref(), &cache.servers, op_timeout).await {
                Ok(backend) => {
                    info!(
                        servers = ?cache.servers,
                        attempt,
                        "Cache connection established"
                    );
                    return Ok(Self {
                        inner: Arc::new(Inner {
                            handle: ArcSwap::from_pointee(CacheHandle {
                                backend,
                                generation: 0,
                            }),
                            connector,
                            servers: cache.servers.clone(),
                            retry: retry.clone(),
                            op_timeout,
                            limiter,
                            reset_lock: tokio::sync::Mutex::new(()),
                            resets: AtomicU64::new(0),
                        }),
                    });
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Cache connect attempt failed");
                    last_err = e;
                    if attempt < attempts {
                        tokio::time::sleep(retry.connect_backoff(attempt)).await;
                    }
                }
            }
        }

        error!(servers = ?cache.servers, error = %last_err, "Giving up on cache connection");
        Err(last_err)
    }

    async fn open(
        connector: &dyn CacheConnector,
        servers: &[String],
        op_timeout: Duration,
    ) -> Result<Arc<dyn DistributedCache>, CacheError> {
        let backend = connector.connect(servers).await?;
        match tokio::time::timeout(op_timeout, probe(backend.as_ref())).await {
            Ok(Ok(())) => Ok(backend),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CacheError::Timeout(op_timeout)),
        }
    }

    fn backend(&self) -> Arc<dyn DistributedCache> {
        Arc::clone(&self.inner.handle.load().backend)
    }

    /// Generation of the current handle, bumped by every completed reset
    pub fn generation(&self) -> u64 {
        self.inner.handle.load().generation
    }

    /// Number of resets that installed and validated a new handle
    pub fn reset_count(&self) -> u64 {
        self.inner.resets.load(Ordering::SeqCst)
    }

    async fn run<T, F, Fut>(&self, op: &'static str, key: &str, call: F) -> Result<T, CacheError>
    where
        F: Fn(Arc<dyn DistributedCache>) -> Fut,
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let started = Instant::now();
        let attempts = self.inner.retry.op_attempts;
        let mut last_err = CacheError::Connection(format!("{} not attempted", op));

        for attempt in 0..=attempts {
            if attempt == 1 {
                if let Err(e) = self.reset_connection().await {
                    warn!(op, key, error = %e, "Connection reset failed");
                }
            } else if attempt > 1 {
                tokio::time::sleep(self.inner.retry.op_delay()).await;
            }

            let result = match tokio::time::timeout(self.inner.op_timeout, call(self.backend()))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(CacheError::Timeout(self.inner.op_timeout)),
            };

            match result {
                Ok(value) => {
                    debug!(
                        op,
                        key,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Cache operation completed"
                    );
                    return Ok(value);
                }
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => {
                    warn!(op, key, attempt, attempts, error = %e, "Cache operation failed");
                    last_err = e;
                }
            }
        }

        error!(
            op,
            key,
            elapsed_ms = started.elapsed().as_millis() as u64,
            error = %last_err,
            "Cache operation failed after all retries"
        );
        Err(last_err)
    }

    /// Fetch one value; `Ok(None)` on a miss
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self
            .run("get", key, |cache| async move { cache.get(key).await })
            .await
        {
            Ok(value) => Ok(Some(value)),
            Err(CacheError::Miss) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch several values; absent keys are left out of the map.
    ///
    /// A response with no hits at all is confirmed with a probe before being
    /// trusted, so a silently broken connection is not mistaken for a cold
    /// cache.
    pub async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let label = keys.first().map(String::as_str).unwrap_or_default();
        self.run("get_multi", label, |cache| async move {
            let found = cache.get_multi(keys).await?;
            if found.is_empty() {
                probe(cache.as_ref()).await?;
            }
            Ok(found)
        })
        .await
    }

    /// Unconditional write
    pub async fn set(&self, item: &CacheItem) -> Result<(), CacheError> {
        self.run("set", &item.key, |cache| async move { cache.set(item).await })
            .await
    }

    /// Write only if absent; `Ok(false)` when the key already exists
    pub async fn add(&self, item: &CacheItem) -> Result<bool, CacheError> {
        match self
            .run("add", &item.key, |cache| async move { cache.add(item).await })
            .await
        {
            Ok(()) => Ok(true),
            Err(CacheError::NotStored) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Write only if present; `Ok(false)` when the key is absent
    pub async fn replace(&self, item: &CacheItem) -> Result<bool, CacheError> {
        match self
            .run("replace", &item.key, |cache| async move {
                cache.replace(item).await
            })
            .await
        {
            Ok(()) => Ok(true),
            Err(CacheError::NotStored) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove a key; removing an absent key succeeds
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self
            .run("delete", key, |cache| async move { cache.delete(key).await })
            .await
        {
            Ok(()) | Err(CacheError::Miss) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Probe the current handle once, without retries
    pub async fn validate(&self) -> Result<(), CacheError> {
        let backend = self.backend();
        match tokio::time::timeout(self.inner.op_timeout, probe(backend.as_ref())).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.inner.op_timeout)),
        }
    }

    /// Replace the current handle with a freshly connected one.
    ///
    /// Waits for a limiter slot first and skips the reset if none frees up
    /// in time. If the new connection cannot be built the old handle stays
    /// installed. A new handle that fails its probe is kept, but the reset
    /// reports `CacheError::Validation`.
    pub async fn reset_connection(&self) -> Result<ResetOutcome, CacheError> {
        let inner = &self.inner;

        let Some(_permit) = inner
            .limiter
            .try_acquire_for(inner.retry.reset_acquire_timeout())
            .await
        else {
            warn!(
                capacity = inner.limiter.capacity(),
                "Reset limiter saturated, skipping connection reset"
            );
            return Ok(ResetOutcome::Skipped);
        };

        let _guard = inner.reset_lock.lock().await;
        let started = Instant::now();

        let backend = inner.connector.connect(&inner.servers).await.map_err(|e| {
            error!(error = %e, "Failed to build replacement cache connection");
            e
        })?;

        let generation = inner.handle.load().generation + 1;
        let old = inner.handle.swap(Arc::new(CacheHandle {
            backend: Arc::clone(&backend),
            generation,
        }));
        if let Err(e) = old.backend.close().await {
            debug!(error = %e, "Closing replaced cache connection failed");
        }

        match tokio::time::timeout(inner.op_timeout, probe(backend.as_ref())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(generation, error = %e, "Replacement cache connection failed validation");
                return Err(CacheError::Validation(e.to_string()));
            }
            Err(_) => {
                warn!(generation, "Replacement cache connection validation timed out");
                return Err(CacheError::Validation(format!(
                    "probe timed out after {:?}",
                    inner.op_timeout
                )));
            }
        }

        inner.resets.fetch_add(1, Ordering::SeqCst);
        info!(
            generation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cache connection reset"
        );
        Ok(ResetOutcome::Reset { generation })
    }

    /// Close the current handle
    pub async fn close(&self) -> Result<(), CacheError> {
        self.backend().close().await
    }
}

/// Write, read back and remove a throwaway key.
///
/// A failed cleanup does not fail the probe.
async fn probe(cache: &dyn DistributedCache) -> Result<(), CacheError> {
    let key = probe_key();
    let item = CacheItem::new(key.clone(), PROBE_VALUE);

    cache
        .set(&item)
        .await
        .map_err(|e| CacheError::Validation(format!("probe write failed: {}", e)))?;

    let value = cache
        .get(&key)
        .await
        .map_err(|e| CacheError::Validation(format!("probe read failed: {}", e)))?;
    if value != PROBE_VALUE {
        return Err(CacheError::Validation(format!(
            "probe read back '{}'",
            value
        )));
    }

    if let Err(e) = cache.delete(&key).await {
        debug!(key = %key, error = %e, "Probe cleanup failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Memory backend whose next `failures` operations fail
    #[derive(Clone, Default)]
    struct FlakyConnector {
        memory: MemoryConnector,
        failures: Arc<AtomicUsize>,
    }

    impl FlakyConnector {
        fn fail_next(&self, n: usize) {
            self.failures.store(n, Ordering::SeqCst);
        }
    }

    struct FlakyBackend {
        inner: Arc<dyn DistributedCache>,
        failures: Arc<AtomicUsize>,
    }

    impl FlakyBackend {
        fn trip(&self) -> Result<(), CacheError> {
            let tripped = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if tripped {
                Err(CacheError::Connection("connection reset by peer".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl DistributedCache for FlakyBackend {
        async fn get(&self, key: &str) -> Result<String, CacheError> {
            self.trip()?;
            self.inner.get(key).await
        }

        async fn get_multi(
            &self,
            keys: &[String],
        ) -> Result<HashMap<String, String>, CacheError> {
            self.trip()?;
            self.inner.get_multi(keys).await
        }

        async fn set(&self, item: &CacheItem) -> Result<(), CacheError> {
            self.trip()?;
            self.inner.set(item).await
        }

        async fn add(&self, item: &CacheItem) -> Result<(), CacheError> {
            self.trip()?;
            self.inner.add(item).await
        }

        async fn replace(&self, item: &CacheItem) -> Result<(), CacheError> {
            self.trip()?;
            self.inner.replace(item).await
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.trip()?;
            self.inner.delete(key).await
        }

        async fn close(&self) -> Result<(), CacheError> {
            self.inner.close().await
        }
    }

    #[async_trait]
    impl CacheConnector for FlakyConnector {
        async fn connect(
            &self,
            servers: &[String],
        ) -> Result<Arc<dyn DistributedCache>, CacheError> {
            Ok(Arc::new(FlakyBackend {
                inner: self.memory.connect(servers).await?,
                failures: Arc::clone(&self.failures),
            }))
        }
    }

    struct DownConnector;

    #[async_trait]
    impl CacheConnector for DownConnector {
        async fn connect(&self, _: &[String]) -> Result<Arc<dyn DistributedCache>, CacheError> {
            Err(CacheError::Connection("connection refused".into()))
        }
    }

    fn cache_config() -> CacheConfig {
        CacheConfig {
            servers: vec!["memory".to_string()],
            op_timeout_ms: 500,
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            op_attempts: 2,
            op_delay_ms: 1,
            connect_attempts: 2,
            connect_initial_delay_ms: 1,
            connect_max_delay_ms: 2,
            reset_concurrency: 5,
            reset_acquire_timeout_ms: 20,
        }
    }

    async fn setup(connector: &FlakyConnector, limiter: ResetLimiter) -> ResilientCache {
        ResilientCache::connect(
            Arc::new(connector.clone()),
            &cache_config(),
            &fast_retry(),
            limiter,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_single_failure_resets_once() {
        let connector = FlakyConnector::default();
        connector.memory.seed("H1_cap", "10");
        let cache = setup(&connector, ResetLimiter::new(5)).await;
        assert_eq!(connector.memory.connect_count(), 1);

        connector.fail_next(1);
        let value = cache.get("H1_cap").await.unwrap();

        assert_eq!(value.as_deref(), Some("10"));
        assert_eq!(cache.reset_count(), 1);
        assert_eq!(cache.generation(), 1);
        assert_eq!(connector.memory.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_miss_is_not_retried() {
        let connector = FlakyConnector::default();
        let cache = setup(&connector, ResetLimiter::new(5)).await;

        assert_eq!(cache.get("H9_cap").await.unwrap(), None);
        assert_eq!(cache.reset_count(), 0);
        assert_eq!(connector.memory.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_saturated_limiter_skips_reset() {
        let connector = FlakyConnector::default();
        connector.memory.seed("H1_cap", "10");
        let limiter = ResetLimiter::new(1);
        let cache = setup(&connector, limiter.clone()).await;

        let _held = limiter
            .try_acquire_for(Duration::from_millis(10))
            .await
            .unwrap();
        connector.fail_next(1);

        assert_eq!(cache.get("H1_cap").await.unwrap().as_deref(), Some("10"));
        assert_eq!(cache.reset_count(), 0);
        assert_eq!(connector.memory.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_reset_skipped_when_saturated() {
        let connector = FlakyConnector::default();
        let limiter = ResetLimiter::new(1);
        let cache = setup(&connector, limiter.clone()).await;

        let _held = limiter
            .try_acquire_for(Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(
            cache.reset_connection().await.unwrap(),
            ResetOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_persistent_failure_exhausts_attempts() {
        let connector = FlakyConnector::default();
        let cache = setup(&connector, ResetLimiter::new(5)).await;

        connector.fail_next(usize::MAX);
        let err = cache.get("H1_cap").await.unwrap_err();

        assert!(matches!(err, CacheError::Connection(_)));
        assert_eq!(cache.reset_count(), 0);
        connector.fail_next(0);
    }

    #[tokio::test]
    async fn test_get_multi_partial_hits() {
        let connector = FlakyConnector::default();
        connector.memory.seed("H1_cap", "10");
        let cache = setup(&connector, ResetLimiter::new(5)).await;

        let keys = vec!["H1_cap".to_string(), "H2_cap".to_string()];
        let found = cache.get_multi(&keys).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found.get("H1_cap").map(String::as_str), Some("10"));
    }

    #[tokio::test]
    async fn test_get_multi_cold_cache_is_empty() {
        let connector = FlakyConnector::default();
        let cache = setup(&connector, ResetLimiter::new(5)).await;

        let found = cache
            .get_multi(&["H1_cap".to_string(), "H2_cap".to_string()])
            .await
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(cache.reset_count(), 0);
        assert!(connector.memory.is_empty());
    }

    #[tokio::test]
    async fn test_conditional_writes_report_not_stored() {
        let connector = FlakyConnector::default();
        let cache = setup(&connector, ResetLimiter::new(5)).await;

        assert!(!cache.replace(&CacheItem::new("k", "1")).await.unwrap());
        assert!(cache.add(&CacheItem::new("k", "1")).await.unwrap());
        assert!(!cache.add(&CacheItem::new("k", "2")).await.unwrap());
        assert!(cache.replace(&CacheItem::new("k", "3")).await.unwrap());
        assert_eq!(connector.memory.peek("k").as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_delete_absent_key_succeeds() {
        let connector = FlakyConnector::default();
        let cache = setup(&connector, ResetLimiter::new(5)).await;

        cache.delete("missing").await.unwrap();
        assert_eq!(cache.reset_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_gives_up() {
        let result = ResilientCache::connect(
            Arc::new(DownConnector),
            &cache_config(),
            &fast_retry(),
            ResetLimiter::new(1),
        )
        .await;

        assert!(matches!(result, Err(CacheError::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_requires_servers() {
        let config = CacheConfig {
            servers: vec![],
            op_timeout_ms: 500,
        };
        let result = ResilientCache::connect(
            Arc::new(MemoryConnector::new()),
            &config,
            &fast_retry(),
            ResetLimiter::new(1),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_probe_leaves_no_keys() {
        let connector = FlakyConnector::default();
        let cache = setup(&connector, ResetLimiter::new(5)).await;

        cache.validate().await.unwrap();
        assert!(connector.memory.is_empty());
    }
}
