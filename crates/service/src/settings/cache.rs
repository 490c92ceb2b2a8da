//! Read-through TTL cache over resolved settings.
//!
//! The backend stores serialized JSON strings so any key/value cache can sit
//! behind [`CacheBackend`]; the in-process default is a `moka` cache with a
//! per-entry time to live. Backend failures are logged and treated as misses:
//! the cache is never a source of truth.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{future::Cache, Expiry};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::repository::AdminDirectory;
use crate::errors::ServiceError;
use crate::identity::Requester;
use crate::metrics;

/// Key of the process-wide designated-admin lookup.
pub const ADMIN_ID_KEY: &str = "settings:admin_id";

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), ServiceError>;
    async fn forget(&self, key: &str) -> Result<(), ServiceError>;
}

#[derive(Clone)]
struct CacheEntry {
    value: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process backend; entries expire after the TTL given to `set`.
pub struct MokaCacheBackend {
    cache: Cache<String, CacheEntry>,
}

impl MokaCacheBackend {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheBackend for MokaCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.cache.get(key).await.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), ServiceError> {
        self.cache.insert(key.to_string(), CacheEntry { value, ttl }).await;
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<(), ServiceError> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

/// Whose resolved bundles a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    User(i32),
    /// Anonymous requests, resolved from the designated admin only.
    Guest,
}

impl CacheScope {
    pub fn of(requester: Option<&Requester>) -> Self {
        requester.map_or(CacheScope::Guest, |r| CacheScope::User(r.id))
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheScope::User(id) => write!(f, "{id}"),
            CacheScope::Guest => f.write_str("guest"),
        }
    }
}

pub fn branding_key(scope: CacheScope) -> String {
    format!("settings:{scope}:branding")
}

pub fn salary_slip_defaults_key(scope: CacheScope) -> String {
    format!("settings:{scope}:salary_slip_defaults")
}

/// Memoizes resolver results per key with a fixed TTL.
#[derive(Clone)]
pub struct SettingsCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl SettingsCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn in_memory(ttl: Duration, max_capacity: u64) -> Self {
        Self::new(Arc::new(MokaCacheBackend::new(max_capacity)), ttl)
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// Only errors from `compute` propagate.
    pub async fn remember<T, F, Fut>(&self, key: &str, compute: F) -> Result<T, ServiceError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, ServiceError>> + Send,
    {
        let concern = key.rsplit(':').next().unwrap_or(key);
        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(v) => {
                    metrics::CACHE_HITS_TOTAL.with_label_values(&[concern]).inc();
                    debug!(key, "settings cache hit");
                    return Ok(v);
                }
                Err(e) => warn!(key, error = %e, "undecodable cache entry; recomputing"),
            },
            Ok(None) => {}
            Err(e) => {
                metrics::CACHE_ERRORS_TOTAL.inc();
                warn!(key, error = %e, "cache read failed; resolving directly");
            }
        }
        metrics::CACHE_MISSES_TOTAL.with_label_values(&[concern]).inc();
        debug!(key, "settings cache miss");

        let value = compute().await?;
        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.backend.set(key, raw, self.ttl).await {
                    metrics::CACHE_ERRORS_TOTAL.inc();
                    warn!(key, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(key, error = %e, "cache value not serializable"),
        }
        Ok(value)
    }

    pub async fn forget(&self, key: &str) {
        if let Err(e) = self.backend.forget(key).await {
            metrics::CACHE_ERRORS_TOTAL.inc();
            warn!(key, error = %e, "cache eviction failed; entry expires with its ttl");
        }
    }

    /// Evict the branding and salary slip defaults entries of `scope`.
    pub async fn invalidate_bundles(&self, scope: CacheScope) {
        self.forget(&branding_key(scope)).await;
        self.forget(&salary_slip_defaults_key(scope)).await;
        debug!(%scope, "settings bundles evicted");
    }

    /// Evict the designated-admin lookup; role changes call this.
    pub async fn invalidate_admin_id(&self) {
        self.forget(ADMIN_ID_KEY).await;
    }
}

/// [`AdminDirectory`] decorator memoizing the lookup under [`ADMIN_ID_KEY`].
pub struct CachedAdminDirectory {
    inner: Arc<dyn AdminDirectory>,
    cache: SettingsCache,
}

impl CachedAdminDirectory {
    pub fn new(inner: Arc<dyn AdminDirectory>, cache: SettingsCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl AdminDirectory for CachedAdminDirectory {
    async fn find_admin_user_id(&self) -> Result<Option<i32>, ServiceError> {
        self.cache.remember(ADMIN_ID_KEY, || self.inner.find_admin_user_id()).await
    }
}

/// Backends for exercising failure paths in tests
pub mod mock {
    use super::*;

    /// Every operation fails, as if the cache server were down.
    #[derive(Default)]
    pub struct UnavailableCacheBackend;

    #[async_trait]
    impl CacheBackend for UnavailableCacheBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, ServiceError> {
            Err(ServiceError::Cache("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), ServiceError> {
            Err(ServiceError::Cache("connection refused".into()))
        }

        async fn forget(&self, _key: &str) -> Result<(), ServiceError> {
            Err(ServiceError::Cache("connection refused".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::repository::mock::StaticAdminDirectory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache(ttl: Duration) -> SettingsCache {
        SettingsCache::in_memory(ttl, 100)
    }

    #[test]
    fn scoped_keys() {
        assert_eq!(branding_key(CacheScope::User(42)), "settings:42:branding");
        assert_eq!(salary_slip_defaults_key(CacheScope::User(42)), "settings:42:salary_slip_defaults");
        assert_eq!(branding_key(CacheScope::Guest), "settings:guest:branding");
        assert_eq!(CacheScope::of(None), CacheScope::Guest);
        assert_eq!(CacheScope::of(Some(&Requester::new(5, ["admin"]))), CacheScope::User(5));
    }

    #[tokio::test]
    async fn hit_skips_compute() -> anyhow::Result<()> {
        let cache = cache(SettingsCache::DEFAULT_TTL);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v: String = cache
                .remember("settings:1:branding", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("computed".to_string())
                })
                .await?;
            assert_eq!(v, "computed");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn forget_forces_recompute() -> anyhow::Result<()> {
        let cache = cache(SettingsCache::DEFAULT_TTL);
        let key = branding_key(CacheScope::User(1));
        let first: u32 = cache.remember(&key, || async { Ok(1) }).await?;
        cache.invalidate_bundles(CacheScope::User(1)).await;
        let second: u32 = cache.remember(&key, || async { Ok(2) }).await?;
        assert_eq!((first, second), (1, 2));
        Ok(())
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() -> anyhow::Result<()> {
        let cache = cache(Duration::from_millis(100));
        let key = "settings:1:salary_slip_defaults";
        let _: u32 = cache.remember(key, || async { Ok(1) }).await?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        let v: u32 = cache.remember(key, || async { Ok(2) }).await?;
        assert_eq!(v, 2);
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_backend_falls_through() -> anyhow::Result<()> {
        let cache = SettingsCache::new(Arc::new(mock::UnavailableCacheBackend), SettingsCache::DEFAULT_TTL);
        let v: Option<i32> = cache.remember(ADMIN_ID_KEY, || async { Ok(Some(3)) }).await?;
        assert_eq!(v, Some(3));
        cache.invalidate_bundles(CacheScope::Guest).await;
        Ok(())
    }

    #[tokio::test]
    async fn compute_errors_propagate_and_are_not_cached() {
        let cache = cache(SettingsCache::DEFAULT_TTL);
        let err = cache
            .remember::<u32, _, _>("settings:1:branding", || async { Err(ServiceError::Db("down".into())) })
            .await;
        assert!(err.is_err());
        let v: u32 = cache.remember("settings:1:branding", || async { Ok(5) }).await.unwrap();
        assert_eq!(v, 5);
    }

    #[tokio::test]
    async fn undecodable_entry_is_a_miss() -> anyhow::Result<()> {
        let backend = Arc::new(MokaCacheBackend::new(10));
        backend.set("settings:1:branding", "not json".into(), Duration::from_secs(60)).await?;
        let cache = SettingsCache::new(backend, Duration::from_secs(60));
        let v: u32 = cache.remember("settings:1:branding", || async { Ok(9) }).await?;
        assert_eq!(v, 9);
        Ok(())
    }

    #[tokio::test]
    async fn admin_lookup_is_memoized_including_absence() -> anyhow::Result<()> {
        let inner = Arc::new(StaticAdminDirectory::new(None));
        let cache = cache(SettingsCache::DEFAULT_TTL);
        let directory = CachedAdminDirectory::new(inner.clone(), cache.clone());

        assert_eq!(directory.find_admin_user_id().await?, None);
        inner.set_admin(Some(4));
        assert_eq!(directory.find_admin_user_id().await?, None);
        assert_eq!(inner.lookups(), 1);

        cache.invalidate_admin_id().await;
        assert_eq!(directory.find_admin_user_id().await?, Some(4));
        assert_eq!(inner.lookups(), 2);
        Ok(())
    }
}
