//! Result caching for async methods.
//!
//! [`Cacheable`] wraps a computation the way a caching method decorator would:
//! the result is stored under `Class:method:<json args>` with a TTL and served
//! from the cache until it expires. The cache backend is any [`CacheClient`];
//! with no client configured every call goes straight to the computation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::{MemoryCache, DEFAULT_CAPACITY};
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

/// Default time-to-live for cached results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal key-value store with expiry.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<(), CacheError>;
}

/// Optional cache client shared through the container.
#[derive(Clone, Default)]
pub struct CacheHandle(Option<Arc<dyn CacheClient>>);

impl CacheHandle {
    pub fn new(client: Arc<dyn CacheClient>) -> Self {
        Self(Some(client))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn client(&self) -> Option<&Arc<dyn CacheClient>> {
        self.0.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }
}

impl std::fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CacheHandle").field(&self.is_configured()).finish()
    }
}

/// Caching wrapper for method results.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lightspring::cache::{CacheHandle, Cacheable, MemoryCache};
///
/// # tokio_test_block(async {
/// let cache = Cacheable::new(CacheHandle::new(Arc::new(MemoryCache::new())));
/// let first: u32 = cache.call("Math", "square", &(4,), || async { 16 }).await;
/// let second: u32 = cache.call("Math", "square", &(4,), || async { 0 }).await;
/// assert_eq!((first, second), (16, 16));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Cacheable {
    cache: CacheHandle,
    ttl: Duration,
}

impl Cacheable {
    pub fn new(cache: CacheHandle) -> Self {
        Self { cache, ttl: DEFAULT_TTL }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Key for a call: `Class:method:<json args>`.
    pub fn cache_key<A: Serialize + ?Sized>(class: &str, method: &str, args: &A) -> Result<String, CacheError> {
        Ok(format!("{}:{}:{}", class, method, serde_json::to_string(args)?))
    }

    /// Returns the cached result for this call or computes and stores it.
    pub async fn call<A, T, F, Fut>(&self, class: &str, method: &str, args: &A, compute: F) -> T
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.try_call(class, method, args, move || async move { Ok::<T, std::convert::Infallible>(compute().await) }).await {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`call`](Self::call) for fallible computations. Errors are returned
    /// as-is and never cached.
    pub async fn try_call<A, T, E, F, Fut>(&self, class: &str, method: &str, args: &A, compute: F) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(client) = self.cache.client() else {
            return compute().await;
        };

        let key = match Self::cache_key(class, method, args) {
            Ok(key) => key,
            Err(err) => {
                warn!(class, method, error = %err, "arguments not serializable, skipping cache");
                return compute().await;
            }
        };

        match client.get(&key).await {
            Ok(Some(cached)) if !cached.is_empty() => match serde_json::from_str::<T>(&cached) {
                Ok(value) => {
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(err) => warn!(key = %key, error = %err, "discarding unreadable cache entry"),
            },
            Ok(_) => {}
            Err(err) => {
                error!(key = %key, error = %err, "cache read failed");
                return compute().await;
            }
        }

        debug!(key = %key, "cache miss");
        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(encoded) => {
                if let Err(err) = client.set_ex(&key, self.ttl, encoded).await {
                    error!(key = %key, error = %err, "cache write failed");
                }
            }
            Err(err) => warn!(key = %key, error = %err, "result not serializable, not cached"),
        }
        Ok(value)
    }
}
