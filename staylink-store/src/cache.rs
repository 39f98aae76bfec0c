//! Shared cache with in-flight request coalescing.
//!
//! Adapters go through [`SharedCache::with_cache`]: a hit returns immediately,
//! a miss either joins the fetch already running for that key or starts one.
//! At most one producer runs per key at a time. Coalescing is process-local;
//! with several processes behind a load balancer each one may issue its own
//! fetch, while the networked backend still shares the stored result.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use staylink_core::{CoreError, CoreResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::app_config::CacheConfig;
use crate::redis_repo::RedisClient;

#[derive(Debug, thiserror::Error)]
pub enum CacheStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache configuration error: {0}")]
    Config(String),
}

/// Key-value backend behind the shared cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheStoreError>;

    async fn set(&self, key: &str, value: &serde_json::Value, ttl: Duration) -> Result<(), CacheStoreError>;
}

// ============================================================================
// In-process backend
// ============================================================================

struct MemoryEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Time-indexed map; expired entries are dropped on the first read after expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheStoreError> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        // Guard released above; remove only if still expired
        self.entries.remove_if(key, |_, entry| entry.expires_at <= Instant::now());
        Ok(None)
    }

    async fn set(&self, key: &str, value: &serde_json::Value, ttl: Duration) -> Result<(), CacheStoreError> {
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

// ============================================================================
// Shared cache
// ============================================================================

type InFlight = Shared<BoxFuture<'static, CoreResult<serde_json::Value>>>;

#[derive(Clone)]
pub struct SharedCache {
    store: Arc<dyn CacheStore>,
    in_flight: Arc<DashMap<String, InFlight>>,
}

impl SharedCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Redis when both URL and token are configured, the in-process map otherwise.
    pub async fn from_config(config: &CacheConfig) -> Self {
        match config.networked() {
            Some((url, token)) => match RedisClient::with_token(url, token).await {
                Ok(client) => Self::new(Arc::new(client)),
                Err(err) => {
                    warn!(error = %err, "Networked cache unavailable, using in-process cache");
                    Self::in_memory()
                }
            },
            None => {
                debug!("No networked cache credentials, using in-process cache");
                Self::in_memory()
            }
        }
    }

    /// Backend failures and undecodable entries read as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.store.get(key).await {
            Ok(value) => value?,
            Err(err) => {
                warn!(key, error = %err, "Cache read failed, recomputing");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                debug!(key, error = %err, "Cached value has an unexpected shape, ignoring it");
                None
            }
        }
    }

    /// Failures are logged and swallowed.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(json) => self.store_value(key, &json, ttl).await,
            Err(err) => warn!(key, error = %err, "Value could not be serialized for caching"),
        }
    }

    async fn store_value(&self, key: &str, value: &serde_json::Value, ttl: Duration) {
        if let Err(err) = self.store.set(key, value, ttl).await {
            warn!(key, error = %err, "Cache write failed, serving uncached value");
        }
    }

    /// Number of keys with a producer currently running.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns the cached value for `key`, or runs `producer` once for all concurrent callers.
    ///
    /// Successful results are cached for `ttl`; failures reach every waiter and are not cached.
    /// The producer runs on its own task, so it completes even if every caller goes away.
    pub async fn with_cache<T, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> CoreResult<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<T>> + Send + 'static,
    {
        if let Some(hit) = self.get::<T>(key).await {
            debug!(key, "Cache hit");
            return Ok(hit);
        }

        let fetch = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                debug!(key, "Joining in-flight fetch");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                debug!(key, "Cache miss, fetching upstream");
                let fetch = self.spawn_producer(key.to_string(), ttl, producer());
                slot.insert(fetch.clone());
                fetch
            }
        };

        let value = fetch.await?;
        serde_json::from_value(value)
            .map_err(|e| CoreError::InternalError(format!("cached value for {} did not decode: {}", key, e)))
    }

    fn spawn_producer<T, Fut>(&self, key: String, ttl: Duration, producer: Fut) -> InFlight
    where
        T: Serialize + Send + 'static,
        Fut: Future<Output = CoreResult<T>> + Send + 'static,
    {
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            let result = match producer.await {
                Ok(value) => serde_json::to_value(&value)
                    .map_err(|e| CoreError::InternalError(format!("value for {} did not serialize: {}", key, e))),
                Err(err) => Err(err),
            };

            if let Ok(value) = &result {
                cache.store_value(&key, value, ttl).await;
            }
            cache.in_flight.remove(&key);
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(CoreError::InternalError(format!("cache producer task failed: {}", e))))
        }
        .boxed()
        .shared()
    }
}
