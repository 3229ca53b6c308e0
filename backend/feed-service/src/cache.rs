//! Time-bounded feed cache
//!
//! `FeedCache` is the only component that reads or writes cache state. It
//! serializes payloads to JSON and stores them in a [`CacheBackend`]:
//! - [`MemoryCacheBackend`]: process-local, expiry driven by an injected [`Clock`]
//! - [`RedisCacheBackend`]: shared between processes, expiry via `SET .. PX`
//!
//! Writes to the record store never invalidate entries. A cached feed may be
//! stale for up to its TTL.
//!
//! Concurrent callers that miss at the same time each run `compute` and the
//! last write wins. There is no single-flight guard.

use crate::clock::{expires_at, Clock};
use crate::error::CacheError;
use crate::metrics::{FEED_CACHE_BYPASS, FEED_CACHE_HIT, FEED_CACHE_MISS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Storage for serialized cache payloads
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Live payload for `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `payload` under `key`, replacing any previous entry
    async fn set(&self, key: &str, payload: String, ttl: Duration) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    #[inline]
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Process-local backend
pub struct MemoryCacheBackend {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of stored entries, expired ones included until they are touched
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.payload.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        // Expired: evict. The read guard above is released by now.
        self.entries
            .remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, payload: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            payload,
            expires_at: expires_at(self.clock.now(), ttl),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// REDIS BACKEND
// ============================================================================

/// Redis backend. Keys are namespaced as `feed:{key}`.
#[derive(Clone)]
pub struct RedisCacheBackend {
    client: ConnectionManager,
}

impl RedisCacheBackend {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::from_connection_manager(manager))
    }

    pub fn from_connection_manager(client: ConnectionManager) -> Self {
        Self { client }
    }

    /// Ping Redis to check connection health
    pub async fn ping(&self) -> Result<(), CacheError> {
        redis::cmd("PING")
            .query_async::<_, String>(&mut self.client.clone())
            .await?;
        Ok(())
    }
}

fn namespaced_key(key: &str) -> String {
    format!("feed:{}", key)
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value: Option<String> = redis::cmd("GET")
            .arg(namespaced_key(key))
            .query_async(&mut self.client.clone())
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, payload: String, ttl: Duration) -> Result<(), CacheError> {
        // PX rejects 0; a sub-millisecond TTL is already expired.
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        if ttl_ms == 0 {
            return Ok(());
        }

        redis::cmd("SET")
            .arg(namespaced_key(key))
            .arg(payload)
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<_, ()>(&mut self.client.clone())
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        redis::cmd("DEL")
            .arg(namespaced_key(key))
            .query_async::<_, ()>(&mut self.client.clone())
            .await?;
        Ok(())
    }
}

// ============================================================================
// FEED CACHE
// ============================================================================

/// Typed get-or-compute cache over a [`CacheBackend`]
pub struct FeedCache<V> {
    backend: Arc<dyn CacheBackend>,
    _payload: PhantomData<fn() -> V>,
}

impl<V> Clone for FeedCache<V> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _payload: PhantomData,
        }
    }
}

impl<V> FeedCache<V>
where
    V: Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            _payload: PhantomData,
        }
    }

    /// Process-local cache driven by `clock`
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new(clock)))
    }

    /// Return the live entry for `key`, or run `compute` and store its result.
    ///
    /// Errors from `compute` are returned as-is and nothing is stored. Backend
    /// failures never fail the call: they are logged and the value is
    /// computed directly. A zero `ttl` disables storing.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        match self.backend.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str::<V>(&payload) {
                Ok(value) => {
                    FEED_CACHE_HIT.inc();
                    debug!(cache_key = %key, "Feed cache HIT");
                    return Ok(value);
                }
                Err(e) => {
                    FEED_CACHE_BYPASS.inc();
                    warn!(cache_key = %key, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {
                debug!(cache_key = %key, "Feed cache MISS");
            }
            Err(e) => {
                FEED_CACHE_BYPASS.inc();
                warn!(cache_key = %key, error = %e, "Feed cache read failed, computing directly");
            }
        }

        FEED_CACHE_MISS.inc();
        let value = compute().await?;

        if !ttl.is_zero() {
            self.store(key, &value, ttl).await;
        }

        Ok(value)
    }

    async fn store(&self, key: &str, value: &V, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                FEED_CACHE_BYPASS.inc();
                warn!(cache_key = %key, error = %e, "Feed cache serialization failed");
                return;
            }
        };

        let size_bytes = payload.len();
        match self.backend.set(key, payload, ttl).await {
            Ok(()) => debug!(
                cache_key = %key,
                size_bytes,
                ttl_secs = ttl.as_secs(),
                "Feed cache STORE"
            ),
            Err(e) => {
                FEED_CACHE_BYPASS.inc();
                warn!(cache_key = %key, error = %e, "Feed cache write failed");
            }
        }
    }

    /// Drop the entry for `key` regardless of its TTL
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.backend.remove(key).await?;
        debug!(cache_key = %key, "Feed cache INVALIDATE");
        Ok(())
    }
}
