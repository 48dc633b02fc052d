//! Response caching system
//!
//! One cache instance is shared by every session. Entries are keyed on the
//! step name plus a digest of the step's full input tuple, expire after a
//! fixed TTL, and the least recently used entry is evicted on overflow.
//! Only successful results are ever stored.

use crate::error::{Error, Result};
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Deterministic cache key for one step invocation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from the step identity and its inputs.
    ///
    /// Inputs are JSON-encoded before hashing so tuples such as
    /// `("a:b", 1)` and `("a", "b:1")` never collide.
    pub fn new<I: Serialize + ?Sized>(step: &str, inputs: &I) -> Result<Self> {
        let encoded = serde_json::to_vec(inputs)?;
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        Ok(Self(format!("{step}:{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cached value with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub entries: usize,
}

/// In-memory TTL + LRU cache shared across sessions
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl ResponseCache {
    /// Create a cache holding at most `max_entries` values for `ttl` each
    pub fn new(max_entries: usize, ttl: Duration) -> Result<Self> {
        let capacity = NonZeroUsize::new(max_entries)
            .ok_or_else(|| Error::Config("cache capacity must be at least 1".to_string()))?;

        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        })
    }

    pub fn from_config(config: &crate::config::CacheConfig) -> Result<Self> {
        Self::new(config.max_entries, config.ttl)
    }

    /// Look up a fresh value; expired entries are removed and reported absent
    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(key.as_str()) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache hit");
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key.as_str());
            self.expirations.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache miss");
        None
    }

    /// Store a value, evicting the least recently used entry when full
    pub async fn put(&self, key: &CacheKey, value: serde_json::Value) {
        let mut entries = self.entries.lock().await;

        if entries.len() == entries.cap().get() && !entries.contains(key.as_str()) {
            self.purge_expired(&mut entries);
        }

        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
        };
        if let Some((evicted, _)) = entries.push(key.as_str().to_string(), entry) {
            if evicted != key.as_str() {
                debug!(evicted = %evicted, "Evicted least recently used cache entry");
            }
        }
    }

    /// Typed lookup; a value that no longer decodes is treated as a miss
    pub async fn get_as<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(key = %key, error = %e, "Discarding undecodable cache entry");
                self.entries.lock().await.pop(key.as_str());
                None
            }
        }
    }

    /// Typed store
    pub async fn put_as<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.put(key, value).await;
        Ok(())
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }

    fn purge_expired(&self, entries: &mut LruCache<String, CacheEntry>) {
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            entries.pop(&key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }
    }
}
