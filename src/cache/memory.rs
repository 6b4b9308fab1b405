//! In-memory response cache keyed by request fingerprint.
//!
//! Uses DashMap so schedulers on different tasks can share one instance.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::ResponseCache;
use crate::error::CacheError;
use crate::http::{Request, Response};

/// Configuration for [`MemoryCache`].
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    pub max_entries: usize,
    /// TTL used when a request carries no `cache_timeout`.
    pub default_ttl: Duration,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: Duration::from_secs(60),
        }
    }
}

struct CacheEntry {
    response: Arc<Response>,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() <= self.ttl
    }
}

/// Bounded TTL cache of responses.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    config: MemoryCacheConfig,
}

impl MemoryCache {
    pub fn new(config: MemoryCacheConfig) -> Self {
        Self {
            entries: DashMap::with_capacity(config.max_entries.min(1024)),
            config,
        }
    }

    /// Fresh response stored under `key`.
    pub fn lookup(&self, key: &str) -> Option<Arc<Response>> {
        let entry = self.entries.get(key)?;
        entry.is_fresh().then(|| Arc::clone(&entry.response))
    }

    /// Store `response` under `key`, evicting the oldest entry when full.
    pub fn insert(&self, key: String, response: Arc<Response>, ttl: Duration) {
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.entries.insert(key, CacheEntry { response, stored_at: Instant::now(), ttl });
    }

    pub fn remove(&self, key: &str) -> Option<Arc<Response>> {
        self.entries.remove(key).map(|(_, entry)| entry.response)
    }

    /// Remove expired entries.
    pub fn cleanup(&self) {
        self.entries.retain(|_, entry| entry.is_fresh());
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.stored_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(MemoryCacheConfig::default())
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, request: &Request) -> Result<Option<Arc<Response>>, CacheError> {
        Ok(self.lookup(request.cache_key()))
    }

    fn set(&self, request: &Request, response: &Arc<Response>) -> Result<(), CacheError> {
        if self.config.max_entries == 0 {
            return Err(CacheError::Rejected("cache has zero capacity".into()));
        }
        let ttl = request.cache_timeout().unwrap_or(self.config.default_ttl);
        self.insert(request.cache_key().to_string(), Arc::clone(response), ttl);
        Ok(())
    }
}
