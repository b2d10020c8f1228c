//! Response cache using moka
//!
//! Stage payloads keyed by a SHA-256 digest of the stage name and its
//! arguments. Entries are evicted by capacity and, optionally, by age.

use crate::config::CacheConfig;
use crate::stage::Stage;
use moka::future::Cache;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Stage payload cache
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Cache<String, Value>,
}

impl ResponseCache {
    /// Create cache with max capacity and no expiry
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity.max(1)),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity.max(1))
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Create cache from configuration; `ttl_secs == 0` disables expiry
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        if config.ttl_secs == 0 {
            Self::new(config.max_entries)
        } else {
            Self::with_ttl(config.max_entries, Duration::from_secs(config.ttl_secs))
        }
    }

    /// Cached payload for a key
    #[inline]
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key).await
    }

    /// Store payload
    #[inline]
    pub async fn insert(&self, key: String, payload: Value) {
        self.inner.insert(key, payload).await;
    }

    /// Invalidate cache entry
    #[inline]
    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Apply pending evictions and expirations
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }

    /// Get approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[derive(Serialize)]
struct KeyMaterial<'a> {
    args: &'a [String],
    stage: &'a str,
}

/// Deterministic cache key for a stage invocation
#[must_use]
pub fn cache_key(stage: Stage, args: &[String]) -> String {
    let material = KeyMaterial {
        args,
        stage: stage.as_str(),
    };
    // Serializing a struct of strings cannot fail.
    let encoded = serde_json::to_vec(&material).unwrap_or_default();
    hex::encode(Sha256::digest(&encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn key_is_stable_and_hex() {
        let a = cache_key(Stage::GenerateProblem, &args(&["7th", "medium"]));
        let b = cache_key(Stage::GenerateProblem, &args(&["7th", "medium"]));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_depends_on_stage_and_args() {
        let base = cache_key(Stage::GenerateProblem, &args(&["7th", "medium"]));
        assert_ne!(base, cache_key(Stage::GenerateProblem, &args(&["7th", "hard"])));
        assert_ne!(base, cache_key(Stage::IdentifyDisability, &args(&["7th", "medium"])));
        assert_ne!(
            cache_key(Stage::GenerateProblem, &args(&["a", "bc"])),
            cache_key(Stage::GenerateProblem, &args(&["ab", "c"]))
        );
    }

    #[tokio::test]
    async fn insert_get_invalidate() {
        let cache = ResponseCache::new(10);
        cache.insert("k".to_string(), json!({"problem": "p"})).await;
        assert_eq!(cache.get("k").await, Some(json!({"problem": "p"})));

        cache.invalidate("k").await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn capacity_bounds_entries() {
        let cache = ResponseCache::new(2);
        for i in 0..20 {
            cache.insert(format!("k{i}"), json!({"i": i})).await;
        }
        cache.run_pending_tasks().await;
        assert!(cache.entry_count() <= 2);
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let cache = ResponseCache::with_ttl(10, Duration::from_millis(50));
        cache.insert("k".to_string(), json!({})).await;
        assert!(cache.get("k").await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let cache = ResponseCache::from_config(&CacheConfig {
            enabled: true,
            ttl_secs: 0,
            max_entries: 0,
        });
        cache.insert("k".to_string(), json!({"x": 1})).await;
        assert!(cache.get("k").await.is_some());
    }
}
