//! Cache layer
//!
//! A process-local read-through cache for values that are expensive to
//! compute on every page: the sidebar aggregates, the sitemap and the feed.
//! Writes to posts or comments invalidate the affected keys.
//!
//! ```rust,ignore
//! use quillblog::cache::{create_cache, CacheLayer};
//!
//! let cache = create_cache(&config.cache);
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache operations.
///
/// The generic methods make this trait unusable as `dyn CacheLayer`;
/// services hold a concrete [`SharedCache`].
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration)
        -> Result<()>;

    /// Counter bumped by every delete, pattern delete and clear
    fn generation(&self) -> u64;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob pattern (`*` and `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

pub type SharedCache = Arc<MemoryCache>;

pub fn create_cache(config: &CacheConfig) -> SharedCache {
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        Duration::from_secs(config.ttl_seconds),
    ))
}

/// Return the cached value for `key`, or compute it with `load` and cache it.
///
/// A cache read failure (for example a stale entry of another type) is
/// treated as a miss. A value whose load overlapped an invalidation is
/// returned but not stored.
pub async fn get_or_load<C, T, F, Fut>(cache: &C, key: &str, ttl: Duration, load: F) -> Result<T>
where
    C: CacheLayer,
    T: Serialize + DeserializeOwned + Send + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match cache.get::<T>(key).await {
        Ok(Some(value)) => return Ok(value),
        Ok(None) => {}
        Err(e) => tracing::warn!("Ignoring unreadable cache entry {}: {}", key, e),
    }

    let generation = cache.generation();
    let value = load().await?;
    if cache.generation() != generation {
        tracing::debug!("Not caching {}: invalidated during load", key);
        return Ok(value);
    }
    if let Err(e) = cache.set(key, &value, ttl).await {
        tracing::warn!("Failed to cache {}: {}", key, e);
    }
    Ok(value)
}

/// Glob match where `*` is any run of characters and `?` exactly one
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();

    let (mut pi, mut ki) = (0, 0);
    // Position of the last `*` seen and the key index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ki));
            pi += 1;
        } else if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
            pi += 1;
            ki += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ki = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}
