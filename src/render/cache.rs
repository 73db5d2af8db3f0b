//! Decoded raster cache.
//!
//! Re-mounting a study, or switching back to one, repaints from this cache
//! instead of refetching and redecoding the image.
//!
//! # Cache Key
//!
//! Rasters are keyed by the full image locator, so the same instance served
//! by two archives is cached twice.
//!
//! # Size-Based Eviction
//!
//! The cache tracks the decoded size of cached rasters in bytes and evicts
//! least-recently-used entries when the capacity is exceeded.

use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::RwLock;

use crate::archive::ImageLocator;

use super::decoder::Raster;

/// Default cache capacity: 64MB
pub const DEFAULT_RASTER_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 1_024;

/// Decoded size of a raster in bytes.
fn raster_size(raster: &Raster) -> usize {
    raster.as_raw().len()
}

/// LRU cache for decoded rasters with size-based capacity.
///
/// A capacity of zero disables caching: every `put` is evicted immediately.
pub struct RasterCache {
    cache: RwLock<LruCache<ImageLocator, Raster>>,

    /// Maximum total size in bytes
    max_size: usize,

    /// Current total size in bytes
    current_size: RwLock<usize>,
}

impl RasterCache {
    /// Create a raster cache with default capacity (64MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RASTER_CACHE_CAPACITY)
    }

    /// Create a raster cache with the specified capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a raster cache with specified capacity and maximum entries.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(entries)),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// Get a raster, marking it as recently used.
    pub async fn get(&self, key: &ImageLocator) -> Option<Raster> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    /// Check if a raster is cached without updating LRU order.
    pub async fn contains(&self, key: &ImageLocator) -> bool {
        let cache = self.cache.read().await;
        cache.contains(key)
    }

    /// Store a raster, evicting least-recently-used entries past capacity.
    pub async fn put(&self, key: ImageLocator, raster: Raster) {
        let raster_bytes = raster_size(&raster);
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        if let Some(old) = cache.peek(&key) {
            *current_size = current_size.saturating_sub(raster_size(old));
        }

        // Entry-count eviction happens inside `push`, so account for it here.
        if let Some((_, evicted)) = cache.push(key, raster) {
            *current_size = current_size.saturating_sub(raster_size(&evicted));
        }
        *current_size += raster_bytes;

        while *current_size > self.max_size {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    *current_size = current_size.saturating_sub(raster_size(&evicted));
                }
                None => break,
            }
        }
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        *current_size = 0;
    }

    /// Get the current number of cached rasters.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Get the current total size of cached rasters in bytes.
    pub async fn size(&self) -> usize {
        *self.current_size.read().await
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for RasterCache {
    fn default() -> Self {
        Self::new()
    }
}
