use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::tiles::{CachedTile, TileKey};

type OnEvict = Box<dyn FnMut(TileKey, &CachedTile) + Send>;

/// Bounded in-memory tile cache with least-recently-used eviction.
///
/// Every tile leaving the cache, be it evicted, replaced or dropped at shutdown, is handed to
/// the `on_evict` hook before it is gone, so that its texture can be released.
pub struct TileCache {
    entries: LruCache<TileKey, Arc<CachedTile>>,
    on_evict: OnEvict,
    shut_down: bool,
}

impl TileCache {
    pub fn new(
        capacity: NonZeroUsize,
        on_evict: impl FnMut(TileKey, &CachedTile) + Send + 'static,
    ) -> Self {
        Self {
            entries: LruCache::new(capacity),
            on_evict: Box::new(on_evict),
            shut_down: false,
        }
    }

    /// Get the tile and mark it as the most recently used. Never blocks on IO and never starts
    /// any download.
    pub fn get(&mut self, key: &TileKey) -> Option<Arc<CachedTile>> {
        self.entries
            .get(key)
            .filter(|tile| tile.is_valid())
            .cloned()
    }

    /// Check the presence of a valid tile without touching the recency order.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.peek(key).is_some_and(|tile| tile.is_valid())
    }

    /// Insert or replace a tile. When full, the least recently used tile is evicted first.
    pub fn put(&mut self, key: TileKey, tile: Arc<CachedTile>) {
        if self.shut_down {
            log::debug!("Cache is shut down, dropping {key:?}.");
            (self.on_evict)(key, &tile);
            return;
        }

        if let Some(previous) = self.entries.pop(&key) {
            if !Arc::ptr_eq(&previous, &tile) {
                (self.on_evict)(key, &previous);
            }
        } else if self.entries.len() == self.entries.cap().get() {
            if let Some((evicted_key, evicted)) = self.entries.pop_lru() {
                log::trace!("Evicting {evicted_key:?}.");
                (self.on_evict)(evicted_key, &evicted);
            }
        }

        self.entries.put(key, tile);
    }

    /// Drop all tiles. Further insertions are rejected. Can be called multiple times.
    pub fn shutdown(&mut self) {
        while let Some((key, tile)) = self.entries.pop_lru() {
            (self.on_evict)(key, &tile);
        }
        self.shut_down = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}
