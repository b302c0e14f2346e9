use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Instant;

use futures::channel::mpsc::{Receiver, Sender, channel};
use image::RgbaImage;

use crate::cache::TileCache;
use crate::io::{Fetch, FetchError, HttpFetch, HttpOptions, fetch_continuously, runtime::Runtime};
use crate::tiles::{CachedTile, TextureRegistry, TileKey};
use crate::{MapConfig, UrlPattern, WorldPos, ZoomLevels, world_to_tile};

/// Lock, ignoring the poison. Nothing in the engine can leave the state half-updated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Cache and outstanding fetches, guarded together so that "is it cached or pending" can be
/// answered and acted upon atomically.
struct State {
    cache: TileCache,

    /// Keys with an outstanding fetch, with the time they were requested at. A key leaves this
    /// map when its tile is published or when the fetch fails.
    pending: HashMap<TileKey, Instant>,

    /// Tiles to be downloaded by the IO thread.
    request_tx: Sender<TileKey>,

    shut_down: bool,
}

impl State {
    fn ensure_requested(&mut self, key: TileKey) -> bool {
        if self.shut_down || self.pending.contains_key(&key) || self.cache.contains(&key) {
            return false;
        }

        match self.request_tx.try_send(key) {
            Ok(()) => {
                log::trace!("Requested {key:?}.");
                self.pending.insert(key, Instant::now());
                true
            }
            Err(e) if e.is_full() => {
                log::debug!("Request queue is full, {key:?} will be requested later.");
                false
            }
            Err(_) => {
                log::error!("IO thread is dead.");
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Tiles in the cache.
    pub cached: usize,

    /// Tiles requested, but not yet published.
    pub pending: usize,

    /// Tiles being downloaded right now.
    pub in_progress: usize,
}

/// Multi-resolution tile cache which fills itself in the background.
///
/// The render loop calls [`TileEngine::preload`] once per frame, then draws whatever
/// [`TileEngine::query`] returns. Neither of them ever waits for the network.
pub struct TileEngine {
    levels: ZoomLevels,
    state: Arc<Mutex<State>>,

    /// Tiles that got downloaded and should be published in the cache.
    tile_rx: Mutex<Receiver<(TileKey, RgbaImage)>>,

    registry: Arc<dyn TextureRegistry>,
    in_progress: Arc<AtomicUsize>,

    /// Dropping it stops the IO thread.
    runtime: Mutex<Option<Runtime>>,
}

impl TileEngine {
    /// Engine fetching tiles over HTTP from the server given in `config`.
    pub fn new(
        config: &MapConfig,
        options: &HttpOptions,
        registry: Arc<dyn TextureRegistry>,
    ) -> Result<Self, FetchError> {
        let fetch = HttpFetch::new(UrlPattern::from_config(config), options)?;
        Ok(Self::with_fetch(
            fetch,
            config.zoom_levels(),
            config.cache_capacity(),
            options.request_queue,
            registry,
        ))
    }

    /// Engine fetching tiles from a custom [`Fetch`].
    pub fn with_fetch<F>(
        fetch: F,
        levels: ZoomLevels,
        capacity: NonZeroUsize,
        request_queue: usize,
        registry: Arc<dyn TextureRegistry>,
    ) -> Self
    where
        F: Fetch + Send + Sync + 'static,
    {
        let (request_tx, request_rx) = channel(request_queue);
        let (tile_tx, tile_rx) = channel(request_queue);

        let releasing = Arc::clone(&registry);
        let cache = TileCache::new(capacity, move |key, tile: &CachedTile| {
            if tile.destroy() {
                log::trace!("Releasing texture of {key:?}.");
                releasing.release(tile.texture());
            }
        });

        let state = Arc::new(Mutex::new(State {
            cache,
            pending: HashMap::new(),
            request_tx,
            shut_down: false,
        }));

        let in_progress = Arc::new(AtomicUsize::new(0));
        let forgetting = Arc::clone(&state);

        // This will run concurrently in a loop, handing downloads and talk with us via channels.
        let runtime = Runtime::new(
            "tile fetching",
            fetch_continuously(
                fetch,
                Arc::clone(&in_progress),
                request_rx,
                tile_tx,
                Arc::clone(&registry),
                move |key| {
                    lock(&forgetting).pending.remove(&key);
                },
            ),
        );

        Self {
            levels,
            state,
            tile_rx: Mutex::new(tile_rx),
            registry,
            in_progress,
            runtime: Mutex::new(Some(runtime)),
        }
    }

    pub fn levels(&self) -> &ZoomLevels {
        &self.levels
    }

    /// Start fetching `key`, unless it is cached or being fetched already. Returns whether a new
    /// fetch was started. Keys outside of the server's zoom range are never fetched.
    pub fn ensure_requested(&self, key: TileKey) -> bool {
        if self.levels.is_synthetic(key.zoom) {
            log::debug!("{key:?} is not served, not requesting it.");
            return false;
        }

        lock(&self.state).ensure_requested(key)
    }

    /// Publish the tiles fetched since the last call, then request the square of tiles with the
    /// given `radius` around `center`. Returns the number of newly started fetches.
    ///
    /// Synthetic zoom levels request the tiles of the nearest native level.
    pub fn preload(&self, center: WorldPos, zoom: i32, radius: u32) -> usize {
        self.publish();

        let center = world_to_tile(center, self.levels.fetch_zoom(zoom), &self.levels);
        let mut state = lock(&self.state);
        center
            .around(radius)
            .filter(|key| state.ensure_requested(*key))
            .count()
    }

    /// Register textures of the fetched tiles and put them in the cache. Must be called from
    /// the context in which the [`TextureRegistry`] may create textures. [`TileEngine::preload`]
    /// does it already. Returns the number of published tiles.
    pub fn publish(&self) -> usize {
        let fetched: Vec<_> = {
            let mut tile_rx = lock(&self.tile_rx);
            std::iter::from_fn(|| tile_rx.try_next().ok().flatten()).collect()
        };

        let mut published = 0;
        for (key, image) in fetched {
            if lock(&self.state).shut_down {
                break;
            }

            match self.registry.register(key, &image) {
                Ok(texture) => {
                    let tile = Arc::new(CachedTile::new(key, image, texture));
                    let mut state = lock(&self.state);
                    if let Some(requested) = state.pending.remove(&key) {
                        log::trace!("{key:?} published after {:?}.", requested.elapsed());
                    }
                    state.cache.put(key, tile);
                    published += 1;
                }
                Err(e) => {
                    log::warn!("{e}");
                    lock(&self.state).pending.remove(&key);
                }
            }
        }

        published
    }

    /// Get a tile if it is available. Never starts any fetch.
    pub fn query(&self, key: TileKey) -> Option<Arc<CachedTile>> {
        lock(&self.state).cache.get(&key)
    }

    pub fn stats(&self) -> EngineStats {
        let state = lock(&self.state);
        EngineStats {
            cached: state.cache.len(),
            pending: state.pending.len(),
            in_progress: self.in_progress.load(Ordering::Relaxed),
        }
    }

    /// Stop fetching and release all tiles. Outstanding fetches are cancelled. Can be called
    /// multiple times.
    pub fn shutdown(&self) {
        let Some(runtime) = lock(&self.runtime).take() else {
            return;
        };

        log::debug!("Shutting down the tile engine.");
        lock(&self.state).shut_down = true;

        // IO thread might be waiting for the state to forget a failed key, so the lock can not
        // be held here.
        drop(runtime);
        self.in_progress.store(0, Ordering::Relaxed);

        {
            let mut state = lock(&self.state);
            state.pending.clear();
            state.cache.shutdown();
        }

        let mut tile_rx = lock(&self.tile_rx);
        tile_rx.close();
        while let Ok(Some((key, _))) = tile_rx.try_next() {
            log::trace!("Dropping {key:?}, fetched after shutdown.");
        }
    }
}

impl Drop for TileEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
