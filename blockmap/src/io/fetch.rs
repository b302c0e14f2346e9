//! Asynchronous fetching loop.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use bytes::Bytes;
use futures::{
    SinkExt, StreamExt,
    channel::mpsc::{Receiver, Sender},
    future::{Either, select, select_all},
};
use image::RgbaImage;
use reqwest::StatusCode;

use crate::tiles::{TextureRegistry, TileKey};

/// Reasons for a tile to stay absent. None of them is fatal, the tile is simply requested again
/// on one of the next frames.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    Protocol(StatusCode),

    #[error("could not decode the image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Source of raw tile images.
pub trait Fetch {
    fn fetch(&self, key: TileKey) -> impl Future<Output = Result<Bytes, FetchError>> + Send;

    /// Maximum number of fetches running at the same time.
    fn max_concurrency(&self) -> usize;
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("Tile request channel from the engine was broken.")]
    RequestChannelBroken,

    #[error("Tile channel to the engine was closed.")]
    TileChannelClosed,

    #[error("Tile channel to the engine was full.")]
    TileChannelFull,
}

impl From<futures::channel::mpsc::SendError> for Error {
    fn from(error: futures::channel::mpsc::SendError) -> Self {
        if error.is_disconnected() {
            Error::TileChannelClosed
        } else {
            Error::TileChannelFull
        }
    }
}

type Fetched = Result<(TileKey, RgbaImage), (TileKey, FetchError)>;

/// Download and decode the tile.
async fn fetch_and_decode(fetch: &impl Fetch, key: TileKey) -> Fetched {
    fetch_and_decode_impl(fetch, key)
        .await
        .map(|image| (key, image))
        .map_err(|error| (key, error))
}

async fn fetch_and_decode_impl(fetch: &impl Fetch, key: TileKey) -> Result<RgbaImage, FetchError> {
    let bytes = fetch.fetch(key).await?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

async fn fetch_complete(
    mut tile_tx: Sender<(TileKey, RgbaImage)>,
    registry: &dyn TextureRegistry,
    forget: &impl Fn(TileKey),
    result: Fetched,
) -> Result<(), Error> {
    match result {
        Ok((key, image)) => {
            log::trace!("{key:?} is ready.");
            tile_tx.send((key, image)).await?;
            registry.request_repaint();
        }
        Err((key, error)) => {
            log::warn!("Could not fetch {key:?}: {error}.");
            forget(key);
        }
    };

    Ok(())
}

async fn fetch_continuously_impl(
    fetch: impl Fetch,
    in_progress: Arc<AtomicUsize>,
    mut request_rx: Receiver<TileKey>,
    tile_tx: Sender<(TileKey, RgbaImage)>,
    registry: Arc<dyn TextureRegistry>,
    forget: impl Fn(TileKey),
) -> Result<(), Error> {
    let max_concurrency = fetch.max_concurrency().max(1);
    let mut outstanding = Vec::new();

    loop {
        if outstanding.is_empty() {
            // Only new downloads might be requested.
            let key = request_rx.next().await.ok_or(Error::RequestChannelBroken)?;
            outstanding.push(Box::pin(fetch_and_decode(&fetch, key)));
        } else if outstanding.len() < max_concurrency {
            // New downloads might be requested or ongoing downloads might be completed.
            match select(request_rx.next(), select_all(outstanding.drain(..))).await {
                Either::Left((request, remaining)) => {
                    let key = request.ok_or(Error::RequestChannelBroken)?;
                    outstanding = remaining.into_inner();
                    outstanding.push(Box::pin(fetch_and_decode(&fetch, key)));
                }
                Either::Right(((result, _, remaining), _)) => {
                    fetch_complete(tile_tx.to_owned(), registry.as_ref(), &forget, result).await?;
                    outstanding = remaining;
                }
            }
        } else {
            // Only ongoing downloads might be completed.
            let (result, _, remaining) = select_all(outstanding.drain(..)).await;
            fetch_complete(tile_tx.to_owned(), registry.as_ref(), &forget, result).await?;
            outstanding = remaining;
        }

        in_progress.store(outstanding.len(), Ordering::Relaxed);
    }
}

/// Continuously fetch tiles requested via the request channel. Decoded images go to the tile
/// channel, keys which failed are handed to `forget`.
pub(crate) async fn fetch_continuously(
    fetch: impl Fetch,
    in_progress: Arc<AtomicUsize>,
    request_rx: Receiver<TileKey>,
    tile_tx: Sender<(TileKey, RgbaImage)>,
    registry: Arc<dyn TextureRegistry>,
    forget: impl Fn(TileKey),
) {
    match fetch_continuously_impl(fetch, in_progress, request_rx, tile_tx, registry, forget).await
    {
        Ok(()) | Err(Error::TileChannelClosed) | Err(Error::RequestChannelBroken) => {
            log::debug!("Tile fetch loop finished.");
        }
        Err(error) => {
            log::error!("Tile fetch loop failed: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessTextures;
    use crate::testing::png;
    use futures::channel::mpsc;
    use std::sync::Mutex;

    /// Serves a valid PNG for non-negative columns and garbage for negative ones.
    struct Picky;

    impl Fetch for Picky {
        async fn fetch(&self, key: TileKey) -> Result<Bytes, FetchError> {
            if key.x >= 0 {
                Ok(png())
            } else {
                Ok(Bytes::from_static(b"definitely not an image"))
            }
        }

        fn max_concurrency(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn decoded_tiles_are_sent_and_failures_forgotten() {
        let _ = env_logger::try_init();

        let (mut request_tx, request_rx) = mpsc::channel(8);
        let (tile_tx, mut tile_rx) = mpsc::channel(8);
        let forgotten = Arc::new(Mutex::new(Vec::new()));
        let forgotten_clone = Arc::clone(&forgotten);

        request_tx.try_send(TileKey::new(0, 1, 1)).unwrap();
        request_tx.try_send(TileKey::new(0, -1, 1)).unwrap();
        request_tx.try_send(TileKey::new(0, 2, 1)).unwrap();

        let in_progress = Arc::new(AtomicUsize::new(0));
        let fetching = tokio::spawn(fetch_continuously(
            Picky,
            Arc::clone(&in_progress),
            request_rx,
            tile_tx,
            Arc::new(HeadlessTextures::default()),
            move |key| forgotten_clone.lock().unwrap().push(key),
        ));

        let mut received = vec![tile_rx.next().await.unwrap(), tile_rx.next().await.unwrap()];
        received.sort_by_key(|(key, _)| key.x);

        assert_eq!(TileKey::new(0, 1, 1), received[0].0);
        assert_eq!(TileKey::new(0, 2, 1), received[1].0);
        assert_eq!(4, received[0].1.width());

        // Closing the request channel ends the loop.
        drop(request_tx);
        fetching.await.unwrap();

        assert_eq!(vec![TileKey::new(0, -1, 1)], *forgotten.lock().unwrap());
        assert_eq!(0, in_progress.load(Ordering::Relaxed));
    }

    /// Never finishes, counting how many fetches were started.
    struct Stuck {
        started: Arc<AtomicUsize>,
    }

    impl Fetch for Stuck {
        async fn fetch(&self, _key: TileKey) -> Result<Bytes, FetchError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            futures::future::pending().await
        }

        fn max_concurrency(&self) -> usize {
            3
        }
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let _ = env_logger::try_init();

        let (mut request_tx, request_rx) = mpsc::channel(16);
        let (tile_tx, _tile_rx) = mpsc::channel(1);
        let started = Arc::new(AtomicUsize::new(0));
        let in_progress = Arc::new(AtomicUsize::new(0));

        for x in 0..10 {
            request_tx.try_send(TileKey::new(0, x, 0)).unwrap();
        }

        let fetching = tokio::spawn(fetch_continuously(
            Stuck {
                started: Arc::clone(&started),
            },
            Arc::clone(&in_progress),
            request_rx,
            tile_tx,
            Arc::new(HeadlessTextures::default()),
            |_| {},
        ));

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(3, started.load(Ordering::SeqCst));
        assert_eq!(3, in_progress.load(Ordering::Relaxed));

        fetching.abort();
    }
}
