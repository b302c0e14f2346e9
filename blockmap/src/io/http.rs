use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;

use crate::{
    TileKey,
    io::{Fetch, FetchError},
    sources::TileSource,
};

pub use reqwest::header::HeaderValue;

/// Controls how tiles and markers are fetched over HTTP.
pub struct HttpOptions {
    /// User agent to be sent to the map server.
    pub user_agent: Option<HeaderValue>,

    /// Maximum number of parallel tile downloads.
    pub max_parallel_downloads: MaxParallelDownloads,

    /// Number of tile requests which may wait for a free download slot. Requests beyond that
    /// are not recorded and get retried on the next frame.
    pub request_queue: usize,

    /// Maximum time for establishing a connection.
    pub connect_timeout: Duration,

    /// Maximum time for a whole request, response body included. Expiry counts as an ordinary
    /// fetch failure.
    pub request_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: Some(HeaderValue::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION"),
            ))),
            max_parallel_downloads: MaxParallelDownloads::default(),
            // Enough for the largest preload square (radius 5).
            request_queue: 128,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl HttpOptions {
    pub(crate) fn client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        builder.build()
    }
}

/// Maximum number of parallel downloads.
pub struct MaxParallelDownloads(pub usize);

impl Default for MaxParallelDownloads {
    /// Four, as a small map server is not expected to handle more from a single player.
    fn default() -> Self {
        Self(4)
    }
}

impl MaxParallelDownloads {
    /// Use custom value. Keep in mind that the map server is typically run by a game server
    /// owner on modest hardware.
    pub fn value_manually_confirmed_with_server_owner(value: usize) -> Self {
        Self(value.max(1))
    }
}

/// Fetch tile images from a [`TileSource`] over HTTP.
pub struct HttpFetch<S> {
    source: S,
    client: reqwest::Client,
    max_parallel_downloads: usize,
}

impl<S> HttpFetch<S>
where
    S: TileSource,
{
    pub fn new(source: S, options: &HttpOptions) -> Result<Self, FetchError> {
        Ok(Self {
            source,
            client: options.client()?,
            max_parallel_downloads: options.max_parallel_downloads.0,
        })
    }
}

impl<S> Fetch for HttpFetch<S>
where
    S: TileSource + Send + Sync,
{
    async fn fetch(&self, key: TileKey) -> Result<Bytes, FetchError> {
        let url = self.source.tile_url(key);
        log::trace!("Getting {key:?} from {url}.");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        log::debug!("Got {status} for {key:?}.");

        if status != StatusCode::OK {
            return Err(FetchError::Protocol(status));
        }

        Ok(response.bytes().await?)
    }

    fn max_concurrency(&self) -> usize {
        self.max_parallel_downloads
    }
}
