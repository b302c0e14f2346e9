use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::StatusCode;

use super::{MarkerError, Markers, parse_players, parse_towns};
use crate::io::{HttpOptions, runtime::Runtime};
use crate::MapConfig;

/// Players feed is small and polled often, so it gets a shorter timeout than the towns.
const PLAYERS_TIMEOUT: Duration = Duration::from_secs(10);

type Shared = Arc<Mutex<Arc<Markers>>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Arc<Markers>> {
    match shared.lock() {
        Ok(markers) => markers,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Keeps polling the players and markers feeds in the background.
pub struct MarkerStore {
    markers: Shared,

    #[allow(dead_code)] // Significant Drop
    runtime: Runtime,
}

impl MarkerStore {
    pub fn spawn(config: &MapConfig, options: &HttpOptions) -> Result<Self, MarkerError> {
        let client = options.client()?;
        let markers = Shared::default();

        let players = Feed {
            client: client.clone(),
            url: config.players_url(),
            timeout: PLAYERS_TIMEOUT,
            period: Duration::from_secs(config.players_poll_secs.max(1)),
        }
        .poll(Arc::clone(&markers), parse_players, |markers, players| {
            markers.players = players;
        });

        let towns = Feed {
            client,
            url: config.markers_url(),
            timeout: options.request_timeout,
            period: Duration::from_secs(config.markers_poll_secs.max(1)),
        }
        .poll(Arc::clone(&markers), parse_towns, |markers, towns| {
            markers.towns = towns;
        });

        let runtime = Runtime::new("marker polling", async move {
            futures::future::join(players, towns).await;
        });

        Ok(Self { markers, runtime })
    }

    /// Latest known players and towns. Cheap, can be called every frame.
    pub fn snapshot(&self) -> Arc<Markers> {
        Arc::clone(&lock(&self.markers))
    }
}

struct Feed {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    period: Duration,
}

impl Feed {
    async fn get(&self) -> Result<String, MarkerError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(MarkerError::Protocol(status));
        }

        Ok(response.text().await?)
    }

    /// Fetch the feed every `period`, storing what `parse` makes of it with `store`. A failed
    /// fetch or parse keeps what was there before.
    async fn poll<T>(
        self,
        markers: Shared,
        parse: fn(&str) -> Result<Vec<T>, MarkerError>,
        store: fn(&mut Markers, Vec<T>),
    ) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match self.get().await.and_then(|json| parse(&json)) {
                Ok(parsed) => {
                    log::debug!("Loaded {} markers from {}.", parsed.len(), self.url);
                    // Snapshots handed out earlier stay as they were.
                    store(Arc::make_mut(&mut lock(&markers)), parsed);
                }
                Err(e) => {
                    log::debug!("Failed to refresh {}: {e}.", self.url);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::wait_until_async;
    use hypermocker::{Bytes, StatusCode as MockStatusCode};

    const PLAYERS: &str = r#"{ "players": [ { "name": "alice", "x": 1, "y": 2, "z": 3 } ] }"#;
    const TOWNS: &str = r#"[ { "markers": [ { "point": { "x": 0, "z": 0 }, "tooltip": "<b>Town</b>" } ] } ]"#;

    fn config(server: &hypermocker::Server) -> MapConfig {
        MapConfig {
            map_server_url: format!("http://localhost:{}", server.port()),
            players_poll_secs: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn both_feeds_end_up_in_the_snapshot() {
        let _ = env_logger::try_init();

        let server = hypermocker::Server::bind().await;
        let players = server.anticipate("/tiles/players.json").await;
        let towns = server
            .anticipate("/tiles/minecraft_overworld/markers.json")
            .await;

        let store = MarkerStore::spawn(&config(&server), &HttpOptions::default()).unwrap();
        assert_eq!(Markers::default(), *store.snapshot());

        players.respond(Bytes::from_static(PLAYERS.as_bytes())).await;
        towns.respond(Bytes::from_static(TOWNS.as_bytes())).await;

        wait_until_async("markers", || {
            let snapshot = store.snapshot();
            snapshot.players.len() == 1 && snapshot.towns.len() == 1
        })
        .await;

        let snapshot = store.snapshot();
        assert_eq!("alice", snapshot.players[0].name);
        assert_eq!("Town", snapshot.towns[0].name);

        drop(store);
    }

    #[tokio::test]
    async fn failure_keeps_the_previous_snapshot() {
        let _ = env_logger::try_init();

        let server = hypermocker::Server::bind().await;
        let players = server.anticipate("/tiles/players.json").await;
        server
            .anticipate("/tiles/minecraft_overworld/markers.json")
            .await
            .respond_with_status(MockStatusCode::INTERNAL_SERVER_ERROR)
            .await;

        let store = MarkerStore::spawn(&config(&server), &HttpOptions::default()).unwrap();
        players.respond(Bytes::from_static(PLAYERS.as_bytes())).await;
        wait_until_async("players", || store.snapshot().players.len() == 1).await;

        // Second poll brings garbage.
        let mut garbage = server.anticipate("/tiles/players.json").await;
        garbage.expect().await;
        garbage.respond(Bytes::from_static(b"{ broken")).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = store.snapshot();
        assert_eq!(1, snapshot.players.len());
        assert!(snapshot.towns.is_empty());

        drop(store);
    }
}
