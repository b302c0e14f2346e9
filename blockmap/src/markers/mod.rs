//! Players and towns, as published by the map server.

mod feed;
mod store;

pub use feed::{MarkerError, parse_players, parse_towns, resident_count, town_name};
pub use store::MarkerStore;

use crate::WorldPos;

/// How close to a town's center a player needs to be to be "in" that town.
pub const NEAR_TOWN_DISTANCE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMarker {
    pub name: String,

    /// Empty when the server does not publish it.
    pub uuid: String,

    pub x: f64,
    pub y: f64,
    pub z: f64,

    /// Facing, in degrees.
    pub yaw: f32,
}

impl PlayerMarker {
    pub fn position(&self) -> WorldPos {
        WorldPos::new(self.x, self.z)
    }

    /// Whether this marker is the player with given name or UUID. An empty UUID never matches.
    pub fn is_player(&self, name: &str, uuid: &str) -> bool {
        self.name == name || (!self.uuid.is_empty() && self.uuid == uuid)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TownMarker {
    pub name: String,

    /// Icon the server draws the town with, e.g. `town_icon` or `capital_icon`.
    pub icon: String,

    pub x: f64,
    pub z: f64,
    pub residents: usize,
}

impl TownMarker {
    pub fn position(&self) -> WorldPos {
        WorldPos::new(self.x, self.z)
    }

    pub fn is_capital(&self) -> bool {
        self.icon.contains("capital")
    }

    /// Name to display, starred for capitals.
    pub fn label(&self) -> String {
        if self.is_capital() {
            format!("★ {}", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Snapshot of everything on the map besides the tiles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Markers {
    pub players: Vec<PlayerMarker>,
    pub towns: Vec<TownMarker>,
}

impl Markers {
    /// Town closest to `position`, if any is closer than `within`.
    pub fn nearest_town(&self, position: WorldPos, within: f64) -> Option<&TownMarker> {
        self.towns
            .iter()
            .map(|town| (town.position().distance(position), town))
            .filter(|(distance, _)| *distance < within)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, town)| town)
    }
}
