use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ZoomLevels;

/// Upper bound of `extra_zoom_in` and `extra_zoom_out`.
const MAX_EXTRA_ZOOM: i32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read the config: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse the config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Static configuration of the map. Every field has a default, so a config file only needs to
/// list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Base URL of the map server, without a trailing slash.
    pub map_server_url: String,

    /// Path of a single tile, appended to `map_server_url`. `{z}`, `{x}` and `{y}` are
    /// substituted with the tile's zoom, column and row.
    pub tile_url_pattern: String,

    /// Native tile size in pixels.
    pub tile_size: u32,

    pub server_min_zoom: i32,
    pub server_max_zoom: i32,

    /// Zoom levels above `server_max_zoom`, done by scaling tiles up on the client.
    pub extra_zoom_in: i32,

    /// Zoom levels below `server_min_zoom`, done by scaling tiles down on the client.
    pub extra_zoom_out: i32,

    pub default_zoom: i32,

    /// Maximum number of decoded tiles kept in memory.
    pub cache_capacity: usize,

    pub minimap_size: u32,
    pub minimap_margin: u32,
    pub minimap_opacity: f32,

    /// Path of the players feed, appended to `map_server_url`.
    pub players_path: String,

    /// Path of the markers (towns) feed, appended to `map_server_url`.
    pub markers_path: String,

    pub players_poll_secs: u64,
    pub markers_poll_secs: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            map_server_url: "https://map.lostcompass.world".to_owned(),
            tile_url_pattern: "/tiles/minecraft_overworld/{z}/{x}_{y}.png".to_owned(),
            tile_size: 512,
            server_min_zoom: 0,
            server_max_zoom: 3,
            extra_zoom_in: 2,
            extra_zoom_out: 2,
            default_zoom: 1,
            cache_capacity: 50,
            minimap_size: 100,
            minimap_margin: 10,
            minimap_opacity: 0.9,
            players_path: "/tiles/players.json".to_owned(),
            markers_path: "/tiles/minecraft_overworld/markers.json".to_owned(),
            players_poll_secs: 5,
            markers_poll_secs: 60,
        }
    }
}

impl MapConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| Err(ConfigError::Invalid(reason.to_owned()));

        if self.map_server_url.is_empty() {
            return invalid("map_server_url is empty");
        }

        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.tile_url_pattern.contains(placeholder) {
                return Err(ConfigError::Invalid(format!(
                    "tile_url_pattern lacks {placeholder}"
                )));
            }
        }

        if self.tile_size == 0 {
            return invalid("tile_size must be positive");
        }

        if self.server_min_zoom > self.server_max_zoom {
            return invalid("server_min_zoom is greater than server_max_zoom");
        }

        if self.extra_zoom_in < 0 || self.extra_zoom_out < 0 {
            return invalid("extra zoom levels can not be negative");
        }

        if self.extra_zoom_in > MAX_EXTRA_ZOOM || self.extra_zoom_out > MAX_EXTRA_ZOOM {
            return Err(ConfigError::Invalid(format!(
                "at most {MAX_EXTRA_ZOOM} extra zoom levels are supported"
            )));
        }

        let levels = self.zoom_levels();
        if !(levels.min()..=levels.max()).contains(&self.default_zoom) {
            return Err(ConfigError::Invalid(format!(
                "default_zoom {} is outside {}..={}",
                self.default_zoom,
                levels.min(),
                levels.max()
            )));
        }

        if !(0.0..=1.0).contains(&self.minimap_opacity) {
            return invalid("minimap_opacity must be within 0..=1");
        }

        if self.players_poll_secs == 0 || self.markers_poll_secs == 0 {
            return invalid("poll periods must be positive");
        }

        Ok(())
    }

    pub fn zoom_levels(&self) -> ZoomLevels {
        ZoomLevels {
            tile_size: self.tile_size,
            server_min: self.server_min_zoom,
            server_max: self.server_max_zoom,
            extra_in: self.extra_zoom_in,
            extra_out: self.extra_zoom_out,
        }
    }

    /// Cache capacity, at least one tile.
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn players_url(&self) -> String {
        format!("{}{}", self.map_server_url, self.players_path)
    }

    pub fn markers_url(&self) -> String {
        format!("{}{}", self.map_server_url, self.markers_path)
    }
}
