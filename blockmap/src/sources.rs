//! Where the tile images come from.

use crate::{MapConfig, TileKey};

/// Remote tile server definition, source for the [`crate::HttpFetch`].
pub trait TileSource {
    fn tile_url(&self, key: TileKey) -> String;
}

/// Tile server addressed by a base URL and a path pattern with `{z}`, `{x}` and `{y}`
/// placeholders, e.g. `/tiles/minecraft_overworld/{z}/{x}_{y}.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlPattern {
    pub base_url: String,
    pub pattern: String,
}

impl UrlPattern {
    pub fn new(base_url: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            pattern: pattern.into(),
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(&config.map_server_url, &config.tile_url_pattern)
    }
}

impl TileSource for UrlPattern {
    fn tile_url(&self, key: TileKey) -> String {
        let path = self
            .pattern
            .replace("{z}", &key.zoom.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string());
        format!("{}{}", self.base_url, path)
    }
}
