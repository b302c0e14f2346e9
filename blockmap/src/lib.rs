#![doc = include_str!("../README.md")]
#![deny(clippy::unwrap_used, rustdoc::broken_intra_doc_links)]

mod cache;
mod config;
#[cfg(feature = "egui")]
mod egui_surface;
mod engine;
mod grid;
mod io;
pub mod markers;
mod memory;
mod projector;
mod sources;
#[cfg(test)]
mod testing;
mod tiles;
pub mod view;
mod zoom;

pub use cache::TileCache;
pub use config::{ConfigError, MapConfig};
#[cfg(feature = "egui")]
pub use egui_surface::{EguiSurface, EguiTextures};
pub use engine::{EngineStats, TileEngine};
pub use grid::{WorldPos, tile_to_world, world_to_tile};
pub use io::{Fetch, FetchError, HeaderValue, HttpFetch, HttpOptions, MaxParallelDownloads};
pub use memory::{Center, MapMemory};
pub use projector::{Projector, ScreenRect, Uv};
pub use sources::{TileSource, UrlPattern};
pub use tiles::{
    CachedTile, HeadlessTextures, RegistryError, TextureId, TextureRegistry, TileKey,
};
pub use zoom::{InvalidZoom, Zoom, ZoomGeometry, ZoomLevels};
