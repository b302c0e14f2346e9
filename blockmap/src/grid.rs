//! Mapping between world positions (in blocks) and the tile grid.
//!
//! World `x` grows east and world `z` grows south, exactly like tile `x` and `y` do, so the
//! mapping is a plain scale by [`ZoomLevels::blocks_per_tile`].

use crate::{TileKey, ZoomLevels};

/// Horizontal position in the world, in blocks. The vertical axis does not matter for the map.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct WorldPos {
    pub x: f64,
    pub z: f64,
}

impl WorldPos {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn distance(&self, other: WorldPos) -> f64 {
        (self.x - other.x).hypot(self.z - other.z)
    }
}

/// Tile containing `position` at `zoom`. Floor, not truncation, so that negative coordinates
/// land in the tile which actually contains them.
pub fn world_to_tile(position: WorldPos, zoom: i32, levels: &ZoomLevels) -> TileKey {
    let blocks_per_tile = f64::from(levels.blocks_per_tile(zoom));
    TileKey {
        zoom,
        x: (position.x / blocks_per_tile).floor() as i32,
        y: (position.z / blocks_per_tile).floor() as i32,
    }
}

/// North-west corner of the tile. This is not the inverse of [`world_to_tile`]: every position
/// inside the tile maps back to the same corner.
pub fn tile_to_world(key: TileKey, levels: &ZoomLevels) -> WorldPos {
    let blocks_per_tile = f64::from(levels.blocks_per_tile(key.zoom));
    WorldPos {
        x: f64::from(key.x) * blocks_per_tile,
        z: f64::from(key.y) * blocks_per_tile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_positions() {
        let levels = ZoomLevels::default();
        assert_eq!(
            TileKey { zoom: 3, x: 0, y: 1 },
            world_to_tile(WorldPos::new(511.9, 512.0), 3, &levels)
        );
        assert_eq!(
            TileKey { zoom: 1, x: 1, y: 0 },
            world_to_tile(WorldPos::new(2048.0, 2047.0), 1, &levels)
        );
    }

    #[test]
    fn negative_positions_are_floored() {
        let levels = ZoomLevels::default();
        assert_eq!(
            TileKey { zoom: 3, x: -1, y: -1 },
            world_to_tile(WorldPos::new(-0.5, -512.0), 3, &levels)
        );
        assert_eq!(
            TileKey { zoom: 3, x: -2, y: 0 },
            world_to_tile(WorldPos::new(-513.0, 0.0), 3, &levels)
        );
    }

    #[test]
    fn synthetic_levels_use_smaller_tiles() {
        let levels = ZoomLevels::default();

        // 128 blocks per tile at zoom 5.
        assert_eq!(
            TileKey { zoom: 5, x: 3, y: -1 },
            world_to_tile(WorldPos::new(400.0, -1.0), 5, &levels)
        );
    }

    #[test]
    fn tile_to_world_gives_the_corner_not_the_original_position() {
        let levels = ZoomLevels::default();
        let position = WorldPos::new(-700.25, 1300.5);
        let key = world_to_tile(position, 2, &levels);
        let corner = tile_to_world(key, &levels);

        assert_eq!(WorldPos::new(-1024.0, 1024.0), corner);
        assert_ne!(position, corner);

        // But the corner itself round trips.
        assert_eq!(key, world_to_tile(corner, 2, &levels));
    }

    #[test]
    fn distance_between_positions() {
        approx::assert_relative_eq!(
            5.0,
            WorldPos::new(1.0, 1.0).distance(WorldPos::new(4.0, 5.0))
        );
    }
}
