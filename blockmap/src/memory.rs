use crate::{InvalidZoom, MapConfig, WorldPos, Zoom, ZoomLevels};

/// Position of the map's center. Initially, the map follows the local player. If user drags or
/// pans the map, it becomes "detached" and stays this way until [`MapMemory::follow_player`]
/// is called.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Center {
    /// Centered at the local player.
    #[default]
    FollowPlayer,

    /// Centered at the exact position.
    Exact(WorldPos),
}

impl Center {
    /// Get the real position at the map's center.
    pub fn position(&self, player: WorldPos) -> WorldPos {
        self.detached().unwrap_or(player)
    }

    /// Returns exact position if map is detached, `None` otherwise.
    pub fn detached(&self) -> Option<WorldPos> {
        match self {
            Center::FollowPlayer => None,
            Center::Exact(position) => Some(*position),
        }
    }
}

/// State of the map which must persist between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMemory {
    center_mode: Center,
    zoom: Zoom,
}

impl MapMemory {
    pub fn new(zoom: Zoom) -> Self {
        Self {
            center_mode: Center::default(),
            zoom,
        }
    }

    /// Follow the player at the configured default zoom.
    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(Zoom::clamped(config.default_zoom, &config.zoom_levels()))
    }

    /// Try to zoom in, returning `Err(InvalidZoom)` if already at maximum.
    pub fn zoom_in(&mut self) -> Result<(), InvalidZoom> {
        self.zoom.zoom_in()
    }

    /// Try to zoom out, returning `Err(InvalidZoom)` if already at minimum.
    pub fn zoom_out(&mut self) -> Result<(), InvalidZoom> {
        self.zoom.zoom_out()
    }

    pub fn set_zoom(&mut self, zoom: i32) -> Result<(), InvalidZoom> {
        self.zoom.set(zoom)
    }

    pub fn zoom(&self) -> i32 {
        self.zoom.level()
    }

    pub fn zoom_range(&self) -> (i32, i32) {
        self.zoom.range()
    }

    pub fn center_mode(&self) -> Center {
        self.center_mode
    }

    /// Returns exact position if map is detached (i.e. not following the player), `None`
    /// otherwise.
    pub fn detached(&self) -> Option<WorldPos> {
        self.center_mode.detached()
    }

    pub fn center(&self, player: WorldPos) -> WorldPos {
        self.center_mode.position(player)
    }

    /// Center exactly at the given position.
    pub fn center_at(&mut self, position: WorldPos) {
        self.center_mode = Center::Exact(position);
    }

    pub fn follow_player(&mut self) {
        self.center_mode = Center::FollowPlayer;
    }

    /// Move the center by given number of blocks, detaching it from the player.
    pub fn pan(&mut self, player: WorldPos, dx: f64, dz: f64) {
        let center = self.center(player);
        self.center_at(WorldPos::new(center.x + dx, center.z + dz));
    }
}

impl Default for MapMemory {
    fn default() -> Self {
        let levels = ZoomLevels::default();
        Self::new(Zoom::clamped(MapConfig::default().default_zoom, &levels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_the_player_until_panned() {
        let mut memory = MapMemory::default();
        let player = WorldPos::new(10.0, -20.0);

        assert_eq!(None, memory.detached());
        assert_eq!(player, memory.center(player));

        memory.pan(player, 5.0, 5.0);
        assert_eq!(Some(WorldPos::new(15.0, -15.0)), memory.detached());

        // Player moves, the map does not.
        assert_eq!(
            WorldPos::new(15.0, -15.0),
            memory.center(WorldPos::new(100.0, 100.0))
        );

        memory.follow_player();
        assert_eq!(Center::FollowPlayer, memory.center_mode());
    }

    #[test]
    fn zoom_is_bounded_by_the_total_range() {
        let mut memory = MapMemory::default();
        assert_eq!(1, memory.zoom());
        assert_eq!((-2, 5), memory.zoom_range());

        for _ in 0..4 {
            memory.zoom_in().unwrap();
        }
        assert_eq!(5, memory.zoom());
        assert_eq!(Err(InvalidZoom), memory.zoom_in());

        assert_eq!(Err(InvalidZoom), memory.set_zoom(-3));
        memory.set_zoom(-2).unwrap();
        assert_eq!(Err(InvalidZoom), memory.zoom_out());
        assert_eq!(-2, memory.zoom());
    }

    #[test]
    fn default_zoom_comes_from_config() {
        let config = MapConfig {
            default_zoom: 3,
            ..Default::default()
        };
        assert_eq!(3, MapMemory::from_config(&config).zoom());
    }
}
