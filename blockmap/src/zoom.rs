//! Zoom levels, both native (served by the tile server) and synthetic (scaled on the client).

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid zoom level")]
pub struct InvalidZoom;

/// Static description of the zoom levels: what the server has, and how far the client may go
/// beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomLevels {
    /// Native tile size in pixels.
    pub tile_size: u32,

    /// Lowest zoom level with real server tiles.
    pub server_min: i32,

    /// Highest zoom level with real server tiles. At this zoom one tile pixel covers one block.
    pub server_max: i32,

    /// Number of synthetic levels above `server_max`.
    pub extra_in: i32,

    /// Number of synthetic levels below `server_min`.
    pub extra_out: i32,
}

impl Default for ZoomLevels {
    fn default() -> Self {
        Self {
            tile_size: 512,
            server_min: 0,
            server_max: 3,
            extra_in: 2,
            extra_out: 2,
        }
    }
}

/// `2^exponent`, saturating instead of overflowing.
fn pow2(exponent: i32) -> u64 {
    1u64.checked_shl(exponent.max(0) as u32).unwrap_or(u64::MAX)
}

impl ZoomLevels {
    /// Lowest zoom level the user can reach.
    pub fn min(&self) -> i32 {
        self.server_min.saturating_sub(self.extra_out)
    }

    /// Highest zoom level the user can reach.
    pub fn max(&self) -> i32 {
        self.server_max.saturating_add(self.extra_in)
    }

    /// Zoom level of the server tiles used to draw `zoom`. Synthetic levels reuse the nearest
    /// native one. Inverted bounds resolve to `server_max`.
    pub fn fetch_zoom(&self, zoom: i32) -> i32 {
        zoom.max(self.server_min).min(self.server_max)
    }

    pub fn is_synthetic(&self, zoom: i32) -> bool {
        zoom != self.fetch_zoom(zoom)
    }

    /// Number of world blocks covered by a single tile edge at `zoom`. Always at least 1.
    pub fn blocks_per_tile(&self, zoom: i32) -> u32 {
        let clamped = self.fetch_zoom(zoom);
        let mut blocks =
            u64::from(self.tile_size).saturating_mul(pow2(self.server_max.saturating_sub(clamped)));

        if zoom > self.server_max {
            blocks /= pow2(zoom.saturating_sub(self.server_max));
        }

        if zoom < self.server_min {
            blocks = blocks.saturating_mul(pow2(self.server_min.saturating_sub(zoom)));
        }

        u32::try_from(blocks.max(1)).unwrap_or(u32::MAX)
    }

    /// Size in screen pixels at which a native tile is drawn at `zoom`.
    pub fn display_tile_size(&self, zoom: i32) -> u32 {
        let size = u64::from(self.tile_size);
        let size = if zoom > self.server_max {
            size.saturating_mul(pow2(zoom.saturating_sub(self.server_max)))
        } else if zoom < self.server_min {
            size / pow2(self.server_min.saturating_sub(zoom))
        } else {
            size
        };

        u32::try_from(size.max(1)).unwrap_or(u32::MAX)
    }

    /// Everything needed to place tiles and markers on the screen at `zoom`.
    pub fn geometry(&self, zoom: i32) -> ZoomGeometry {
        let fetch_zoom = self.fetch_zoom(zoom);
        let fetch_blocks_per_tile = self.blocks_per_tile(fetch_zoom);
        let display_tile_size = self.display_tile_size(zoom);

        // Derived from the fetched image so that markers stay on the tiles even once
        // `blocks_per_tile` is floored.
        ZoomGeometry {
            zoom,
            fetch_zoom,
            blocks_per_tile: self.blocks_per_tile(zoom),
            fetch_blocks_per_tile,
            display_tile_size,
            tile_size: self.tile_size,
            pixels_per_block: f64::from(display_tile_size) / f64::from(fetch_blocks_per_tile),
        }
    }
}

/// Per-zoom constants derived from [`ZoomLevels`]. Never stored, just recomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomGeometry {
    /// Requested zoom, possibly synthetic.
    pub zoom: i32,

    /// Zoom of the server tiles drawn for `zoom`.
    pub fetch_zoom: i32,

    /// World blocks per tile at `zoom`.
    pub blocks_per_tile: u32,

    /// World blocks per tile at `fetch_zoom`, i.e. covered by one fetched image.
    pub fetch_blocks_per_tile: u32,

    /// On-screen size of one fetched image.
    pub display_tile_size: u32,

    /// Native tile size.
    pub tile_size: u32,

    pub pixels_per_block: f64,
}

impl ZoomGeometry {
    /// Client-side scale applied to fetched images, 1 within the server range.
    pub fn display_scale(&self) -> f64 {
        f64::from(self.display_tile_size) / f64::from(self.tile_size)
    }
}

/// Current zoom level, kept within the range given by [`ZoomLevels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zoom {
    level: i32,
    min: i32,
    max: i32,
}

impl Zoom {
    pub fn new(level: i32, levels: &ZoomLevels) -> Result<Self, InvalidZoom> {
        let (min, max) = (levels.min(), levels.max());
        if !(min..=max).contains(&level) {
            Err(InvalidZoom)
        } else {
            Ok(Self { level, min, max })
        }
    }

    /// Like [`Zoom::new`], but clamps instead of failing. Inverted bounds resolve to the
    /// upper one.
    pub fn clamped(level: i32, levels: &ZoomLevels) -> Self {
        let (min, max) = (levels.min(), levels.max());
        Self {
            level: level.max(min).min(max),
            min,
            max,
        }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn range(&self) -> (i32, i32) {
        (self.min, self.max)
    }

    pub fn zoom_in(&mut self) -> Result<(), InvalidZoom> {
        self.set(self.level.checked_add(1).ok_or(InvalidZoom)?)
    }

    pub fn zoom_out(&mut self) -> Result<(), InvalidZoom> {
        self.set(self.level.checked_sub(1).ok_or(InvalidZoom)?)
    }

    pub fn set(&mut self, level: i32) -> Result<(), InvalidZoom> {
        if (self.min..=self.max).contains(&level) {
            self.level = level;
            Ok(())
        } else {
            Err(InvalidZoom)
        }
    }
}
