//! Placement of tiles and markers on the screen.

use crate::{TileKey, WorldPos, ZoomGeometry, ZoomLevels, world_to_tile};

/// Rectangle on the screen, in pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl ScreenRect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Whether the point lies within the rectangle, edges included.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.x..=self.right()).contains(&x) && (self.y..=self.bottom()).contains(&y)
    }

    pub fn intersection(&self, other: &ScreenRect) -> Option<ScreenRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let rect = ScreenRect::new(
            x,
            y,
            self.right().min(other.right()) - x,
            self.bottom().min(other.bottom()) - y,
        );
        (!rect.is_empty()).then_some(rect)
    }

    /// Part of this rectangle visible within `clip`, together with the matching part of an image
    /// stretched over the whole rectangle.
    pub fn clip(&self, clip: &ScreenRect) -> Option<(ScreenRect, Uv)> {
        let visible = self.intersection(clip)?;
        let (w, h) = (self.w as f32, self.h as f32);
        Some((
            visible,
            Uv {
                u: (visible.x - self.x) as f32 / w,
                v: (visible.y - self.y) as f32 / h,
                w: visible.w as f32 / w,
                h: visible.h as f32 / h,
            },
        ))
    }
}

/// Normalized region of an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uv {
    pub u: f32,
    pub v: f32,
    pub w: f32,
    pub h: f32,
}

impl Uv {
    pub const FULL: Uv = Uv {
        u: 0.0,
        v: 0.0,
        w: 1.0,
        h: 1.0,
    };
}

/// Maps between the world and the screen for a map of given center and zoom, drawn within the
/// viewport.
///
/// Tiles and markers share the same pixels per block, so both stay put relative to each other at
/// every zoom, synthetic ones included.
#[derive(Debug, Clone)]
pub struct Projector {
    viewport: ScreenRect,
    center: WorldPos,
    geometry: ZoomGeometry,
    levels: ZoomLevels,
}

impl Projector {
    pub fn new(viewport: ScreenRect, center: WorldPos, zoom: i32, levels: &ZoomLevels) -> Self {
        Self {
            viewport,
            center,
            geometry: levels.geometry(zoom),
            levels: *levels,
        }
    }

    pub fn viewport(&self) -> ScreenRect {
        self.viewport
    }

    pub fn center(&self) -> WorldPos {
        self.center
    }

    pub fn geometry(&self) -> &ZoomGeometry {
        &self.geometry
    }

    fn screen_center(&self) -> (f64, f64) {
        (
            f64::from(self.viewport.x) + f64::from(self.viewport.w) / 2.0,
            f64::from(self.viewport.y) + f64::from(self.viewport.h) / 2.0,
        )
    }

    /// Screen position of a world position.
    pub fn project(&self, position: WorldPos) -> (f64, f64) {
        let (cx, cy) = self.screen_center();
        let ppb = self.geometry.pixels_per_block;
        (
            cx + (position.x - self.center.x) * ppb,
            cy + (position.z - self.center.z) * ppb,
        )
    }

    /// Like [`Projector::project`], truncated to whole pixels.
    pub fn project_px(&self, position: WorldPos) -> (i32, i32) {
        let (x, y) = self.project(position);
        (x as i32, y as i32)
    }

    /// World position at given screen position.
    pub fn unproject(&self, x: f64, y: f64) -> WorldPos {
        let (cx, cy) = self.screen_center();
        let ppb = self.geometry.pixels_per_block;
        WorldPos::new(
            self.center.x + (x - cx) / ppb,
            self.center.z + (y - cy) / ppb,
        )
    }

    /// Tile containing the center, at the zoom the tiles are fetched at.
    fn anchor(&self) -> (TileKey, i32, i32) {
        let key = world_to_tile(self.center, self.geometry.fetch_zoom, &self.levels);
        let blocks = f64::from(self.geometry.fetch_blocks_per_tile);
        let (cx, cy) = self.screen_center();
        let ppb = self.geometry.pixels_per_block;
        let x = cx - (self.center.x - f64::from(key.x) * blocks) * ppb;
        let y = cy - (self.center.z - f64::from(key.y) * blocks) * ppb;
        (key, x.floor() as i32, y.floor() as i32)
    }

    /// Screen rectangle of a fetched tile. Neighbouring tiles never overlap nor leave gaps.
    pub fn tile_rect(&self, key: TileKey) -> ScreenRect {
        let (anchor, x, y) = self.anchor();
        let size = self.display_tile_size();
        ScreenRect::new(
            x + (key.x - anchor.x) * size,
            y + (key.y - anchor.y) * size,
            size,
            size,
        )
    }

    fn display_tile_size(&self) -> i32 {
        i32::try_from(self.geometry.display_tile_size).unwrap_or(i32::MAX)
    }

    /// Tiles covering the viewport, row by row.
    pub fn visible_tiles(&self) -> Vec<TileKey> {
        let (anchor, x, y) = self.anchor();
        let size = self.display_tile_size();
        let first = |start: i32, origin: i32| (start - origin).div_euclid(size);
        let last = |end: i32, origin: i32| (end - 1 - origin).div_euclid(size);

        let columns = first(self.viewport.x, x)..=last(self.viewport.right(), x);
        let rows = first(self.viewport.y, y)..=last(self.viewport.bottom(), y);

        rows.flat_map(|dy| {
            columns
                .clone()
                .map(move |dx| anchor.offset(dx, dy))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn projector(zoom: i32) -> Projector {
        Projector::new(
            ScreenRect::new(0, 0, 800, 600),
            WorldPos::new(100.0, -50.0),
            zoom,
            &ZoomLevels::default(),
        )
    }

    #[test]
    fn center_is_in_the_middle_of_the_viewport() {
        let projector = projector(3);
        let (x, y) = projector.project(WorldPos::new(100.0, -50.0));
        assert_relative_eq!(400.0, x);
        assert_relative_eq!(300.0, y);
    }

    #[test]
    fn unproject_inverts_project() {
        for zoom in -2..=5 {
            let projector = projector(zoom);
            let position = WorldPos::new(-1234.5, 987.25);
            let (x, y) = projector.project(position);
            let back = projector.unproject(x, y);
            assert_relative_eq!(position.x, back.x, epsilon = 1e-6);
            assert_relative_eq!(position.z, back.z, epsilon = 1e-6);
        }
    }

    #[test]
    fn markers_scale_with_synthetic_zoom() {
        let east = WorldPos::new(110.0, -50.0);

        // One pixel per block at the highest native zoom, four at two synthetic levels above.
        assert_relative_eq!(410.0, projector(3).project(east).0);
        assert_relative_eq!(440.0, projector(5).project(east).0);
        assert_relative_eq!(400.0 + 10.0 / 32.0, projector(-2).project(east).0);
    }

    #[test]
    fn tile_rects_line_up_with_markers() {
        for zoom in -2..=5 {
            let projector = projector(zoom);
            let key = TileKey::new(projector.geometry().fetch_zoom, 2, -3);
            let rect = projector.tile_rect(key);
            let corner = crate::tile_to_world(key, &ZoomLevels::default());
            let (x, y) = projector.project(corner);

            assert!((f64::from(rect.x) - x).abs() <= 1.0, "zoom {zoom}");
            assert!((f64::from(rect.y) - y).abs() <= 1.0, "zoom {zoom}");
            assert_eq!(projector.geometry().display_tile_size as i32, rect.w);
        }
    }

    #[test]
    fn small_tiles_line_up_with_markers_at_deep_zoom() {
        let levels = ZoomLevels {
            tile_size: 16,
            extra_in: 5,
            ..Default::default()
        };

        for zoom in levels.min()..=levels.max() {
            let projector = Projector::new(
                ScreenRect::new(0, 0, 800, 600),
                WorldPos::new(100.0, -50.0),
                zoom,
                &levels,
            );
            let key = TileKey::new(projector.geometry().fetch_zoom, 7, -4);
            let rect = projector.tile_rect(key);
            let (x, y) = projector.project(crate::tile_to_world(key, &levels));

            assert!((f64::from(rect.x) - x).abs() <= 1.0, "zoom {zoom}");
            assert!((f64::from(rect.y) - y).abs() <= 1.0, "zoom {zoom}");
        }
    }

    #[test]
    fn neighbouring_tiles_touch() {
        let projector = projector(4);
        let a = projector.tile_rect(TileKey::new(3, 0, 0));
        let b = projector.tile_rect(TileKey::new(3, 1, 0));
        assert_eq!(a.right(), b.x);
        assert_eq!(1024, a.w);
    }

    #[test]
    fn visible_tiles_cover_the_viewport() {
        // 512 px tiles, center at (100, -50) lands 100 px right of the tile (0, -1) corner.
        let projector = projector(3);
        let tiles = projector.visible_tiles();

        let viewport = projector.viewport();
        for key in &tiles {
            assert!(projector.tile_rect(*key).intersection(&viewport).is_some());
        }

        let covered: i64 = tiles
            .iter()
            .filter_map(|key| projector.tile_rect(*key).intersection(&viewport))
            .map(|rect| i64::from(rect.w) * i64::from(rect.h))
            .sum();
        assert_eq!(800 * 600, covered);
        assert_eq!(TileKey::new(3, -1, -1), tiles[0]);
        assert_eq!(4, tiles.len());
    }

    #[test]
    fn clipping_crops_the_image_proportionally() {
        let tile = ScreenRect::new(-50, 10, 200, 200);
        let (visible, uv) = tile.clip(&ScreenRect::new(0, 0, 100, 100)).unwrap();

        assert_eq!(ScreenRect::new(0, 10, 100, 90), visible);
        assert_relative_eq!(0.25, uv.u);
        assert_relative_eq!(0.0, uv.v);
        assert_relative_eq!(0.5, uv.w);
        assert_relative_eq!(0.45, uv.h);

        assert!(tile.clip(&ScreenRect::new(500, 500, 10, 10)).is_none());
    }
}
