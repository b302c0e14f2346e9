use super::{Argb, LocalPlayer, Surface, draw_tiles};
use crate::markers::{Markers, NEAR_TOWN_DISTANCE};
use crate::{InvalidZoom, MapConfig, Projector, ScreenRect, TileEngine, Zoom};

const BACKGROUND: Argb = Argb(0xFF333333);
const BORDER: Argb = Argb(0xFF555555);
const PRELOAD_RADIUS: u32 = 2;

/// Small map in the top-right corner, always centered at the local player.
pub struct Minimap {
    size: i32,
    margin: i32,
    opacity: f32,
    zoom: Zoom,
    enabled: bool,
}

impl Minimap {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            size: i32::try_from(config.minimap_size).unwrap_or(i32::MAX),
            margin: i32::try_from(config.minimap_margin).unwrap_or(i32::MAX),
            opacity: config.minimap_opacity,
            zoom: Zoom::clamped(config.default_zoom, &config.zoom_levels()),
            enabled: true,
        }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn zoom(&self) -> i32 {
        self.zoom.level()
    }

    pub fn zoom_in(&mut self) -> Result<(), InvalidZoom> {
        self.zoom.zoom_in()
    }

    pub fn zoom_out(&mut self) -> Result<(), InvalidZoom> {
        self.zoom.zoom_out()
    }

    /// Where the map goes on a screen `screen_width` pixels wide.
    pub fn rect(&self, screen_width: i32) -> ScreenRect {
        ScreenRect::new(
            screen_width - self.size - self.margin,
            self.margin,
            self.size,
            self.size,
        )
    }

    /// Draw the minimap, unless disabled. Also preloads the tiles around the player.
    pub fn render(
        &self,
        surface: &mut dyn Surface,
        screen_width: i32,
        engine: &TileEngine,
        markers: &Markers,
        player: &LocalPlayer,
    ) {
        if !self.enabled {
            return;
        }

        let rect = self.rect(screen_width);
        let frame = ScreenRect::new(rect.x - 2, rect.y - 2, rect.w + 4, rect.h + 4);
        surface.fill(frame, Argb::BLACK);
        surface.fill(rect, BACKGROUND);

        engine.preload(player.position, self.zoom.level(), PRELOAD_RADIUS);

        let projector = Projector::new(rect, player.position, self.zoom.level(), engine.levels());
        draw_tiles(surface, &projector, engine, self.opacity, |_, _| {});

        for town in &markers.towns {
            let (x, y) = projector.project_px(town.position());
            if rect.contains(x, y) {
                let (color, size) = if town.is_capital() {
                    (Argb::GOLD, 3)
                } else {
                    (Argb::GREEN, 2)
                };
                surface.fill(ScreenRect::new(x - size, y - size, 2 * size, 2 * size), color);
            }
        }

        for other in markers
            .players
            .iter()
            .filter(|other| !other.is_player(&player.name, &player.uuid))
        {
            let (x, y) = projector.project_px(other.position());
            if rect.contains(x, y) {
                surface.arrow(x, y, other.yaw, 3, Argb::SKY_BLUE);
            }
        }

        let (x, y) = rect.center();
        surface.arrow(x, y, player.yaw, 4, Argb::RED);

        for edge in [
            ScreenRect::new(frame.x, frame.y, frame.w, 1),
            ScreenRect::new(frame.x, frame.bottom() - 1, frame.w, 1),
            ScreenRect::new(frame.x, frame.y + 1, 1, frame.h - 2),
            ScreenRect::new(frame.right() - 1, frame.y + 1, 1, frame.h - 2),
        ] {
            surface.fill(edge, BORDER);
        }

        let caption = format!(
            "X: {} Z: {}",
            player.position.x as i64, player.position.z as i64
        );
        surface.text(rect.x + 2, rect.bottom() + 4, &caption, Argb::WHITE);

        if let Some(town) = markers.nearest_town(player.position, NEAR_TOWN_DISTANCE) {
            let label = town.label();
            let width = surface.text_width(&label);
            surface.text(
                rect.x + (rect.w - width) / 2,
                rect.bottom() + 14,
                &label,
                Argb::GREEN,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::{PlayerMarker, TownMarker};
    use crate::view::testing::{Recording, engine, player, settle};
    use approx::assert_relative_eq;

    fn town(name: &str, icon: &str, x: f64, z: f64) -> TownMarker {
        TownMarker {
            name: name.to_owned(),
            icon: icon.to_owned(),
            x,
            z,
            residents: 2,
        }
    }

    fn other(name: &str, uuid: &str, x: f64, z: f64) -> PlayerMarker {
        PlayerMarker {
            name: name.to_owned(),
            uuid: uuid.to_owned(),
            x,
            y: 64.0,
            z,
            yaw: 0.0,
        }
    }

    #[test]
    fn sits_in_the_top_right_corner() {
        let minimap = Minimap::new(&MapConfig::default());
        assert_eq!(ScreenRect::new(690, 10, 100, 100), minimap.rect(800));
    }

    #[test]
    fn disabled_minimap_draws_nothing() {
        let engine = engine();
        let mut minimap = Minimap::new(&MapConfig::default());
        minimap.toggle();
        assert!(!minimap.is_enabled());

        let mut surface = Recording::default();
        minimap.render(
            &mut surface,
            800,
            &engine,
            &Markers::default(),
            &player(0.0, 0.0),
        );

        assert!(surface.calls.is_empty());
        assert_eq!(0, engine.stats().pending);
    }

    #[test]
    fn tiles_are_clipped_to_the_minimap() {
        let _ = env_logger::try_init();

        let engine = engine();
        let minimap = Minimap::new(&MapConfig {
            default_zoom: 3,
            ..Default::default()
        });
        let me = player(10.0, 10.0);

        // First frame only requests the tiles.
        let mut surface = Recording::default();
        minimap.render(&mut surface, 800, &engine, &Markers::default(), &me);
        assert!(surface.images().is_empty());
        assert_eq!(25, engine.stats().pending);

        settle(&engine);

        let mut surface = Recording::default();
        minimap.render(&mut surface, 800, &engine, &Markers::default(), &me);

        let rect = minimap.rect(800);
        let images = surface.images();
        assert!(!images.is_empty());

        let mut area = 0;
        for (image, uv, opacity) in images {
            assert!(image.x >= rect.x && image.right() <= rect.right());
            assert!(image.y >= rect.y && image.bottom() <= rect.bottom());
            assert!(uv.w <= 1.0 && uv.h <= 1.0);
            assert_relative_eq!(0.9f32, opacity);
            area += image.w * image.h;
        }
        assert_eq!(100 * 100, area);
    }

    #[test]
    fn markers_and_labels() {
        let engine = engine();
        let minimap = Minimap::new(&MapConfig {
            default_zoom: 3,
            ..Default::default()
        });
        let me = player(0.0, 0.0);
        let markers = Markers {
            players: vec![
                other("me", "", 5.0, 5.0),
                other("renamed", "me-uuid", 6.0, 6.0),
                other("friend", "", -20.0, 10.0),
                other("stranger", "", 5000.0, 0.0),
            ],
            towns: vec![
                town("Capital", "capital_icon", 30.0, 0.0),
                town("Village", "town_icon", -40.0, -40.0),
                town("Faraway", "town_icon", 3000.0, 0.0),
            ],
        };

        let mut surface = Recording::default();
        minimap.render(&mut surface, 800, &engine, &markers, &me);

        // One pixel per block at zoom 3, center at (740, 60).
        assert_eq!(
            vec![
                (720, 70, 3, Argb::SKY_BLUE),
                (740, 60, 4, Argb::RED),
            ],
            surface.arrows()
        );
        assert_eq!(
            vec![ScreenRect::new(767, 57, 6, 6)],
            surface.fills_of(Argb::GOLD)
        );
        assert_eq!(
            vec![ScreenRect::new(698, 18, 4, 4)],
            surface.fills_of(Argb::GREEN)
        );
        assert_eq!(
            vec!["X: 0 Z: 0".to_owned(), "★ Capital".to_owned()],
            surface.texts()
        );
    }

    #[test]
    fn zoom_is_bounded() {
        let mut minimap = Minimap::new(&MapConfig::default());
        assert_eq!(1, minimap.zoom());
        for _ in 0..3 {
            minimap.zoom_out().ok();
        }
        assert_eq!(-2, minimap.zoom());
        assert!(minimap.zoom_in().is_ok());
    }
}
