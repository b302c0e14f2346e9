use super::{Argb, LocalPlayer, MapInput, MapKey, Surface, draw_tiles, fill_clipped};
use crate::markers::Markers;
use crate::{MapConfig, MapMemory, Projector, ScreenRect, TileEngine, WorldPos, ZoomLevels};

const BACKGROUND: Argb = Argb(0xFF1A1A1A);
const PLACEHOLDER: Argb = Argb(0xFF2A2A2A);
const PLACEHOLDER_FRAME: Argb = Argb(0xFF3A3A3A);
const INFO_BACKGROUND: Argb = Argb(0xAA000000);
const INFO_TEXT: Argb = Argb(0xFFCCCCCC);
const INFO_STATS: Argb = Argb(0xFF88FF88);
const INFO_HINT: Argb = Argb(0xFF888888);

const PADDING: i32 = 10;
const MAX_TOWN_NAME: usize = 12;

#[derive(Debug, Clone, Copy)]
struct Drag {
    x: f64,
    y: f64,
    center: WorldPos,
}

/// Full-screen map which can be dragged and zoomed around.
pub struct MapScreen {
    memory: MapMemory,
    levels: ZoomLevels,
    drag: Option<Drag>,
}

impl MapScreen {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            memory: MapMemory::from_config(config),
            levels: config.zoom_levels(),
            drag: None,
        }
    }

    pub fn memory(&self) -> &MapMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MapMemory {
        &mut self.memory
    }

    fn pixels_per_block(&self) -> f64 {
        self.levels.geometry(self.memory.zoom()).pixels_per_block
    }

    /// Apply an input event. Returns whether the map consumed it.
    pub fn handle_input(&mut self, input: MapInput, player: &LocalPlayer) -> bool {
        match input {
            MapInput::Press { x, y } => {
                self.drag = Some(Drag {
                    x,
                    y,
                    center: self.memory.center(player.position),
                });
                true
            }
            MapInput::Drag { x, y } => {
                let Some(drag) = self.drag else {
                    return false;
                };
                let ppb = self.pixels_per_block();
                self.memory.center_at(WorldPos::new(
                    drag.center.x - (x - drag.x) / ppb,
                    drag.center.z - (y - drag.y) / ppb,
                ));
                true
            }
            MapInput::Release => self.drag.take().is_some(),
            MapInput::Scroll(amount) => {
                // Hitting the zoom limit is fine, the event is still ours.
                if amount > 0.0 {
                    self.memory.zoom_in().ok();
                } else if amount < 0.0 {
                    self.memory.zoom_out().ok();
                }
                true
            }
            MapInput::Key(key) => {
                let step = f64::from(self.levels.blocks_per_tile(self.memory.zoom()) / 4);
                match key {
                    MapKey::Recenter => self.memory.follow_player(),
                    MapKey::ZoomIn => {
                        self.memory.zoom_in().ok();
                    }
                    MapKey::ZoomOut => {
                        self.memory.zoom_out().ok();
                    }
                    MapKey::Up => self.memory.pan(player.position, 0.0, -step),
                    MapKey::Down => self.memory.pan(player.position, 0.0, step),
                    MapKey::Left => self.memory.pan(player.position, -step, 0.0),
                    MapKey::Right => self.memory.pan(player.position, step, 0.0),
                }
                true
            }
        }
    }

    /// Draw the map over the whole `viewport`.
    pub fn render(
        &self,
        surface: &mut dyn Surface,
        viewport: ScreenRect,
        engine: &TileEngine,
        markers: &Markers,
        player: &LocalPlayer,
    ) {
        surface.fill(viewport, BACKGROUND);

        let zoom = self.memory.zoom();
        let center = self.memory.center(player.position);
        let radius = if zoom < self.levels.server_min { 5 } else { 3 };
        engine.preload(center, zoom, radius);

        let projector = Projector::new(viewport, center, zoom, &self.levels);
        draw_tiles(surface, &projector, engine, 1.0, |surface, rect| {
            placeholder(surface, rect, &viewport)
        });

        if zoom >= self.levels.server_min {
            for town in &markers.towns {
                let (x, y) = projector.project_px(town.position());
                if !viewport.contains(x, y) {
                    continue;
                }

                let (color, size) = if town.is_capital() {
                    (Argb::GOLD, 5)
                } else {
                    (Argb::GREEN, 4)
                };
                surface.fill(ScreenRect::new(x - size, y - size, 2 * size, 2 * size), color);

                let name = truncated(&town.name);
                let width = surface.text_width(&name);
                surface.text(x - width / 2, y + size + 2, &name, Argb::WHITE);
            }
        }

        for other in markers
            .players
            .iter()
            .filter(|other| !other.is_player(&player.name, &player.uuid))
        {
            let (x, y) = projector.project_px(other.position());
            if viewport.contains(x, y) {
                surface.arrow(x, y, other.yaw, 5, Argb::SKY_BLUE);
                let width = surface.text_width(&other.name);
                surface.text(x - width / 2, y + 10, &other.name, Argb::SKY_BLUE);
            }
        }

        let (x, y) = projector.project_px(player.position);
        surface.arrow(x, y, player.yaw, 6, Argb::RED);

        self.render_info(surface, viewport, center, markers, player);
    }

    fn render_info(
        &self,
        surface: &mut dyn Surface,
        viewport: ScreenRect,
        center: WorldPos,
        markers: &Markers,
        player: &LocalPlayer,
    ) {
        let x = viewport.x + PADDING;
        let y = viewport.y + PADDING;
        surface.fill(ScreenRect::new(x, y, 220, 75), INFO_BACKGROUND);

        let (min, max) = self.memory.zoom_range();
        let lines = [
            ("LostCompass Map".to_owned(), Argb::WHITE),
            (
                format!("View: X: {} Z: {}", center.x as i64, center.z as i64),
                INFO_TEXT,
            ),
            (
                format!("Zoom: {} ({min} to {max})", self.memory.zoom()),
                INFO_TEXT,
            ),
            (
                format!(
                    "Players: {} | Towns: {}",
                    markers.players.len(),
                    markers.towns.len()
                ),
                INFO_STATS,
            ),
            ("[Scroll] Zoom  [Drag] Pan  [R] Reset".to_owned(), INFO_HINT),
        ];
        for ((text, color), offset) in lines.iter().zip([5, 18, 30, 42, 58]) {
            surface.text(x + 5, y + offset, text, *color);
        }

        let you = format!(
            "You: X: {} Z: {}",
            player.position.x as i64, player.position.z as i64
        );
        let width = surface.text_width(&you);
        surface.text(viewport.right() - width - PADDING, y + 5, &you, Argb::WHITE);
    }
}

/// Dark square with a lighter frame, standing in for a tile which is not there yet.
fn placeholder(surface: &mut dyn Surface, rect: ScreenRect, clip: &ScreenRect) {
    fill_clipped(surface, rect, clip, PLACEHOLDER);
    for edge in [
        ScreenRect::new(rect.x, rect.y, rect.w, 1),
        ScreenRect::new(rect.x, rect.bottom() - 1, rect.w, 1),
        ScreenRect::new(rect.x, rect.y, 1, rect.h),
        ScreenRect::new(rect.right() - 1, rect.y, 1, rect.h),
    ] {
        fill_clipped(surface, edge, clip, PLACEHOLDER_FRAME);
    }
}

fn truncated(name: &str) -> String {
    if name.chars().count() > MAX_TOWN_NAME {
        let mut short: String = name.chars().take(MAX_TOWN_NAME).collect();
        short.push_str("..");
        short
    } else {
        name.to_owned()
    }
}
