//! Minimap and full-screen map, drawn on an opaque [`Surface`] provided by the host.

mod minimap;
mod screen;

pub use minimap::Minimap;
pub use screen::MapScreen;

use crate::{Projector, ScreenRect, TextureId, TileEngine, Uv, WorldPos};

/// Color in the `0xAARRGGBB` format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Argb(pub u32);

impl Argb {
    pub const BLACK: Argb = Argb(0xFF000000);
    pub const WHITE: Argb = Argb(0xFFFFFFFF);
    pub const RED: Argb = Argb(0xFFFF0000);
    pub const GREEN: Argb = Argb(0xFF00FF00);
    pub const GOLD: Argb = Argb(0xFFFFD700);
    pub const SKY_BLUE: Argb = Argb(0xFF00BFFF);

    pub fn a(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn r(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(&self) -> u8 {
        self.0 as u8
    }
}

/// Whatever the host draws with.
pub trait Surface {
    fn fill(&mut self, rect: ScreenRect, color: Argb);

    /// Draw the `uv` part of a texture stretched over `rect`.
    fn draw_image(&mut self, texture: TextureId, uv: Uv, rect: ScreenRect, opacity: f32);

    /// Draw text with its top-left corner at given position. Hosts without text rendering may
    /// leave it out.
    fn text(&mut self, x: i32, y: i32, text: &str, color: Argb) {
        let _ = (x, y, text, color);
    }

    fn text_width(&self, text: &str) -> i32 {
        6 * text.chars().count() as i32
    }

    /// Player marker facing `yaw` degrees, spanning `2 * size` pixels. A plain square unless the
    /// host can do better.
    fn arrow(&mut self, x: i32, y: i32, yaw: f32, size: i32, color: Argb) {
        let _ = yaw;
        self.fill(ScreenRect::new(x - size, y - size, 2 * size, 2 * size), color);
    }
}

/// The player the host is running for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalPlayer {
    pub name: String,
    pub uuid: String,
    pub position: WorldPos,
    pub yaw: f32,
}

/// Input events, already decoded by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapInput {
    /// Primary button went down at given screen position.
    Press { x: f64, y: f64 },

    /// Pointer moved to given screen position, with the primary button held.
    Drag { x: f64, y: f64 },

    Release,

    /// Positive zooms in, negative zooms out.
    Scroll(f64),

    Key(MapKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKey {
    Recenter,
    ZoomIn,
    ZoomOut,
    Up,
    Down,
    Left,
    Right,
}

impl MapKey {
    /// Default key bindings: `R`, `+`, `-`, and `WASD`.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'r' => Some(MapKey::Recenter),
            '+' | '=' => Some(MapKey::ZoomIn),
            '-' => Some(MapKey::ZoomOut),
            'w' => Some(MapKey::Up),
            's' => Some(MapKey::Down),
            'a' => Some(MapKey::Left),
            'd' => Some(MapKey::Right),
            _ => None,
        }
    }
}

/// Fill `rect`, clipped to `clip`.
fn fill_clipped(surface: &mut dyn Surface, rect: ScreenRect, clip: &ScreenRect, color: Argb) {
    if let Some(rect) = rect.intersection(clip) {
        surface.fill(rect, color);
    }
}

/// Draw the cached tiles covering the projector's viewport, clipped to it. Missing tiles are
/// handed to `missing`.
fn draw_tiles(
    surface: &mut dyn Surface,
    projector: &Projector,
    engine: &TileEngine,
    opacity: f32,
    mut missing: impl FnMut(&mut dyn Surface, ScreenRect),
) {
    let viewport = projector.viewport();
    for key in projector.visible_tiles() {
        let rect = projector.tile_rect(key);
        match engine.query(key) {
            Some(tile) => {
                if let Some((visible, uv)) = rect.clip(&viewport) {
                    surface.draw_image(tile.texture(), uv, visible, opacity);
                }
            }
            None => missing(surface, rect),
        }
    }
}
