//! Host adapters for [`egui`]: a [`TextureRegistry`] backed by egui's texture manager and a
//! [`Surface`] drawing with a [`egui::Painter`].

use std::collections::HashMap;
use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicU64, Ordering},
};

use egui::{
    Align2, Color32, ColorImage, Context, FontId, Mesh, Rect, Shape, Stroke, TextureHandle,
    TextureOptions, pos2, vec2,
};
use image::RgbaImage;

use crate::view::{Argb, Surface};
use crate::{RegistryError, ScreenRect, TextureId, TextureRegistry, TileKey, Uv};

const FONT_SIZE: f32 = 11.0;

impl From<Argb> for Color32 {
    fn from(color: Argb) -> Self {
        Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), color.a())
    }
}

fn rect(rect: ScreenRect) -> Rect {
    Rect::from_min_size(
        pos2(rect.x as f32, rect.y as f32),
        vec2(rect.w as f32, rect.h as f32),
    )
}

/// Tile textures living in egui's texture manager.
pub struct EguiTextures {
    ctx: Context,
    next_id: AtomicU64,
    handles: Mutex<HashMap<TextureId, TextureHandle>>,
}

impl EguiTextures {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            next_id: AtomicU64::new(0),
            handles: Mutex::default(),
        }
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<TextureId, TextureHandle>> {
        match self.handles.lock() {
            Ok(handles) => handles,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn handle(&self, texture: TextureId) -> Option<TextureHandle> {
        self.handles().get(&texture).cloned()
    }

    /// Number of textures alive.
    pub fn len(&self) -> usize {
        self.handles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles().is_empty()
    }
}

impl TextureRegistry for EguiTextures {
    fn register(&self, key: TileKey, image: &RgbaImage) -> Result<TextureId, RegistryError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RegistryError {
                key,
                reason: "image is empty".to_owned(),
            });
        }

        let color_image = ColorImage::from_rgba_unmultiplied(
            [image.width() as usize, image.height() as usize],
            image.as_raw(),
        );

        // Blocks should stay sharp when scaled up.
        let handle = self.ctx.load_texture(
            format!("tile {}/{}/{}", key.zoom, key.x, key.y),
            color_image,
            TextureOptions::NEAREST,
        );

        let id = TextureId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handles().insert(id, handle);
        Ok(id)
    }

    fn release(&self, texture: TextureId) {
        // Dropping the last handle frees the texture.
        if self.handles().remove(&texture).is_none() {
            log::debug!("{texture:?} released twice.");
        }
    }

    fn request_repaint(&self) {
        self.ctx.request_repaint();
    }
}

/// [`Surface`] painting with egui.
pub struct EguiSurface<'a> {
    painter: &'a egui::Painter,
    textures: &'a EguiTextures,
}

impl<'a> EguiSurface<'a> {
    pub fn new(painter: &'a egui::Painter, textures: &'a EguiTextures) -> Self {
        Self { painter, textures }
    }
}

impl Surface for EguiSurface<'_> {
    fn fill(&mut self, screen_rect: ScreenRect, color: Argb) {
        self.painter.rect_filled(rect(screen_rect), 0.0, color);
    }

    fn draw_image(&mut self, texture: TextureId, uv: Uv, screen_rect: ScreenRect, opacity: f32) {
        let Some(handle) = self.textures.handle(texture) else {
            log::debug!("{texture:?} is gone, not drawing it.");
            return;
        };

        let uv = Rect::from_min_size(pos2(uv.u, uv.v), vec2(uv.w, uv.h));
        let mut mesh = Mesh::with_texture(handle.id());
        mesh.add_rect_with_uv(
            rect(screen_rect),
            uv,
            Color32::WHITE.gamma_multiply(opacity),
        );
        self.painter.add(Shape::mesh(mesh));
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: Argb) {
        self.painter.text(
            pos2(x as f32, y as f32),
            Align2::LEFT_TOP,
            text,
            FontId::proportional(FONT_SIZE),
            color.into(),
        );
    }

    fn text_width(&self, text: &str) -> i32 {
        let galley = self.painter.layout_no_wrap(
            text.to_owned(),
            FontId::proportional(FONT_SIZE),
            Color32::WHITE,
        );
        galley.size().x.round() as i32
    }

    /// Triangle pointing where the player looks. Yaw 0 faces south, which is down the screen.
    fn arrow(&mut self, x: i32, y: i32, yaw: f32, size: i32, color: Argb) {
        let (sin, cos) = yaw.to_radians().sin_cos();
        let forward = vec2(-sin, cos);
        let side = vec2(-forward.y, forward.x);
        let center = pos2(x as f32, y as f32);
        let size = size as f32;

        let points = vec![
            center + forward * size,
            center - forward * size + side * size * 0.8,
            center - forward * size - side * size * 0.8,
        ];
        self.painter
            .add(Shape::convex_polygon(points, color, Stroke::NONE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn run(textures: &EguiTextures, mut draw: impl FnMut(&mut EguiSurface<'_>)) -> Vec<Shape> {
        let output = textures.ctx.run(egui::RawInput::default(), |ctx| {
            let painter = ctx.layer_painter(egui::LayerId::background());
            draw(&mut EguiSurface::new(&painter, textures));
        });
        output
            .shapes
            .into_iter()
            .map(|clipped| clipped.shape)
            .collect()
    }

    #[test]
    fn textures_live_until_released() {
        let textures = EguiTextures::new(Context::default());
        let image = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));

        let a = textures.register(TileKey::new(0, 0, 0), &image).unwrap();
        let b = textures.register(TileKey::new(0, 1, 0), &image).unwrap();
        assert_ne!(a, b);
        assert_eq!(2, textures.len());

        textures.release(a);
        textures.release(a);
        assert_eq!(1, textures.len());
        assert!(textures.handle(a).is_none());
        assert!(textures.handle(b).is_some());
    }

    #[test]
    fn empty_image_is_rejected() {
        let textures = EguiTextures::new(Context::default());
        let result = textures.register(TileKey::new(0, 0, 0), &RgbaImage::new(0, 0));
        assert!(result.is_err());
        assert!(textures.is_empty());
    }

    #[test]
    fn tiles_are_drawn_as_textured_meshes() {
        let textures = EguiTextures::new(Context::default());
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let texture = textures.register(TileKey::new(3, 0, 0), &image).unwrap();
        let handle = textures.handle(texture).unwrap().id();

        let shapes = run(&textures, |surface| {
            surface.draw_image(texture, Uv::FULL, ScreenRect::new(0, 0, 64, 64), 0.5);
            surface.draw_image(TextureId(999), Uv::FULL, ScreenRect::new(0, 0, 64, 64), 1.0);
        });

        let meshes: Vec<_> = shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::Mesh(mesh) => Some(mesh),
                _ => None,
            })
            .collect();
        assert_eq!(1, meshes.len());
        assert_eq!(handle, meshes[0].texture_id);
    }

    #[test]
    fn text_has_a_width() {
        let textures = EguiTextures::new(Context::default());
        let mut widths = (0, 0);
        run(&textures, |surface| {
            widths = (surface.text_width("X"), surface.text_width("X: 100 Z: 100"));
        });
        assert!(widths.0 > 0);
        assert!(widths.1 > widths.0);
    }

    #[test]
    fn argb_to_color() {
        assert_eq!(
            Color32::from_rgba_unmultiplied(0x11, 0x22, 0x33, 0xFF),
            Color32::from(Argb(0xFF112233))
        );
    }
}
