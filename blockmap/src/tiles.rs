use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use image::RgbaImage;

/// Identifies one tile image at one zoom level.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TileKey {
    /// Zoom level. Only the server range has real images, see [`crate::ZoomLevels`].
    pub zoom: i32,

    /// Column, growing east.
    pub x: i32,

    /// Row, growing south.
    pub y: i32,
}

impl TileKey {
    pub fn new(zoom: i32, x: i32, y: i32) -> Self {
        Self { zoom, x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            zoom: self.zoom,
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Square of `(2 * radius + 1)^2` keys centered at this one, row by row.
    pub fn around(self, radius: u32) -> impl Iterator<Item = TileKey> {
        let radius = radius as i32;
        (-radius..=radius)
            .flat_map(move |dy| (-radius..=radius).map(move |dx| self.offset(dx, dy)))
    }
}

/// Logical handle of a texture owned by the host.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TextureId(pub u64);

#[derive(Debug, thiserror::Error)]
#[error("could not register texture for {key:?}: {reason}")]
pub struct RegistryError {
    pub key: TileKey,
    pub reason: String,
}

/// Host capability turning decoded tiles into textures it can draw.
///
/// [`TextureRegistry::register`] is only ever called from the context which calls
/// [`crate::TileEngine::preload`], so hosts which must create textures on their render thread
/// get that for free.
pub trait TextureRegistry: Send + Sync {
    fn register(&self, key: TileKey, image: &RgbaImage) -> Result<TextureId, RegistryError>;

    /// Request the texture to be destroyed. Must not block waiting for it.
    fn release(&self, texture: TextureId);

    /// Called from the IO thread when a new tile is ready to be published.
    fn request_repaint(&self) {}
}

/// Decoded tile together with its texture.
pub struct CachedTile {
    key: TileKey,
    image: RgbaImage,
    texture: TextureId,
    destroyed: AtomicBool,
}

impl CachedTile {
    pub fn new(key: TileKey, image: RgbaImage, texture: TextureId) -> Self {
        Self {
            key,
            image,
            texture,
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn size(&self) -> [u32; 2] {
        [self.image.width(), self.image.height()]
    }

    pub fn is_valid(&self) -> bool {
        !self.destroyed.load(Ordering::Acquire)
    }

    /// Mark the tile as destroyed. Returns `true` only for the first call, which is the one
    /// expected to release the texture.
    pub(crate) fn destroy(&self) -> bool {
        !self.destroyed.swap(true, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for CachedTile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTile")
            .field("key", &self.key)
            .field("texture", &self.texture)
            .field("size", &self.size())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// A registry for hosts without a GPU. Hands out sequential ids and remembers what got released.
#[derive(Default)]
pub struct HeadlessTextures {
    next_id: AtomicU64,
    released: Mutex<Vec<TextureId>>,
}

impl HeadlessTextures {
    pub fn released(&self) -> Vec<TextureId> {
        match self.released.lock() {
            Ok(released) => released.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl TextureRegistry for HeadlessTextures {
    fn register(&self, _key: TileKey, _image: &RgbaImage) -> Result<TextureId, RegistryError> {
        Ok(TextureId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn release(&self, texture: TextureId) {
        match self.released.lock() {
            Ok(mut released) => released.push(texture),
            Err(poisoned) => poisoned.into_inner().push(texture),
        }
    }
}
