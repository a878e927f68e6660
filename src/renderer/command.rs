//! Draw commands handed to the embedding renderer

use crate::sim::Rect;

/// Opaque texture id assigned by the embedding renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle(pub u32);

/// RGBA multiplier applied to a sprite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint(pub [f32; 4]);

impl Tint {
    pub const WHITE: Tint = Tint([1.0, 1.0, 1.0, 1.0]);

    pub fn with_alpha(self, alpha: f32) -> Self {
        let [r, g, b, _] = self.0;
        Tint([r, g, b, alpha.clamp(0.0, 1.0)])
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.0[3]
    }
}

impl Default for Tint {
    fn default() -> Self {
        Self::WHITE
    }
}

/// One textured quad in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub texture: TextureHandle,
    /// Screen rectangle
    pub dest: Rect,
    /// Texel rectangle inside the texture
    pub source: Rect,
    pub tint: Tint,
    /// Mirror horizontally (sprite facing left)
    pub flip_x: bool,
}

/// Receives draw commands in painter's order
pub trait RenderSink {
    fn draw(&mut self, command: DrawCommand);
}

impl RenderSink for Vec<DrawCommand> {
    fn draw(&mut self, command: DrawCommand) {
        self.push(command);
    }
}

/// Tile sheet with `columns` tiles per row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileAtlas {
    pub texture: TextureHandle,
    pub columns: u16,
}

/// Source rectangle of a tile code inside an atlas
pub fn atlas_source_rect(code: u16, tile_size: u16, columns: u16) -> Rect {
    let columns = columns.max(1);
    let ts = tile_size as i32;
    Rect::new(
        (code % columns) as i32 * ts,
        (code / columns) as i32 * ts,
        ts,
        ts,
    )
}
