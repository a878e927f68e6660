//! Tile layer drawing with parallax and culling

use std::ops::Range;

use rand_pcg::Pcg32;

use super::command::{DrawCommand, RenderSink, TileAtlas, Tint, atlas_source_rect};
use crate::consts::EMPTY_TILE;
use crate::map::{TileAnimator, TileGrid};
use crate::sim::{Camera, Rect};

/// Which drawable layers a pass covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPass {
    /// Every layer above the ground layer
    All,
    /// Layers 1 through the main layer, drawn before entities
    Background,
    /// Layers above the main layer, drawn after entities
    Foreground,
}

impl LayerPass {
    pub fn layers(&self, grid: &TileGrid) -> Range<usize> {
        let count = grid.layer_count();
        let split = (grid.main_layer() + 1).clamp(1, count);
        match self {
            LayerPass::All => 1..count,
            LayerPass::Background => 1..split,
            LayerPass::Foreground => split..count,
        }
    }
}

/// First cell index and count of cells visible along one axis
fn visible_span(scroll: f32, parallax: f32, tile_size: f32, view: i32) -> (i32, i32) {
    let first = (scroll / tile_size * parallax).floor() as i32;
    (first, view / tile_size as i32 + 2)
}

/// Emit the visible tiles of the layers in `pass`.
///
/// Each layer scrolls at `parallax * camera`; animated codes are resolved
/// through `animator`, with per-tile random frames drawn from `rng`.
/// Tiles of the phantom layer get `phantom_alpha`.
#[allow(clippy::too_many_arguments)]
pub fn draw_tiles(
    grid: &TileGrid,
    animator: &TileAnimator,
    rng: &mut Pcg32,
    camera: &Camera,
    atlas: &TileAtlas,
    pass: LayerPass,
    phantom_alpha: f32,
    sink: &mut dyn RenderSink,
) {
    let ts = grid.tile_size as f32;
    let scroll = camera.render_position();
    let view = camera.viewport();
    let phantom = grid.phantom_layer();

    for layer in pass.layers(grid) {
        let k = grid.parallax(layer);
        let tint = if phantom == Some(layer) {
            Tint::WHITE.with_alpha(phantom_alpha)
        } else {
            Tint::WHITE
        };
        if tint.alpha() <= 0.0 {
            continue;
        }

        let (i0, ni) = visible_span(scroll.x, k.x, ts, view.w);
        let (j0, nj) = visible_span(scroll.y, k.y, ts, view.h);
        let xs = i0.max(0)..(i0 + ni).min(grid.width() as i32);
        let ys = j0.max(0)..(j0 + nj).min(grid.height() as i32);

        for i in xs {
            for j in ys.clone() {
                let code = grid.get(layer, i as usize, j as usize);
                if code == EMPTY_TILE {
                    continue;
                }
                let shown = animator.resolve(code, rng);
                let sx = (i as f32 * ts - k.x * scroll.x).floor() as i32 + view.x;
                let sy = (j as f32 * ts - k.y * scroll.y).floor() as i32 + view.y;
                sink.draw(DrawCommand {
                    texture: atlas.texture,
                    dest: Rect::new(sx, sy, grid.tile_size as i32, grid.tile_size as i32),
                    source: atlas_source_rect(shown, grid.tile_size, atlas.columns),
                    tint,
                    flip_x: false,
                });
            }
        }
    }
}
