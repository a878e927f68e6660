//! Rendering module
//!
//! Produces textured-quad draw commands; the embedding application owns the
//! actual graphics backend and receives them through a `RenderSink`.

pub mod command;
pub mod tiles;

pub use command::{DrawCommand, RenderSink, TextureHandle, TileAtlas, Tint, atlas_source_rect};
pub use tiles::{LayerPass, draw_tiles};
