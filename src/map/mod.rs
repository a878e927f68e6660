//! Tile maps
//!
//! - `grid`: layered tile storage and pixel queries
//! - `codec`: the binary map format
//! - `animation`: tile animation rules and playback

pub mod animation;
pub mod codec;
pub mod error;
pub mod grid;

pub use animation::{AnimationKind, AnimationRule, TileAnimator};
pub use codec::{decode, encode};
pub use error::{FormatError, LoadError};
pub use grid::{Layer, MapTextures, TileGrid};
