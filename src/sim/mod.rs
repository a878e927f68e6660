//! Deterministic simulation module
//!
//! Everything that advances game state lives here:
//! - Fixed timestep only, one `World::step` per tick
//! - Seeded RNG only
//! - Stable iteration order (by entity id)
//! - Rendering happens through draw commands, never from inside a step

pub mod camera;
pub mod entity;
pub mod factory;
pub mod rect;
pub mod sweep;
pub mod world;

pub use camera::{Camera, ShakeRequest};
pub use entity::{Body, Entity, EntityId};
pub use factory::EntityFactory;
pub use rect::Rect;
pub use sweep::TileProbe;
pub use world::{RemovalReason, StepContext, TickInput, World, WorldEvent};
