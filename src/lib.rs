//! Tilestep - a tile-based 2D platformer runtime
//!
//! Core modules:
//! - `map`: Tile grid storage, the binary map format and tile animation
//! - `sim`: Deterministic simulation (sweep physics, entities, world stepping, camera)
//! - `renderer`: Draw-command generation for an external rendering sink
//! - `audio`: Positional sound cues for an external audio sink
//! - `settings`: Simulation configuration

pub mod audio;
pub mod map;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use map::{AnimationKind, AnimationRule, FormatError, LoadError, TileAnimator, TileGrid};
pub use settings::SimulationConfig;
pub use sim::{Body, Camera, Entity, EntityFactory, EntityId, Rect, StepContext, TickInput, World, WorldEvent};

use glam::Vec2;

/// Runtime configuration constants
pub mod consts {
    /// Gravitational acceleration (pixels/tick²)
    pub const DEFAULT_GRAVITY: f32 = 0.3;
    /// How far (pixels) an entity may leave the map before it is removed
    pub const DEFAULT_OUT_OF_BOUNDS_SLACK: i32 = 10;
    /// Fraction of the remaining distance the camera covers per tick
    pub const DEFAULT_CAMERA_DAMPING: f32 = 0.02;
    /// Phantom layer alpha change per tick
    pub const DEFAULT_PHANTOM_FADE_STEP: f32 = 0.05;

    /// Entity defaults (pixels/tick)
    pub const DEFAULT_MAX_SPEED: f32 = 5.0;
    pub const DEFAULT_MAX_FALL_SPEED: f32 = 32.0;
    pub const DEFAULT_ACCELERATION: f32 = 0.5;
    pub const DEFAULT_JUMP_SPEED: f32 = 5.0;

    /// Rebound speeds at or below this magnitude snap to zero
    pub const REBOUND_SNAP_SPEED: f32 = 1.0;

    /// Shake amplitude below which the effect switches off
    pub const SHAKE_CUTOFF: f32 = 0.1;

    /// The empty tile code
    pub const EMPTY_TILE: u16 = 0;
    /// Layer holding collision codes and entity spawn markers
    pub const GROUND_LAYER: usize = 0;
}

/// Velocity for an impulse measured in radians, counter-clockwise from 3 o'clock
#[inline]
pub fn impulse_from_radians(angle: f32, magnitude: f32) -> Vec2 {
    Vec2::new(angle.cos() * magnitude, -angle.sin() * magnitude)
}

/// Velocity for an impulse measured in degrees, clockwise from 12 o'clock
#[inline]
pub fn impulse_from_clock_degrees(degrees: f32, magnitude: f32) -> Vec2 {
    let angle = degrees.to_radians();
    Vec2::new(angle.sin() * magnitude, -angle.cos() * magnitude)
}
