//! Entities and their shared physics body
//!
//! A `Body` is a rectangle that moves through the ground layer pixel by
//! pixel. Per-kind behavior (players, projectiles, pickups) lives behind the
//! `Entity` trait; the world only ever talks to that trait.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::camera::Camera;
use super::rect::Rect;
use super::sweep::{TileProbe, cross_samples};
use super::world::StepContext;
use crate::consts::*;
use crate::map::TileGrid;
use crate::renderer::{DrawCommand, RenderSink, TextureHandle, Tint};
use crate::{impulse_from_clock_degrees, impulse_from_radians};

/// Stable entity id, assigned in spawn order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Velocity after bouncing off a blocked axis
fn rebound_speed(speed: f32, rebound: f32) -> f32 {
    let bounced = -speed * rebound;
    if bounced.abs() <= REBOUND_SNAP_SPEED {
        0.0
    } else {
        bounced
    }
}

/// Geometry, physics state and flags of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Top-left corner in world pixels
    pub position: Vec2,
    pub velocity: Vec2,
    pub width: i32,
    pub height: i32,
    /// Horizontal inset of the collision box on each side
    pub inset_side: i32,
    /// Vertical inset of the collision box from the top
    pub inset_top: i32,

    /// Gravity and friction factor (0 = unaffected by either)
    pub weight: f32,
    /// Fraction of speed kept when bouncing off tiles, in [0, 1]
    pub rebound: f32,
    pub max_speed: f32,
    pub max_fall_speed: f32,
    pub acceleration: f32,
    pub jump_speed: f32,

    /// Collides with ground tiles
    pub solid: bool,
    /// Lands on platform tiles instead of falling through them
    pub stands_on_platforms: bool,
    /// Receives `on_collision` for overlapping entities
    pub tracks_collisions: bool,
    /// Distance to a tracked entity that fires `on_trigger` (0 = off)
    pub trigger_radius: i32,

    pub destroyed: bool,
    /// Moved by input this tick; skips one round of deceleration
    pub controlled: bool,
    /// Moved down unobstructed during the last physics step
    pub falling: bool,
    /// Was stopped by something below during the last physics step
    pub grounded: bool,
}

impl Body {
    /// A non-solid, weightless body of the given size
    pub fn new(position: Vec2, width: i32, height: i32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            width,
            height,
            inset_side: 0,
            inset_top: 0,
            weight: 0.0,
            rebound: 0.0,
            max_speed: DEFAULT_MAX_SPEED,
            max_fall_speed: DEFAULT_MAX_FALL_SPEED,
            acceleration: DEFAULT_ACCELERATION,
            jump_speed: DEFAULT_JUMP_SPEED,
            solid: false,
            stands_on_platforms: false,
            tracks_collisions: false,
            trigger_radius: 0,
            destroyed: false,
            controlled: false,
            falling: false,
            grounded: false,
        }
    }

    pub fn with_insets(mut self, side: i32, top: i32) -> Self {
        self.inset_side = side;
        self.inset_top = top;
        self
    }

    /// Make the body collide with tiles and fall under gravity
    pub fn solid(mut self, weight: f32, rebound: f32) -> Self {
        self.solid = true;
        self.weight = weight;
        self.rebound = rebound.clamp(0.0, 1.0);
        self
    }

    pub fn standing_on_platforms(mut self, stands: bool) -> Self {
        self.stands_on_platforms = stands;
        self
    }

    pub fn with_collisions(mut self, tracks: bool) -> Self {
        self.tracks_collisions = tracks;
        self
    }

    pub fn with_trigger_radius(mut self, radius: i32) -> Self {
        self.trigger_radius = radius.max(0);
        self
    }

    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    #[inline]
    fn pixel(&self) -> (i32, i32) {
        (self.position.x as i32, self.position.y as i32)
    }

    /// Can the body take one pixel step horizontally in `dir`?
    fn x_edge_free(&self, dir: i32, probe: &TileProbe<'_>) -> bool {
        let (x, y) = self.pixel();
        let edge = if dir > 0 {
            x + self.width - self.inset_side
        } else {
            x + self.inset_side - 1
        };
        cross_samples(y + self.inset_top, y + self.height, probe.tile_size())
            .all(|sy| probe.check_point(edge, sy, 0, self.stands_on_platforms))
    }

    /// Can the body take one pixel step vertically in `dir`?
    fn y_edge_free(&self, dir: i32, probe: &TileProbe<'_>) -> bool {
        let (x, y) = self.pixel();
        let edge = if dir > 0 {
            y + self.height
        } else {
            y + self.inset_top - 1
        };
        cross_samples(x + self.inset_side, x + self.width - self.inset_side, probe.tile_size())
            .all(|sx| probe.check_point(sx, edge, dir, self.stands_on_platforms))
    }

    /// Move `delta` pixels horizontally. A solid body stops at the last
    /// free pixel and returns false when its leading edge is blocked.
    pub fn move_x(&mut self, delta: i32, probe: &TileProbe<'_>) -> bool {
        if !self.solid {
            self.position.x += delta as f32;
            return true;
        }
        let dir = delta.signum();
        for _ in 0..delta.unsigned_abs() {
            if !self.x_edge_free(dir, probe) {
                return false;
            }
            self.position.x += dir as f32;
        }
        true
    }

    /// Vertical counterpart of `move_x`
    pub fn move_y(&mut self, delta: i32, probe: &TileProbe<'_>) -> bool {
        if !self.solid {
            self.position.y += delta as f32;
            return true;
        }
        let dir = delta.signum();
        for _ in 0..delta.unsigned_abs() {
            if !self.y_edge_free(dir, probe) {
                return false;
            }
            self.position.y += dir as f32;
        }
        true
    }

    /// Integrate one tick of velocity against the ground layer.
    /// Returns whether the body is standing on something.
    pub fn physics_step(&mut self, probe: &TileProbe<'_>, gravity_enabled: bool) -> bool {
        self.falling = false;
        self.grounded = false;

        let gravity = gravity_enabled && self.weight > 0.0;
        if gravity {
            self.velocity.y += probe.config().gravity;
        }
        let target = self.position + self.velocity;
        self.velocity.y = self.velocity.y.min(self.max_fall_speed);
        let dx = (target.x.trunc() - self.position.x.trunc()) as i32;
        let dy = (target.y.trunc() - self.position.y.trunc()) as i32;

        if dx != 0 && !self.move_x(dx, probe) {
            self.velocity.x = rebound_speed(self.velocity.x, self.rebound);
        }

        if dy != 0 {
            if self.move_y(dy, probe) {
                self.falling = dy > 0 && self.velocity.y > 0.0 && gravity;
            } else {
                self.grounded = dy > 0;
                self.velocity.y = rebound_speed(self.velocity.y, self.rebound);
            }
        } else if self.velocity.y > 0.0 && self.solid && !self.y_edge_free(1, probe) {
            // Sub-pixel fall while resting on the ground
            self.grounded = true;
            self.velocity.y = rebound_speed(self.velocity.y, self.rebound);
        }

        if !self.controlled {
            if self.velocity.x < 0.0 {
                self.velocity.x = (self.velocity.x + self.weight).min(0.0);
            } else if self.velocity.x > 0.0 {
                self.velocity.x = (self.velocity.x - self.weight).max(0.0);
            }
        }
        self.controlled = false;

        self.grounded
    }

    pub fn go_left(&mut self) {
        self.velocity.x = (self.velocity.x - self.acceleration).max(-self.max_speed);
        self.controlled = true;
    }

    pub fn go_right(&mut self) {
        self.velocity.x = (self.velocity.x + self.acceleration).min(self.max_speed);
        self.controlled = true;
    }

    pub fn jump(&mut self) {
        self.velocity.y = -self.jump_speed;
    }

    /// Set velocity from an angle in radians, counter-clockwise from 3 o'clock
    pub fn apply_impulse_radians(&mut self, angle: f32, magnitude: f32) {
        self.velocity = impulse_from_radians(angle, magnitude);
    }

    /// Set velocity from an angle in degrees, clockwise from 12 o'clock
    pub fn apply_impulse_degrees(&mut self, degrees: f32, magnitude: f32) {
        self.velocity = impulse_from_clock_degrees(degrees, magnitude);
    }

    pub fn apply_impulse(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// Has the body left the map by more than `slack` pixels?
    pub fn is_out_of_bounds(&self, slack: i32, grid: &TileGrid) -> bool {
        let (x, y) = (self.position.x, self.position.y);
        let slack = slack as f32;
        x < -slack - self.width as f32
            || y < -slack - self.height as f32
            || x > (grid.right_pixel() as f32) + slack
            || y > (grid.bottom_pixel() as f32) + slack
    }

    /// `is_out_of_bounds` with the configured slack
    pub fn is_out_of_bounds_default(&self, probe: &TileProbe<'_>) -> bool {
        self.is_out_of_bounds(probe.config().out_of_bounds_slack, probe.grid())
    }

    /// Collision box used for entity overlap
    pub fn sensitive_rect(&self) -> Rect {
        let (x, y) = self.pixel();
        Rect::new(
            x + self.inset_side,
            y + self.inset_top,
            self.width - 2 * self.inset_side,
            self.height - self.inset_top,
        )
    }

    /// Middle of the collision box
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.position.x + (self.width / 2) as f32,
            self.position.y + ((self.height + self.inset_top) / 2) as f32,
        )
    }

    #[inline]
    pub fn overlaps(&self, other: &Body) -> bool {
        self.sensitive_rect().intersects(&other.sensitive_rect())
    }

    #[inline]
    pub fn distance_to(&self, other: &Body) -> f32 {
        self.center().distance(other.center())
    }

    /// Draw command for frame `frame` of animation row `row` in a sprite sheet
    /// laid out in cells of the body's size
    pub fn sprite_command(&self, texture: TextureHandle, frame: u16, row: u16, flip_x: bool, camera: &Camera) -> DrawCommand {
        let screen = camera.to_screen(self.position).floor();
        DrawCommand {
            texture,
            dest: Rect::new(screen.x as i32, screen.y as i32, self.width, self.height),
            source: Rect::new(
                frame as i32 * self.width,
                row as i32 * self.height,
                self.width,
                self.height,
            ),
            tint: Tint::WHITE,
            flip_x,
        }
    }
}

/// Per-kind behavior of a world object
pub trait Entity {
    fn body(&self) -> &Body;

    fn body_mut(&mut self) -> &mut Body;

    /// Short name used in logs and events
    fn kind(&self) -> &'static str;

    /// Advance one tick; usually reacts to input then calls `physics_step`
    fn update(&mut self, ctx: &mut StepContext<'_>);

    /// Another live entity overlaps this one (only if `tracks_collisions`)
    fn on_collision(&mut self, _other: &mut dyn Entity, _ctx: &mut StepContext<'_>) {}

    /// A tracked entity came within `trigger_radius`
    fn on_trigger(&mut self, _tracked: &dyn Entity, _ctx: &mut StepContext<'_>) {}

    /// Emit draw commands for this entity
    fn render(&self, _camera: &Camera, _sink: &mut dyn RenderSink) {}

    /// Should the world add this entity to its tracked set on spawn?
    fn is_tracked(&self) -> bool {
        false
    }
}
