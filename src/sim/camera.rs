//! Scrolling camera with damped follow and shake
//!
//! `position` is the world pixel shown at the viewport's top-left corner. It
//! eases toward the target, is clamped to the map, and only then gets the
//! shake offset added for rendering.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::entity::EntityId;
use super::rect::Rect;
use super::world::{World, WorldEvent};
use crate::consts::SHAKE_CUTOFF;
use crate::map::TileGrid;
use crate::settings::SimulationConfig;

/// Parameters of a shake effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShakeRequest {
    /// Maximum offset in pixels (0 = no shake)
    pub range: f32,
    /// Ticks between random shake targets
    pub speed: u32,
    /// Amplitude multiplier applied every tick
    pub fade: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Shake {
    amplitude: f32,
    speed: u32,
    fade: f32,
    timer: u32,
    from: Vec2,
    to: Vec2,
}

impl Shake {
    const NONE: Shake = Shake {
        amplitude: 0.0,
        speed: 1,
        fade: 0.0,
        timer: 0,
        from: Vec2::ZERO,
        to: Vec2::ZERO,
    };
}

fn random_unit_square(rng: &mut Pcg32) -> Vec2 {
    Vec2::new(rng.random_range(-1.0..=1.0), rng.random_range(-1.0..=1.0))
}

/// A view into the world, placed on screen by `viewport`
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec2,
    viewport: Rect,
    center_offset: Vec2,
    limits: Vec2,
    damping: f32,
    shake: Shake,
    rng: Pcg32,
}

impl Camera {
    pub fn new(viewport: Rect, grid: &TileGrid, config: &SimulationConfig) -> Self {
        let mut camera = Self {
            position: Vec2::ZERO,
            viewport,
            center_offset: Vec2::ZERO,
            limits: Vec2::ZERO,
            damping: config.camera_damping,
            shake: Shake::NONE,
            rng: Pcg32::seed_from_u64(config.seed.wrapping_add(viewport.x as u64) ^ 0xCA3E_5EED),
        };
        camera.set_viewport(viewport, grid);
        camera
    }

    /// Move or resize the viewport (split-screen layouts)
    pub fn set_viewport(&mut self, viewport: Rect, grid: &TileGrid) {
        self.viewport = viewport;
        self.center_offset = Vec2::new((viewport.w / 2) as f32, (viewport.h / 2) as f32);
        self.limits = Vec2::new(
            (grid.pixel_width() - viewport.w).max(0) as f32,
            (grid.pixel_height() - viewport.h).max(0) as f32,
        );
        self.clamp();
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Largest scroll position on each axis
    pub fn limits(&self) -> Vec2 {
        self.limits
    }

    pub fn center_offset(&self) -> Vec2 {
        self.center_offset
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping;
    }

    fn clamp(&mut self) {
        self.position = self.position.clamp(Vec2::ZERO, self.limits);
    }

    /// Ease toward `target` with the configured damping
    pub fn update(&mut self, target: Vec2) {
        self.update_with_damping(target, self.damping);
    }

    /// Ease toward `target`, covering `damping` of the remaining distance
    pub fn update_with_damping(&mut self, target: Vec2, damping: f32) {
        self.position += (target - self.center_offset - self.position) * damping;
        self.clamp();
        self.tick_shake();
    }

    /// Follow an entity's center; false if it no longer exists
    pub fn follow(&mut self, world: &World, id: EntityId) -> bool {
        match world.get(id) {
            Some(entity) => {
                self.update(entity.body().center());
                true
            }
            None => {
                self.tick_shake();
                false
            }
        }
    }

    /// Center on `target` immediately
    pub fn snap_to(&mut self, target: Vec2) {
        self.position = target - self.center_offset;
        self.clamp();
    }

    /// Start a shake. A zero range stops any running shake.
    pub fn shake(&mut self, range: f32, speed: u32, fade: f32) {
        if range <= 0.0 {
            self.shake = Shake::NONE;
            return;
        }
        self.shake = Shake {
            amplitude: range,
            speed: speed.max(1),
            fade,
            timer: 0,
            from: Vec2::ZERO,
            to: random_unit_square(&mut self.rng),
        };
    }

    /// Start the shakes requested during a world step
    pub fn apply_events(&mut self, events: &[WorldEvent]) {
        for event in events {
            if let WorldEvent::Shake(request) = event {
                self.shake(request.range, request.speed, request.fade);
            }
        }
    }

    pub fn is_shaking(&self) -> bool {
        self.shake.amplitude > 0.0
    }

    fn tick_shake(&mut self) {
        let shake = &mut self.shake;
        if shake.amplitude <= 0.0 {
            return;
        }
        shake.timer += 1;
        if shake.timer >= shake.speed {
            shake.timer = 0;
            shake.from = shake.to;
            shake.to = random_unit_square(&mut self.rng);
        }
        shake.amplitude *= shake.fade;
        if shake.amplitude < SHAKE_CUTOFF {
            self.shake = Shake::NONE;
        }
    }

    /// Current shake displacement in pixels
    pub fn shake_offset(&self) -> Vec2 {
        let shake = &self.shake;
        if shake.amplitude <= 0.0 {
            return Vec2::ZERO;
        }
        let t = shake.timer as f32 / shake.speed as f32;
        shake.from.lerp(shake.to, t) * shake.amplitude
    }

    /// Scroll position used for drawing (clamped position plus shake)
    #[inline]
    pub fn render_position(&self) -> Vec2 {
        self.position + self.shake_offset()
    }

    /// World pixel to screen pixel
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        world - self.render_position() + self.viewport.origin()
    }

    /// Stereo pan for a sound at `point`: -1 far left, 1 far right
    pub fn pan_for(&self, point: Vec2) -> f32 {
        if self.center_offset.x <= 0.0 {
            return 0.0;
        }
        let center = self.position.x + self.center_offset.x;
        ((point.x - center) / self.center_offset.x).clamp(-1.0, 1.0)
    }
}
