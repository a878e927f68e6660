//! Tilestep headless demo
//!
//! Builds a small level, round-trips it through the map format, seeds it
//! with entities and runs a scripted session with a following camera.
//!
//! Usage: `tilestep-demo [config.json] [level.map]`

use glam::Vec2;
use rand::Rng;

use tilestep::audio::{AudioSink, dispatch_sounds};
use tilestep::consts::GROUND_LAYER;
use tilestep::map::{AnimationKind, AnimationRule, TileGrid};
use tilestep::renderer::{DrawCommand, RenderSink, TextureHandle, TileAtlas};
use tilestep::sim::{Body, Camera, Entity, EntityFactory, EntityId, Rect, StepContext, TickInput, World, WorldEvent};
use tilestep::SimulationConfig;

const TICKS: u64 = 600;

// Tile codes
const WALL: u16 = 1;
const LEDGE: u16 = 2;
const SPAWN_PLAYER: u16 = 40;
const SPAWN_COIN: u16 = 41;
const WATER: u16 = 50;

// Sound ids
const SND_JUMP: u16 = 1;
const SND_THROW: u16 = 2;
const SND_COIN: u16 = 3;
const SND_BOUNCE: u16 = 4;

const PLAYER_SHEET: TextureHandle = TextureHandle(1);
const BALL_SHEET: TextureHandle = TextureHandle(2);
const COIN_SHEET: TextureHandle = TextureHandle(3);

struct Player {
    body: Body,
    facing: f32,
    cooldown: u32,
    frame: u16,
}

impl Player {
    fn new(x: i32, y: i32) -> Self {
        let body = Body::new(Vec2::new(x as f32, y as f32), 16, 24)
            .with_insets(2, 4)
            .solid(0.25, 0.0)
            .standing_on_platforms(true);
        Self {
            body,
            facing: 1.0,
            cooldown: 0,
            frame: 0,
        }
    }
}

impl Entity for Player {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn kind(&self) -> &'static str {
        "player"
    }

    fn is_tracked(&self) -> bool {
        true
    }

    fn update(&mut self, ctx: &mut StepContext<'_>) {
        let input = ctx.input;
        if input.left {
            self.body.go_left();
            self.facing = -1.0;
        }
        if input.right {
            self.body.go_right();
            self.facing = 1.0;
        }
        if input.jump && self.body.grounded {
            self.body.jump();
            ctx.play_sound(SND_JUMP, self.body.center());
        }

        self.cooldown = self.cooldown.saturating_sub(1);
        if input.action && self.cooldown == 0 {
            self.cooldown = 30;
            let spin = ctx.rng.random_range(-10.0..10.0);
            let mut ball = Ball::new(self.body.center() + Vec2::new(8.0 * self.facing, -8.0));
            ball.body.apply_impulse_degrees(self.facing * 60.0 + spin, 6.0);
            ctx.spawn(Box::new(ball));
            ctx.play_sound(SND_THROW, self.body.center());
        }

        self.body.physics_step(&ctx.probe, true);
        if self.body.velocity.x != 0.0 {
            self.frame = ((ctx.tick / 6) % 4) as u16;
        }
    }

    fn render(&self, camera: &Camera, sink: &mut dyn RenderSink) {
        sink.draw(self.body.sprite_command(PLAYER_SHEET, self.frame, 0, self.facing < 0.0, camera));
    }
}

struct Ball {
    body: Body,
    ttl: u32,
}

impl Ball {
    fn new(at: Vec2) -> Self {
        Self {
            body: Body::new(at, 6, 6).solid(0.02, 0.7),
            ttl: 240,
        }
    }
}

impl Entity for Ball {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn kind(&self) -> &'static str {
        "ball"
    }

    fn update(&mut self, ctx: &mut StepContext<'_>) {
        let before = self.body.velocity;
        self.body.physics_step(&ctx.probe, true);
        if self.body.grounded && before.y > 3.0 {
            ctx.play_sound(SND_BOUNCE, self.body.center());
        }
        self.ttl = self.ttl.saturating_sub(1);
        if self.ttl == 0 {
            self.body.destroy();
        }
    }

    fn render(&self, camera: &Camera, sink: &mut dyn RenderSink) {
        sink.draw(self.body.sprite_command(BALL_SHEET, 0, 0, false, camera));
    }
}

struct Coin {
    body: Body,
}

impl Entity for Coin {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn kind(&self) -> &'static str {
        "coin"
    }

    fn update(&mut self, _ctx: &mut StepContext<'_>) {}

    fn on_trigger(&mut self, _tracked: &dyn Entity, ctx: &mut StepContext<'_>) {
        self.body.destroy();
        ctx.play_sound(SND_COIN, self.body.center());
        ctx.shake(3.0, 3, 0.9);
    }

    fn render(&self, camera: &Camera, sink: &mut dyn RenderSink) {
        sink.draw(self.body.sprite_command(COIN_SHEET, 0, 0, false, camera));
    }
}

struct DemoFactory;

impl EntityFactory for DemoFactory {
    fn create_entity(&mut self, code: u16, pixel_x: i32, pixel_y: i32) -> Option<Box<dyn Entity>> {
        match code {
            SPAWN_PLAYER => Some(Box::new(Player::new(pixel_x, pixel_y - 8))),
            SPAWN_COIN => Some(Box::new(Coin {
                body: Body::new(Vec2::new(pixel_x as f32 + 4.0, pixel_y as f32 + 4.0), 8, 8).with_trigger_radius(14),
            })),
            _ => None,
        }
    }
}

/// Level assembled in code: walls, a floor with a gap, a ledge row,
/// a coin trail and an animated water strip
fn build_level() -> TileGrid {
    let (w, h) = (48u16, 16u16);
    let mut grid = TileGrid::new(w, h, 4, 16);
    grid.set_parallax(1, Vec2::new(0.5, 0.5));
    for (index, name) in [(1, "Hills"), (2, "Level"), (3, "Canopy")] {
        if let Some(layer) = grid.layer_mut(index) {
            layer.name = name.to_string();
        }
    }
    grid.set_main_layer(grid.detect_main_layer());
    grid.set_phantom_layer(3);

    let g = GROUND_LAYER;
    grid.fill_row(g, 15, 0..20, WALL);
    grid.fill_row(g, 15, 23..48, WALL);
    for y in 0..16 {
        grid.set(g, 0, y, WALL);
        grid.set(g, 47, y, WALL);
    }
    grid.fill_row(g, 11, 8..16, LEDGE);
    grid.set(g, 3, 13, SPAWN_PLAYER);
    for x in (10..40).step_by(4) {
        grid.set(g, x, 13, SPAWN_COIN);
    }

    for x in 0..48 {
        grid.set(1, x, 12, 7);
        grid.set(2, x, 15, 3);
    }
    grid.fill_row(2, 15, 20..23, WATER);
    grid.fill_row(3, 10, 26..34, 20);
    grid.animations = vec![AnimationRule::new(WATER, 4, 8, AnimationKind::PingPong)];
    grid.textures.atlas = "tiles.png".to_string();
    grid.textures.background = "sky.png".to_string();
    grid
}

/// Counts sounds instead of playing them
#[derive(Default)]
struct SoundLog {
    played: usize,
    leftmost: f32,
    rightmost: f32,
}

impl AudioSink for SoundLog {
    fn play(&mut self, sound: u16, pan: f32) {
        log::debug!("sound {sound} pan {pan:.2}");
        self.played += 1;
        self.leftmost = self.leftmost.min(pan);
        self.rightmost = self.rightmost.max(pan);
    }
}

/// Scripted input: run right, jump now and then, throw every so often
fn scripted_input(tick: u64) -> TickInput {
    TickInput {
        left: (400..460).contains(&tick),
        right: tick < 400 || tick >= 460,
        jump: tick % 45 == 20,
        down: false,
        action: tick % 90 == 50,
    }
}

fn load_level(path: Option<&String>) -> Result<TileGrid, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(TileGrid::load_file(path)?);
    }
    let built = build_level();
    let bytes = built.to_bytes()?;
    let grid = TileGrid::load(&bytes)?;
    log::info!("Level round-tripped through {} bytes", bytes.len());
    Ok(grid)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = match args.first() {
        Some(path) => SimulationConfig::load_or_default(path)?,
        None => SimulationConfig::default(),
    };
    if config.ground_codes.is_empty() {
        config.ground_codes.insert(WALL);
        config.platform_codes.insert(LEDGE);
    }

    let grid = load_level(args.get(1))?;
    let mut world = World::from_map(grid, config, &mut DemoFactory);
    let Some(player) = world
        .entities()
        .find(|(_, e)| e.kind() == "player")
        .map(|(id, _)| id)
    else {
        return Err("level has no player spawn".into());
    };

    // Split-screen: both halves follow the player, the right one snaps
    let half = Rect::new(0, 0, 160, 144);
    let mut left = Camera::new(half, world.grid(), world.config());
    let mut right = Camera::new(Rect::new(160, 0, 160, 144), world.grid(), world.config());
    let atlas = TileAtlas {
        texture: TextureHandle(0),
        columns: 16,
    };

    let mut sounds = SoundLog::default();
    let mut frame: Vec<DrawCommand> = Vec::new();
    let mut coins = 0;
    let mut balls = 0;
    let mut peak_draws = 0;

    for tick in 0..TICKS {
        let events = world.step(&scripted_input(tick));
        for event in &events {
            match event {
                WorldEvent::Spawned { kind: "ball", .. } => balls += 1,
                WorldEvent::Removed { kind: "coin", .. } => coins += 1,
                WorldEvent::Removed { id, kind, reason } if *id == player => {
                    log::warn!("{kind} {id} removed: {reason:?}");
                }
                _ => {}
            }
        }

        left.apply_events(&events);
        left.follow(&world, player);
        if let Some(p) = world.get(player) {
            right.snap_to(p.body().center());
        }
        dispatch_sounds(&events, &left, &mut sounds);

        frame.clear();
        world.render(&left, &atlas, &mut frame);
        world.render(&right, &atlas, &mut frame);
        peak_draws = peak_draws.max(frame.len());

        if tick % 120 == 0 {
            report(&world, player, &left, tick);
        }
    }

    log::info!(
        "Done: {coins} coins collected, {balls} balls thrown, {} sounds (pan {:.2}..{:.2}), peak {peak_draws} draws/frame",
        sounds.played,
        sounds.leftmost,
        sounds.rightmost
    );
    log::info!("Phantom layer alpha at exit: {:.2}", world.phantom_alpha());
    Ok(())
}

fn report(world: &World, player: EntityId, camera: &Camera, tick: u64) {
    match world.get(player) {
        Some(p) => {
            let b = p.body();
            log::info!(
                "tick {tick}: player at ({:.0}, {:.0}) v=({:.2}, {:.2}) grounded={} camera=({:.0}, {:.0}) entities={}",
                b.position.x,
                b.position.y,
                b.velocity.x,
                b.velocity.y,
                b.grounded,
                camera.position().x,
                camera.position().y,
                world.len()
            );
        }
        None => log::info!("tick {tick}: player gone"),
    }
}

fn main() {
    env_logger::init();
    log::info!("Tilestep demo starting...");
    if let Err(e) = run() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}
