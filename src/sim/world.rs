//! World stepping
//!
//! Owns the tile grid and every entity. One `step` per fixed tick:
//! 1. Update each live entity in id order, then test it for overlaps and
//!    proximity triggers against the others
//! 2. Merge entities spawned during the pass
//! 3. Drop destroyed and out-of-bounds entities
//! 4. Advance tile animations and the phantom layer fade

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::camera::{Camera, ShakeRequest};
use super::entity::{Entity, EntityId};
use super::factory::EntityFactory;
use super::sweep::TileProbe;
use crate::audio::SoundCue;
use crate::consts::{EMPTY_TILE, GROUND_LAYER};
use crate::map::{TileAnimator, TileGrid};
use crate::renderer::{LayerPass, RenderSink, TileAtlas, draw_tiles};
use crate::settings::SimulationConfig;

/// Input commands for a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub down: bool,
    /// Primary action (shoot, use)
    pub action: bool,
}

/// Why an entity left the world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Destroyed,
    OutOfBounds,
}

/// Things that happened during a step
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// A spawned entity joined the world
    Spawned { id: EntityId, kind: &'static str },
    Removed {
        id: EntityId,
        kind: &'static str,
        reason: RemovalReason,
    },
    /// `entity` tracks collisions and overlapped `other`
    Collision { entity: EntityId, other: EntityId },
    /// `tracked` came within `entity`'s trigger radius
    Trigger { entity: EntityId, tracked: EntityId },
    /// Shake request for the cameras
    Shake(ShakeRequest),
    /// Positional sound for the audio sink
    Sound(SoundCue),
}

/// What an entity can see and do while the world steps it
pub struct StepContext<'a> {
    /// Entity being updated
    pub id: EntityId,
    /// Ticks completed before this one
    pub tick: u64,
    pub input: &'a TickInput,
    pub probe: TileProbe<'a>,
    pub rng: &'a mut Pcg32,
    spool: &'a mut Vec<Box<dyn Entity>>,
    events: &'a mut Vec<WorldEvent>,
}

impl<'a> StepContext<'a> {
    pub fn grid(&self) -> &'a TileGrid {
        self.probe.grid()
    }

    pub fn config(&self) -> &'a SimulationConfig {
        self.probe.config()
    }

    /// Queue an entity; it joins the world after the current pass
    pub fn spawn(&mut self, entity: Box<dyn Entity>) {
        self.spool.push(entity);
    }

    pub fn shake(&mut self, range: f32, speed: u32, fade: f32) {
        self.events.push(WorldEvent::Shake(ShakeRequest { range, speed, fade }));
    }

    pub fn play_sound(&mut self, sound: u16, at: Vec2) {
        self.events.push(WorldEvent::Sound(SoundCue { sound, at }));
    }
}

/// Mutable references to two distinct slice elements
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// The simulated level
pub struct World {
    grid: TileGrid,
    config: SimulationConfig,
    /// Sorted by id
    entities: Vec<(EntityId, Box<dyn Entity>)>,
    spool: Vec<Box<dyn Entity>>,
    tracked: Vec<EntityId>,
    animator: TileAnimator,
    rng: Pcg32,
    next_id: u32,
    tick: u64,
    phantom_alpha: f32,
}

impl World {
    pub fn new(grid: TileGrid, config: SimulationConfig) -> Self {
        let animator = TileAnimator::new(grid.animations.clone(), config.seed);
        let rng = Pcg32::seed_from_u64(config.seed);
        log::info!(
            "World created: {}x{} tiles, {} layers, {} ground codes, {} platform codes",
            grid.width(),
            grid.height(),
            grid.layer_count(),
            config.ground_codes.len(),
            config.platform_codes.len()
        );
        Self {
            grid,
            config,
            entities: Vec::new(),
            spool: Vec::new(),
            tracked: Vec::new(),
            animator,
            rng,
            next_id: 1,
            tick: 0,
            phantom_alpha: 1.0,
        }
    }

    /// Build a world and seed it from the ground layer in reading order
    pub fn from_map(grid: TileGrid, config: SimulationConfig, factory: &mut dyn EntityFactory) -> Self {
        let mut world = Self::new(grid, config);
        let ts = world.grid.tile_size as i32;
        let cells: Vec<_> = world.grid.occupied_cells(GROUND_LAYER).collect();
        for (x, y, code) in cells {
            if let Some(entity) = factory.create_entity(code, x as i32 * ts, y as i32 * ts) {
                world.spawn(entity);
            }
        }
        log::info!("Seeded {} entities from the ground layer", world.entities.len());
        world
    }

    /// Add an entity right away. Use `StepContext::spawn` from inside a step.
    pub fn spawn(&mut self, entity: Box<dyn Entity>) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        if entity.is_tracked() {
            self.tracked.push(id);
        }
        log::debug!("Spawned {} {}", entity.kind(), id);
        self.entities.push((id, entity));
        id
    }

    /// Add an entity to the tracked set (proximity triggers, phantom fade)
    pub fn track(&mut self, id: EntityId) {
        if self.index_of(id).is_some() && !self.tracked.contains(&id) {
            self.tracked.push(id);
        }
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.binary_search_by_key(&id, |(i, _)| *i).ok()
    }

    pub fn get(&self, id: EntityId) -> Option<&dyn Entity> {
        self.index_of(id).map(|i| self.entities[i].1.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut dyn Entity> {
        let i = self.index_of(id)?;
        let entity: &mut dyn Entity = self.entities[i].1.as_mut();
        Some(entity)
    }

    /// Entities in id order
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &dyn Entity)> + '_ {
        self.entities.iter().map(|(id, e)| (*id, e.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn tracked(&self) -> &[EntityId] {
        &self.tracked
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut TileGrid {
        &mut self.grid
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn animator(&self) -> &TileAnimator {
        &self.animator
    }

    /// Current opacity of the phantom layer
    pub fn phantom_alpha(&self) -> f32 {
        self.phantom_alpha
    }

    /// Number of completed steps
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Advance the world by one tick
    pub fn step(&mut self, input: &TickInput) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        self.update_pass(input, &mut events);
        self.merge_spool(&mut events);
        self.remove_dead(&mut events);
        self.animator.tick();
        self.fade_phantom();
        self.tick += 1;
        events
    }

    fn update_pass(&mut self, input: &TickInput, events: &mut Vec<WorldEvent>) {
        let Self {
            grid,
            config,
            entities,
            spool,
            tracked,
            rng,
            tick,
            ..
        } = self;
        let probe = TileProbe::new(grid, config);

        for i in 0..entities.len() {
            if entities[i].1.body().destroyed {
                continue;
            }
            let id = entities[i].0;
            let mut ctx = StepContext {
                id,
                tick: *tick,
                input,
                probe,
                rng: &mut *rng,
                spool: &mut *spool,
                events: &mut *events,
            };

            entities[i].1.update(&mut ctx);

            if entities[i].1.body().tracks_collisions {
                for j in 0..entities.len() {
                    if j == i || entities[j].1.body().destroyed || entities[i].1.body().destroyed {
                        continue;
                    }
                    if !entities[i].1.body().overlaps(entities[j].1.body()) {
                        continue;
                    }
                    let (this, other) = pair_mut(entities, i, j);
                    this.1.on_collision(other.1.as_mut(), &mut ctx);
                    ctx.events.push(WorldEvent::Collision {
                        entity: id,
                        other: other.0,
                    });
                }
            }

            let radius = entities[i].1.body().trigger_radius;
            if radius > 0 {
                for &tracked_id in tracked.iter() {
                    if tracked_id == id || entities[i].1.body().destroyed {
                        continue;
                    }
                    let Ok(j) = entities.binary_search_by_key(&tracked_id, |(e, _)| *e) else {
                        continue;
                    };
                    if entities[j].1.body().destroyed {
                        continue;
                    }
                    if entities[i].1.body().distance_to(entities[j].1.body()) >= radius as f32 {
                        continue;
                    }
                    let (this, target) = pair_mut(entities, i, j);
                    this.1.on_trigger(target.1.as_ref(), &mut ctx);
                    ctx.events.push(WorldEvent::Trigger {
                        entity: id,
                        tracked: tracked_id,
                    });
                }
            }
        }
    }

    fn merge_spool(&mut self, events: &mut Vec<WorldEvent>) {
        for entity in std::mem::take(&mut self.spool) {
            let kind = entity.kind();
            let id = self.spawn(entity);
            events.push(WorldEvent::Spawned { id, kind });
        }
    }

    fn remove_dead(&mut self, events: &mut Vec<WorldEvent>) {
        let probe = TileProbe::new(&self.grid, &self.config);
        self.entities.retain(|(id, entity)| {
            let body = entity.body();
            let reason = if body.destroyed {
                RemovalReason::Destroyed
            } else if body.is_out_of_bounds_default(&probe) {
                RemovalReason::OutOfBounds
            } else {
                return true;
            };
            log::debug!("Removed {} {} ({:?})", entity.kind(), id, reason);
            events.push(WorldEvent::Removed {
                id: *id,
                kind: entity.kind(),
                reason,
            });
            false
        });
        let entities = &self.entities;
        self.tracked
            .retain(|id| entities.binary_search_by_key(id, |(e, _)| *e).is_ok());
    }

    /// Is any tracked entity's center inside a non-empty phantom cell?
    fn phantom_covers_tracked(&self, layer: usize) -> bool {
        self.tracked.iter().filter_map(|&id| self.get(id)).any(|entity| {
            let c = entity.body().center();
            self.grid
                .code_at_pixel(layer, c.x.floor() as i32, c.y.floor() as i32)
                .is_some_and(|code| code != EMPTY_TILE)
        })
    }

    fn fade_phantom(&mut self) {
        let Some(layer) = self.grid.phantom_layer() else {
            return;
        };
        let step = self.config.phantom_fade_step;
        self.phantom_alpha = if self.phantom_covers_tracked(layer) {
            (self.phantom_alpha - step).max(0.0)
        } else {
            (self.phantom_alpha + step).min(1.0)
        };
    }

    /// Draw background layers, entities, then foreground layers
    pub fn render(&self, camera: &Camera, atlas: &TileAtlas, sink: &mut dyn RenderSink) {
        let alpha = self.phantom_alpha;
        let mut rng = self.animator.frame_rng();
        draw_tiles(&self.grid, &self.animator, &mut rng, camera, atlas, LayerPass::Background, alpha, sink);
        for (_, entity) in &self.entities {
            entity.render(camera, sink);
        }
        draw_tiles(&self.grid, &self.animator, &mut rng, camera, atlas, LayerPass::Foreground, alpha, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{AnimationKind, AnimationRule};
    use crate::renderer::{DrawCommand, TextureHandle};
    use crate::sim::entity::Body;
    use std::cell::RefCell;
    use std::rc::Rc;

    const GROUND: u16 = 1;
    const SPAWNER: u16 = 20;
    const CRATE: u16 = 21;

    /// Falls under gravity; records every tick it was grounded
    struct Faller {
        body: Body,
        grounded: Rc<RefCell<Vec<bool>>>,
    }

    impl Entity for Faller {
        fn body(&self) -> &Body {
            &self.body
        }
        fn body_mut(&mut self) -> &mut Body {
            &mut self.body
        }
        fn kind(&self) -> &'static str {
            "faller"
        }
        fn update(&mut self, ctx: &mut StepContext<'_>) {
            let grounded = self.body.physics_step(&ctx.probe, true);
            self.grounded.borrow_mut().push(grounded);
        }
    }

    /// Sits still and logs what it collided with
    struct Watcher {
        body: Body,
        hits: Rc<RefCell<Vec<(u64, &'static str)>>>,
        tracked: bool,
    }

    impl Entity for Watcher {
        fn body(&self) -> &Body {
            &self.body
        }
        fn body_mut(&mut self) -> &mut Body {
            &mut self.body
        }
        fn kind(&self) -> &'static str {
            "watcher"
        }
        fn update(&mut self, _ctx: &mut StepContext<'_>) {}
        fn on_collision(&mut self, other: &mut dyn Entity, ctx: &mut StepContext<'_>) {
            self.hits.borrow_mut().push((ctx.tick, other.kind()));
        }
        fn on_trigger(&mut self, tracked: &dyn Entity, ctx: &mut StepContext<'_>) {
            self.hits.borrow_mut().push((ctx.tick, tracked.kind()));
            ctx.shake(4.0, 2, 0.9);
        }
        fn is_tracked(&self) -> bool {
            self.tracked
        }
    }

    /// Hands one entity to the world on its first update
    struct Spawner {
        body: Body,
        pending: Option<Box<dyn Entity>>,
    }

    impl Entity for Spawner {
        fn body(&self) -> &Body {
            &self.body
        }
        fn body_mut(&mut self) -> &mut Body {
            &mut self.body
        }
        fn kind(&self) -> &'static str {
            "spawner"
        }
        fn update(&mut self, ctx: &mut StepContext<'_>) {
            if let Some(entity) = self.pending.take() {
                ctx.spawn(entity);
                ctx.play_sound(3, self.body.position);
            }
        }
    }

    struct Marker {
        body: Body,
    }

    impl Entity for Marker {
        fn body(&self) -> &Body {
            &self.body
        }
        fn body_mut(&mut self) -> &mut Body {
            &mut self.body
        }
        fn kind(&self) -> &'static str {
            "marker"
        }
        fn update(&mut self, _ctx: &mut StepContext<'_>) {}
        fn render(&self, camera: &Camera, sink: &mut dyn RenderSink) {
            sink.draw(self.body.sprite_command(TextureHandle(9), 0, 0, false, camera));
        }
    }

    fn floor_grid() -> TileGrid {
        let mut grid = TileGrid::new(10, 10, 2, 16);
        grid.fill_row(GROUND_LAYER, 9, 0..10, GROUND);
        grid
    }

    fn config() -> SimulationConfig {
        SimulationConfig::with_codes([GROUND], [])
    }

    fn watcher(x: f32, y: f32, hits: &Rc<RefCell<Vec<(u64, &'static str)>>>) -> Box<Watcher> {
        Box::new(Watcher {
            body: Body::new(Vec2::new(x, y), 16, 16).with_collisions(true),
            hits: Rc::clone(hits),
            tracked: false,
        })
    }

    #[test]
    fn test_falling_entity_comes_to_rest() {
        let mut world = World::new(floor_grid(), config());
        let grounded = Rc::new(RefCell::new(Vec::new()));
        let id = world.spawn(Box::new(Faller {
            body: Body::new(Vec2::ZERO, 16, 16).solid(1.0, 0.0),
            grounded: Rc::clone(&grounded),
        }));

        for _ in 0..120 {
            world.step(&TickInput::default());
        }

        let body = world.get(id).unwrap().body();
        assert_eq!(body.position.y, (9 * 16 - 16) as f32);

        let history = grounded.borrow();
        let first = history.iter().position(|&g| g).unwrap();
        assert!(history[first..].iter().all(|&g| g));
        assert!(history[..first].iter().all(|&g| !g));
    }

    #[test]
    fn test_factory_seeds_in_reading_order() {
        let mut grid = floor_grid();
        grid.set(GROUND_LAYER, 5, 2, CRATE);
        grid.set(GROUND_LAYER, 1, 3, CRATE);
        grid.set(GROUND_LAYER, 7, 2, CRATE);

        let mut seen = Vec::new();
        let mut factory = |code: u16, x: i32, y: i32| -> Option<Box<dyn Entity>> {
            if code != CRATE {
                return None;
            }
            seen.push((x, y));
            Some(Box::new(Marker {
                body: Body::new(Vec2::new(x as f32, y as f32), 16, 16),
            }))
        };
        let world = World::from_map(grid, config(), &mut factory);

        assert_eq!(world.len(), 3);
        assert_eq!(seen, vec![(80, 32), (112, 32), (16, 48)]);
        let positions: Vec<Vec2> = world.entities().map(|(_, e)| e.body().position).collect();
        assert_eq!(positions[0], Vec2::new(80.0, 32.0));
        assert_eq!(positions[2], Vec2::new(16.0, 48.0));
    }

    #[test]
    fn test_spawned_entity_joins_next_tick() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new(floor_grid(), config());
        world.spawn(Box::new(Spawner {
            body: Body::new(Vec2::new(40.0, 40.0), 16, 16),
            pending: Some(Box::new(Marker {
                body: Body::new(Vec2::new(40.0, 40.0), 8, 8),
            })),
        }));
        // Watches the spawn point; updated after the spawner in id order
        world.spawn(watcher(40.0, 40.0, &hits));
        assert_eq!(world.len(), 2);

        let events = world.step(&TickInput::default());
        assert_eq!(world.len(), 3);
        assert!(events.contains(&WorldEvent::Spawned {
            id: EntityId(3),
            kind: "marker"
        }));
        assert!(events.contains(&WorldEvent::Sound(SoundCue {
            sound: 3,
            at: Vec2::new(40.0, 40.0)
        })));
        // Same tick: the watcher only saw the spawner
        assert_eq!(*hits.borrow(), vec![(0, "spawner")]);

        world.step(&TickInput::default());
        let hits = hits.borrow();
        assert!(hits.contains(&(1, "marker")));
        assert!(hits.contains(&(1, "spawner")));
        assert!(!hits.contains(&(0, "marker")));
    }

    #[test]
    fn test_spawned_tracked_entity_triggers_next_tick() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new(floor_grid(), config());
        let coin = world.spawn(Box::new(Watcher {
            body: Body::new(Vec2::new(10.0, 0.0), 16, 16).with_trigger_radius(40),
            hits: Rc::clone(&hits),
            tracked: false,
        }));
        world.spawn(Box::new(Spawner {
            body: Body::new(Vec2::new(100.0, 100.0), 16, 16),
            pending: Some(Box::new(Watcher {
                body: Body::new(Vec2::ZERO, 16, 16),
                hits: Rc::clone(&hits),
                tracked: true,
            })),
        }));

        let events = world.step(&TickInput::default());
        let player = EntityId(3);
        assert_eq!(world.tracked(), &[player]);
        assert!(!events.iter().any(|e| matches!(e, WorldEvent::Trigger { .. })));
        assert!(hits.borrow().is_empty());

        let events = world.step(&TickInput::default());
        assert!(events.contains(&WorldEvent::Trigger {
            entity: coin,
            tracked: player
        }));
        assert_eq!(*hits.borrow(), vec![(1, "watcher")]);
    }

    #[test]
    fn test_collision_requires_tracking_and_overlap() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new(floor_grid(), config());
        let a = world.spawn(watcher(10.0, 10.0, &hits));
        let mut b = Watcher {
            body: Body::new(Vec2::new(20.0, 20.0), 16, 16),
            hits: Rc::clone(&hits),
            tracked: false,
        };
        b.body.tracks_collisions = false;
        let b = world.spawn(Box::new(b));
        world.spawn(watcher(100.0, 100.0, &hits));

        let events = world.step(&TickInput::default());
        let collisions: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, WorldEvent::Collision { .. }))
            .collect();
        assert_eq!(collisions, vec![&WorldEvent::Collision { entity: a, other: b }]);
        assert_eq!(hits.borrow().len(), 1);
    }

    #[test]
    fn test_trigger_radius() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new(floor_grid(), config());
        let player = world.spawn(Box::new(Watcher {
            body: Body::new(Vec2::new(0.0, 0.0), 16, 16),
            hits: Rc::clone(&hits),
            tracked: true,
        }));
        let near = world.spawn(Box::new(Watcher {
            body: Body::new(Vec2::new(30.0, 0.0), 16, 16).with_trigger_radius(31),
            hits: Rc::clone(&hits),
            tracked: false,
        }));
        world.spawn(Box::new(Watcher {
            body: Body::new(Vec2::new(30.0, 0.0), 16, 16).with_trigger_radius(30),
            hits: Rc::clone(&hits),
            tracked: false,
        }));
        assert_eq!(world.tracked(), &[player]);

        let events = world.step(&TickInput::default());
        let triggers: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, WorldEvent::Trigger { .. }))
            .collect();
        assert_eq!(triggers, vec![&WorldEvent::Trigger { entity: near, tracked: player }]);
        assert!(events.iter().any(|e| matches!(e, WorldEvent::Shake(_))));
    }

    #[test]
    fn test_removal_of_destroyed_and_out_of_bounds() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut world = World::new(floor_grid(), config());
        let gone = world.spawn(Box::new(Marker {
            body: Body::new(Vec2::new(500.0, 0.0), 8, 8),
        }));
        let doomed = world.spawn(watcher(40.0, 40.0, &hits));
        let tracked = world.spawn(Box::new(Marker {
            body: Body::new(Vec2::new(20.0, 20.0), 8, 8),
        }));
        world.track(tracked);
        world.get_mut(doomed).unwrap().body_mut().destroy();
        world.get_mut(tracked).unwrap().body_mut().position.y = -100.0;

        let events = world.step(&TickInput::default());
        assert!(world.is_empty());
        assert!(world.tracked().is_empty());
        assert!(events.contains(&WorldEvent::Removed {
            id: gone,
            kind: "marker",
            reason: RemovalReason::OutOfBounds
        }));
        assert!(events.contains(&WorldEvent::Removed {
            id: doomed,
            kind: "watcher",
            reason: RemovalReason::Destroyed
        }));
        // Destroyed entities are skipped entirely
        assert!(hits.borrow().is_empty());
    }

    #[test]
    fn test_phantom_fade() {
        let mut grid = floor_grid();
        grid.set_phantom_layer(1);
        grid.fill_row(1, 0, 0..3, 5);
        let mut config = config();
        config.phantom_fade_step = 0.25;
        let mut world = World::new(grid, config);
        let player = world.spawn(Box::new(Marker {
            body: Body::new(Vec2::new(4.0, 0.0), 8, 8),
        }));
        world.track(player);

        for expected in [0.75, 0.5, 0.25, 0.0, 0.0] {
            world.step(&TickInput::default());
            assert_eq!(world.phantom_alpha(), expected);
        }

        world.get_mut(player).unwrap().body_mut().position = Vec2::new(100.0, 100.0);
        world.step(&TickInput::default());
        assert_eq!(world.phantom_alpha(), 0.25);
    }

    #[test]
    fn test_render_order() {
        let mut grid = TileGrid::new(10, 10, 3, 16);
        grid.set_main_layer(1);
        grid.set(1, 0, 0, 4);
        grid.set(2, 1, 0, 6);
        let config = config();
        let camera = Camera::new(crate::sim::Rect::new(0, 0, 160, 160), &grid, &config);
        let mut world = World::new(grid, config);
        world.spawn(Box::new(Marker {
            body: Body::new(Vec2::new(50.0, 50.0), 8, 8),
        }));

        let atlas = TileAtlas {
            texture: TextureHandle(1),
            columns: 4,
        };
        let mut commands: Vec<DrawCommand> = Vec::new();
        world.render(&camera, &atlas, &mut commands);
        let textures: Vec<u32> = commands.iter().map(|c| c.texture.0).collect();
        assert_eq!(textures, vec![1, 9, 1]);
        assert_eq!(commands[0].dest.x, 0);
        assert_eq!(commands[2].dest.x, 16);
    }

    #[test]
    fn test_rendering_leaves_animation_untouched() {
        let mut grid = floor_grid();
        grid.fill_row(1, 0, 0..10, 30);
        grid.animations = vec![
            AnimationRule::new(10, 8, 1, AnimationKind::RandomGlobal),
            AnimationRule::new(30, 8, 1, AnimationKind::RandomPerTile),
        ];
        let config = config();
        let camera = Camera::new(crate::sim::Rect::new(0, 0, 160, 160), &grid, &config);
        let atlas = TileAtlas {
            texture: TextureHandle(1),
            columns: 8,
        };
        let mut quiet = World::new(grid.clone(), config.clone());
        let mut drawn = World::new(grid, config);

        let shared = |world: &World| world.animator().resolve(10, &mut world.animator().frame_rng());
        for _ in 0..20 {
            quiet.step(&TickInput::default());
            drawn.step(&TickInput::default());
            let mut commands: Vec<DrawCommand> = Vec::new();
            drawn.render(&camera, &atlas, &mut commands);
            assert!(!commands.is_empty());
            assert_eq!(shared(&quiet), shared(&drawn));
        }
    }

    #[test]
    fn test_deterministic_replay() {
        let run = || {
            let mut world = World::new(floor_grid(), config());
            let grounded = Rc::new(RefCell::new(Vec::new()));
            let id = world.spawn(Box::new(Faller {
                body: Body::new(Vec2::new(30.0, 0.0), 16, 16).solid(1.0, 0.6),
                grounded,
            }));
            world.get_mut(id).unwrap().body_mut().velocity.x = 3.5;
            let mut trace = Vec::new();
            for _ in 0..60 {
                world.step(&TickInput::default());
                trace.push(world.get(id).map(|e| e.body().position));
            }
            trace
        };
        assert_eq!(run(), run());
    }
}
