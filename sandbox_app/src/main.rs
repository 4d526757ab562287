//! Headless level sandbox
//!
//! Builds a small asteroid field, flies a ship through it for a few hundred
//! frames and logs what the world's queries report. Asteroids the ship runs
//! into are removed from inside the step and fresh ones spawn at the edge.
//!
//! Usage: `sandbox [config.toml|config.ron]`

use level_engine::foundation::logging;
use level_engine::prelude::*;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

const FIELD_WIDTH: f64 = 1024.0;
const FIELD_HEIGHT: f64 = 512.0;
const ASTEROID_COUNT: usize = 40;
const FRAMES: u64 = 300;
const SPAWN_INTERVAL: u64 = 25;

#[derive(Error, Debug)]
enum SandboxError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(#[from] level_engine::config::ConfigError),

    #[error("Could not place the ship")]
    Placement,
}

/// Shared tallies the thinkers report into
#[derive(Debug, Default)]
struct Tally {
    destroyed: usize,
    spawned: usize,
}

/// Removes whatever the ship hit during the last frame and keeps the field
/// stocked with new asteroids
struct FieldKeeper {
    ship: ObjectId,
    tally: Rc<RefCell<Tally>>,
}

impl Thinker for FieldKeeper {
    fn after_movement(&mut self, engine: &mut Engine, state: StateId) {
        let hits: Vec<ObjectId> = engine.collisions(self.ship).iter().map(|hit| hit.object).collect();
        for asteroid in hits {
            if engine.remove_object(asteroid) {
                self.tally.borrow_mut().destroyed += 1;
            }
        }

        let frame = engine.state(state).map_or(0, LevelState::frame);
        if frame % SPAWN_INTERVAL == 0 {
            let mut rng = rand::thread_rng();
            let position = LevelVector::new(FIELD_WIDTH, rng.gen_range(0.0..FIELD_HEIGHT));
            match spawn_asteroid(engine, state, position, rng.gen_range(6.0..18.0)) {
                Ok(_) => self.tally.borrow_mut().spawned += 1,
                Err(err) => log::warn!("Failed to spawn asteroid: {}", err),
            }
        }
    }
}

/// Logs a summary of the ship's surroundings every few frames
struct Lookout {
    ship: ObjectId,
}

impl Thinker for Lookout {
    fn before_movement(&mut self, engine: &mut Engine, state: StateId) {
        let frame = engine.state(state).map_or(0, LevelState::frame);
        if frame % 50 != 0 {
            return;
        }
        let Some(center) = engine.object_center(self.ship) else {
            return;
        };
        let nearby = engine.objects_within_circle(state, center, 120.0, ObjectClasses::ANY);
        let nearest = engine
            .nearest_object_to(self.ship, ObjectClasses::ANY)
            .and_then(|asteroid| engine.object_center(asteroid));
        log::info!(
            "Frame {}: ship at ({:.1}, {:.1}), {} objects within 120, nearest at {:?}",
            frame,
            center.x,
            center.y,
            nearby.len(),
            nearest.map(|position| (position.x.round(), position.y.round()))
        );
    }
}

fn spawn_asteroid(
    engine: &mut Engine,
    state: StateId,
    position: LevelVector,
    radius: f64,
) -> Result<ObjectId, EngineError> {
    let half = radius * 0.8;
    let body = engine.create_hitbox(position, HitboxShape::rectangle(-half, half, -half, half)?);
    let asteroid = engine.create_object(body)?;
    let halo = engine.create_hitbox(LevelVector::zeros(), HitboxShape::circle(radius)?);
    engine.set_solid_hitbox(asteroid, Some(body));
    engine.set_overlap_hitbox(asteroid, Some(halo));
    engine.add_object(state, asteroid);
    Ok(asteroid)
}

fn spawn_ship(engine: &mut Engine, state: StateId) -> Result<ObjectId, SandboxError> {
    let hull = engine.create_hitbox(
        LevelVector::new(16.0, FIELD_HEIGHT / 2.0),
        HitboxShape::rectangle(-8.0, 8.0, -5.0, 5.0)?,
    );
    let ship = engine.create_thinker_object(hull)?;
    let nose = engine.create_hitbox(LevelVector::new(8.0, 0.0), HitboxShape::line(LevelVector::new(6.0, 0.0)));
    if !engine.set_collision_hitbox(ship, Some(hull)) || !engine.set_center_hitbox(ship, Some(nose)) {
        return Err(SandboxError::Placement);
    }
    engine.set_collision_mode(ship, CollisionMode::Discrete);
    engine.set_velocity(ship, LevelVector::new(3.0, 0.0));
    engine.set_draw_priority(ship, 10);
    engine.add_object(state, ship);
    Ok(ship)
}

fn load_config() -> Result<EngineConfig, SandboxError> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(&path)?,
        None => EngineConfig::new().with_level(LevelConfig::new(64.0, 64.0)),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), SandboxError> {
    let config = load_config()?;
    logging::init_with_filter(&config.log_level);
    log::info!("Starting level sandbox with {}x{} cells", config.level.cell_width, config.level.cell_height);

    let mut engine = Engine::with_config(config);
    let world = engine.create_default_state()?;

    let mut rng = rand::thread_rng();
    for _ in 0..ASTEROID_COUNT {
        let position = LevelVector::new(rng.gen_range(80.0..FIELD_WIDTH), rng.gen_range(0.0..FIELD_HEIGHT));
        spawn_asteroid(&mut engine, world, position, rng.gen_range(6.0..18.0))?;
    }
    let ship = spawn_ship(&mut engine, world)?;

    let tally = Rc::new(RefCell::new(Tally::default()));
    engine.add_thinker(
        world,
        Box::new(FieldKeeper {
            ship,
            tally: Rc::clone(&tally),
        }),
    );
    engine.add_thinker(world, Box::new(Lookout { ship }));

    for _ in 0..FRAMES {
        engine.step(world)?;
        let hull = engine.object(ship).map(LevelObject::locator);
        if let Some(hull) = hull {
            if engine.hitbox(hull).is_some_and(|hitbox| hitbox.left_edge() > FIELD_WIDTH) {
                engine.set_position(hull, LevelVector::new(16.0, rng.gen_range(0.0..FIELD_HEIGHT)));
            }
        }
    }

    let visible = engine.visible_locators(world, &Bounds::new(0.0, FIELD_WIDTH, 0.0, FIELD_HEIGHT));
    let level = engine.state(world).map_or(0, LevelState::object_count);
    let tally = tally.borrow();
    log::info!(
        "Done after {} frames: {} objects ({} visible), {} asteroids destroyed, {} spawned",
        FRAMES,
        level,
        visible.len(),
        tally.destroyed,
        tally.spawned
    );
    Ok(())
}
