//! The per-frame step
//!
//! A step runs the before-movement hooks, moves every thinker object in
//! movement order, then runs the after-movement hooks. The whole step is one
//! iteration, so membership and priority changes made by hooks or collision
//! checks apply once it ends.

use super::deferred::DeferredCommand;
use super::object::{Collision, CollisionMode};
use super::state::StepState;
use crate::engine::{Engine, EngineError};
use crate::foundation::collections::{ObjectId, StateId};
use crate::foundation::math::LevelVector;
use crate::physics::{Bounds, Direction, Directions};
use crate::spatial::{Bucket, SpatialIndex};
use std::rc::Rc;

impl Engine {
    /// Advance one world by one frame. Worlds with a time factor of zero
    /// are left untouched.
    pub fn step(&mut self, state: StateId) -> Result<(), EngineError> {
        let level = self.states.get(state).ok_or(EngineError::UnknownState)?;
        if level.time_factor <= 0.0 {
            log::trace!("Skipping paused world {:?}", state);
            return Ok(());
        }
        self.open_iteration();
        self.set_step_state(state, StepState::BeforeMovement);

        for thinker in self.active_thinkers(state) {
            self.run_thinker(state, thinker, |thinker, engine, state| thinker.before_movement(engine, state));
        }

        let movers = self.thinker_objects(state);
        for &object in &movers {
            self.move_object(object);
        }

        self.set_step_state(state, StepState::AfterMovement);
        for thinker in self.active_thinkers(state) {
            self.run_thinker(state, thinker, |thinker, engine, state| thinker.after_movement(engine, state));
        }

        if let Some(level) = self.states.get_mut(state) {
            level.step_state = StepState::Idle;
            level.frame += 1;
            log::debug!("World {:?} finished frame {} ({} movers)", state, level.frame, movers.len());
        }
        self.close_iteration();
        Ok(())
    }

    /// Step every world once
    pub fn step_all(&mut self) -> Result<(), EngineError> {
        for state in self.state_ids() {
            self.step(state)?;
        }
        Ok(())
    }

    fn set_step_state(&mut self, state: StateId, step_state: StepState) {
        if let Some(level) = self.states.get_mut(state) {
            level.step_state = step_state;
        }
    }

    fn move_object(&mut self, object: ObjectId) {
        let Some(time_factor) = self.effective_time_factor(object) else {
            return;
        };
        let Some(record) = self.objects.get_mut(object) else {
            return;
        };
        let locator = record.locator;
        let Some(motion) = record.motion.as_mut() else {
            return;
        };
        motion.collisions.clear();
        let delta = (motion.velocity + motion.displacement) * time_factor;
        motion.displacement = LevelVector::zeros();
        let mode = motion.collision_mode;

        if delta != LevelVector::zeros() {
            self.change_position(locator, delta);
        }
        if mode == CollisionMode::Discrete {
            let collisions = self.scan_collisions(object, delta);
            if let Some(motion) = self.objects.get_mut(object).and_then(|record| record.motion.as_mut()) {
                motion.collisions = collisions;
            }
        }
    }

    /// Solids the collision hitbox of `object` ends up inside after moving
    /// by `delta`, looking only at surfaces that face the motion.
    ///
    /// Each solid object is recorded at most once. When a diagonal move
    /// meets two of its surfaces, the one crossed by the smaller depth is
    /// taken as the side that was hit. A mover that did not move records
    /// nothing.
    fn scan_collisions(&self, object: ObjectId, delta: LevelVector) -> Vec<Collision> {
        let Some(record) = self.objects.get(object) else {
            return Vec::new();
        };
        let (Some(state), Some(motion)) = (record.state, record.motion.as_ref()) else {
            return Vec::new();
        };
        let Some(collision_hitbox) = motion.collision_hitbox else {
            return Vec::new();
        };
        let (Some(level), Some(hitbox)) = (self.states.get(state), self.hitboxes.get(collision_hitbox)) else {
            return Vec::new();
        };
        let check = motion.collision_check.clone();
        let bounds = hitbox.bounds;

        let facing: Vec<Direction> = Direction::facing_motion(delta.x, delta.y).collect();
        let buckets: Vec<Bucket> = facing.iter().map(|&direction| Bucket::SolidSurface(direction)).collect();
        let mut solids = level.grid.query_rect(&bounds, &buckets);
        solids.sort_by_key(|id| self.hitboxes.get(*id).map_or(u64::MAX, |hitbox| hitbox.serial));

        let mut collisions: Vec<Collision> = Vec::new();
        for solid in solids {
            let Some(solid_hitbox) = self.hitboxes.get(solid) else {
                continue;
            };
            let Some(other) = solid_hitbox.object else {
                continue;
            };
            if collisions.iter().any(|collision| collision.object == other)
                || !self.intersects_solid_hitbox(collision_hitbox, solid)
            {
                continue;
            }
            let Some(direction) = facing
                .iter()
                .copied()
                .filter(|&direction| solid_hitbox.solid_surfaces.contains(Directions::from(direction)))
                .min_by(|&a, &b| {
                    let depth = |direction| penetration(&bounds, &solid_hitbox.bounds, direction);
                    depth(a).total_cmp(&depth(b))
                })
            else {
                continue;
            };
            if check.as_ref().map_or(true, |check| check(self, object, other, direction)) {
                collisions.push(Collision { object: other, direction });
            }
        }
        collisions
    }

    /// Change the movement priority of a thinker object. Lower priorities
    /// move first.
    pub fn set_movement_priority(&mut self, object: ObjectId, priority: i32) -> bool {
        let Some(motion) = self.objects.get_mut(object).and_then(|record| record.motion.as_mut()) else {
            return false;
        };
        motion.new_movement_priority = priority;
        self.submit(DeferredCommand::MovementPriority { object, priority });
        true
    }

    pub(crate) fn apply_movement_priority(&mut self, object: ObjectId, priority: i32) {
        let Some(record) = self.objects.get_mut(object) else {
            log::warn!("Ignoring movement priority of a destroyed object");
            return;
        };
        let (serial, state) = (record.serial, record.state);
        let Some(motion) = record.motion.as_mut() else {
            return;
        };
        let previous = motion.movement_priority;
        motion.movement_priority = priority;
        if let Some(level) = state.and_then(|state| self.states.get_mut(state)) {
            level.thinker_objects.remove(&(previous, serial, object));
            level.thinker_objects.insert((priority, serial, object));
        }
    }

    /// Set the velocity, in units per frame at a time factor of one
    pub fn set_velocity(&mut self, object: ObjectId, velocity: LevelVector) -> bool {
        self.with_motion(object, |motion| motion.velocity = velocity)
    }

    /// Add to the displacement applied, then cleared, by the next step
    pub fn add_displacement(&mut self, object: ObjectId, displacement: LevelVector) -> bool {
        self.with_motion(object, |motion| motion.displacement += displacement)
    }

    /// Set how the object reacts to solids while moving
    pub fn set_collision_mode(&mut self, object: ObjectId, mode: CollisionMode) -> bool {
        self.with_motion(object, |motion| motion.collision_mode = mode)
    }

    /// Install the check that decides which collisions are recorded
    pub fn set_collision_check<F>(&mut self, object: ObjectId, check: F) -> bool
    where
        F: Fn(&Engine, ObjectId, ObjectId, Direction) -> bool + 'static,
    {
        let check: super::object::CollisionCheck = Rc::new(check);
        self.with_motion(object, |motion| motion.collision_check = Some(check))
    }

    /// Record every collision again
    pub fn clear_collision_check(&mut self, object: ObjectId) -> bool {
        self.with_motion(object, |motion| motion.collision_check = None)
    }

    /// Collisions recorded during the last step
    pub fn collisions(&self, object: ObjectId) -> &[Collision] {
        self.objects
            .get(object)
            .and_then(|record| record.motion.as_ref())
            .map(|motion| motion.collisions.as_slice())
            .unwrap_or(&[])
    }

    fn with_motion(&mut self, object: ObjectId, change: impl FnOnce(&mut super::object::Motion)) -> bool {
        match self.objects.get_mut(object).and_then(|record| record.motion.as_mut()) {
            Some(motion) => {
                change(motion);
                true
            }
            None => false,
        }
    }
}

/// How far `mover` reaches past the `surface` side of `solid`
fn penetration(mover: &Bounds, solid: &Bounds, surface: Direction) -> f64 {
    match surface {
        Direction::Left => mover.right - solid.left,
        Direction::Right => solid.right - mover.left,
        Direction::Up => mover.bottom - solid.top,
        Direction::Down => solid.bottom - mover.top,
    }
}
