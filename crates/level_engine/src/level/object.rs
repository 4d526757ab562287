//! Level objects and their role hitboxes
//!
//! An object is a locator hitbox plus optional overlap, solid, center and
//! (for thinker objects) collision hitboxes hanging below it. Role hitboxes
//! other than the locator are descendants of the locator; one hitbox may
//! serve several roles at once.

use crate::engine::{Engine, EngineError};
use crate::foundation::collections::{HitboxId, ObjectId, StateId};
use crate::foundation::math::LevelVector;
use crate::physics::{Direction, Hitbox, HitboxRoles, ObjectClasses};
use std::fmt;
use std::rc::Rc;

/// How a thinker object reacts to solids while moving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionMode {
    /// Move without checking anything
    #[default]
    None,
    /// Move without checking; the caller sweeps for solids itself
    Continuous,
    /// Move, then record solids the collision hitbox ends up inside
    Discrete,
}

/// A solid surface met during the last movement step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    /// Object owning the solid hitbox
    pub object: ObjectId,
    /// Side of the solid that was met
    pub direction: Direction,
}

/// Decides whether a collision between a mover and a solid object counts.
///
/// Called with the engine, the moving object, the solid object and the side
/// of the solid that was met.
pub type CollisionCheck = Rc<dyn Fn(&Engine, ObjectId, ObjectId, Direction) -> bool>;

/// Movement state of a thinker object
#[derive(Clone)]
pub struct Motion {
    pub(crate) movement_priority: i32,
    pub(crate) new_movement_priority: i32,
    pub(crate) velocity: LevelVector,
    pub(crate) displacement: LevelVector,
    pub(crate) collision_mode: CollisionMode,
    pub(crate) collision_hitbox: Option<HitboxId>,
    pub(crate) collisions: Vec<Collision>,
    pub(crate) collision_check: Option<CollisionCheck>,
}

impl Motion {
    fn new() -> Self {
        Self {
            movement_priority: 0,
            new_movement_priority: 0,
            velocity: LevelVector::zeros(),
            displacement: LevelVector::zeros(),
            collision_mode: CollisionMode::None,
            collision_hitbox: None,
            collisions: Vec::new(),
            collision_check: None,
        }
    }

    /// Movement priority in effect
    pub fn movement_priority(&self) -> i32 {
        self.movement_priority
    }

    /// Movement priority once pending changes are applied
    pub fn new_movement_priority(&self) -> i32 {
        self.new_movement_priority
    }

    /// Velocity per step
    pub fn velocity(&self) -> LevelVector {
        self.velocity
    }

    /// Extra movement accumulated for the next step
    pub fn displacement(&self) -> LevelVector {
        self.displacement
    }

    /// Collision mode
    pub fn collision_mode(&self) -> CollisionMode {
        self.collision_mode
    }

    /// Collision hitbox
    pub fn collision_hitbox(&self) -> Option<HitboxId> {
        self.collision_hitbox
    }

    /// Collisions recorded during the last step
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }
}

impl fmt::Debug for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Motion")
            .field("movement_priority", &self.movement_priority)
            .field("new_movement_priority", &self.new_movement_priority)
            .field("velocity", &self.velocity)
            .field("displacement", &self.displacement)
            .field("collision_mode", &self.collision_mode)
            .field("collision_hitbox", &self.collision_hitbox)
            .field("collisions", &self.collisions)
            .field("collision_check", &self.collision_check.is_some())
            .finish()
    }
}

/// An entity placed in a world
#[derive(Debug, Clone)]
pub struct LevelObject {
    pub(crate) serial: u64,
    pub(crate) locator: HitboxId,
    pub(crate) overlap: Option<HitboxId>,
    pub(crate) solid: Option<HitboxId>,
    pub(crate) center: Option<HitboxId>,
    pub(crate) classes: ObjectClasses,
    pub(crate) draw_priority: i32,
    pub(crate) time_factor: f64,
    pub(crate) state: Option<StateId>,
    pub(crate) new_state: Option<StateId>,
    pub(crate) motion: Option<Motion>,
}

impl LevelObject {
    /// Creation serial; unique and increasing
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Locator hitbox
    pub fn locator(&self) -> HitboxId {
        self.locator
    }

    /// Overlap hitbox
    pub fn overlap_hitbox(&self) -> Option<HitboxId> {
        self.overlap
    }

    /// Solid hitbox
    pub fn solid_hitbox(&self) -> Option<HitboxId> {
        self.solid
    }

    /// Center hitbox
    pub fn center_hitbox(&self) -> Option<HitboxId> {
        self.center
    }

    /// Collision hitbox, for thinker objects
    pub fn collision_hitbox(&self) -> Option<HitboxId> {
        self.motion.as_ref().and_then(|motion| motion.collision_hitbox)
    }

    /// Classes
    pub fn classes(&self) -> ObjectClasses {
        self.classes
    }

    /// Does the object pass a class filter?
    pub fn is(&self, filter: ObjectClasses) -> bool {
        self.classes.matches(filter)
    }

    /// Draw priority
    pub fn draw_priority(&self) -> i32 {
        self.draw_priority
    }

    /// Own time factor; negative means the world's is used
    pub fn time_factor(&self) -> f64 {
        self.time_factor
    }

    /// World the object is in
    pub fn state(&self) -> Option<StateId> {
        self.state
    }

    /// World the object will be in once pending changes are applied
    pub fn new_state(&self) -> Option<StateId> {
        self.new_state
    }

    /// Movement state, for thinker objects
    pub fn motion(&self) -> Option<&Motion> {
        self.motion.as_ref()
    }

    /// Is this a thinker object?
    pub fn is_thinker(&self) -> bool {
        self.motion.is_some()
    }

    fn role_slot(&self, role: HitboxRoles) -> Option<HitboxId> {
        if role == HitboxRoles::LOCATOR {
            Some(self.locator)
        } else if role == HitboxRoles::OVERLAP {
            self.overlap
        } else if role == HitboxRoles::SOLID {
            self.solid
        } else if role == HitboxRoles::CENTER {
            self.center
        } else if role == HitboxRoles::COLLISION {
            self.collision_hitbox()
        } else {
            None
        }
    }

    fn set_role_slot(&mut self, role: HitboxRoles, hitbox: Option<HitboxId>) {
        if role == HitboxRoles::OVERLAP {
            self.overlap = hitbox;
        } else if role == HitboxRoles::SOLID {
            self.solid = hitbox;
        } else if role == HitboxRoles::CENTER {
            self.center = hitbox;
        } else if role == HitboxRoles::COLLISION {
            if let Some(motion) = self.motion.as_mut() {
                motion.collision_hitbox = hitbox;
            }
        }
    }

    /// Distinct hitboxes serving any role, locator first
    pub fn role_hitboxes(&self) -> Vec<HitboxId> {
        let mut hitboxes = vec![self.locator];
        for candidate in [self.overlap, self.solid, self.center, self.collision_hitbox()]
            .into_iter()
            .flatten()
        {
            if !hitboxes.contains(&candidate) {
                hitboxes.push(candidate);
            }
        }
        hitboxes
    }
}

impl Engine {
    /// Create an object around a free-standing locator hitbox
    pub fn create_object(&mut self, locator: HitboxId) -> Result<ObjectId, EngineError> {
        self.spawn_object(locator, None)
    }

    /// Create a thinker object, one that takes part in movement steps
    pub fn create_thinker_object(&mut self, locator: HitboxId) -> Result<ObjectId, EngineError> {
        self.spawn_object(locator, Some(Motion::new()))
    }

    fn spawn_object(&mut self, locator: HitboxId, motion: Option<Motion>) -> Result<ObjectId, EngineError> {
        let hitbox = self.hitboxes.get(locator).ok_or(EngineError::UnknownHitbox)?;
        if hitbox.parent.is_some() || hitbox.object.is_some() {
            return Err(EngineError::HitboxInUse);
        }
        let classes = if motion.is_some() {
            ObjectClasses::THINKER
        } else {
            ObjectClasses::empty()
        };
        let serial = self.serials.issue();
        let object = self.objects.insert(LevelObject {
            serial,
            locator,
            overlap: None,
            solid: None,
            center: None,
            classes,
            draw_priority: 0,
            time_factor: -1.0,
            state: None,
            new_state: None,
            motion,
        });
        self.set_subtree_owner(locator, Some(object), None);
        if let Some(hitbox) = self.hitboxes.get_mut(locator) {
            hitbox.roles = HitboxRoles::LOCATOR;
        }
        log::debug!("Created object {} with locator {:?}", serial, locator);
        Ok(object)
    }

    /// Destroy an object that is in no world and has nothing pending.
    ///
    /// Role hitboxes are released but not destroyed: the locator becomes
    /// free-standing again and other role hitboxes are detached from it.
    pub fn destroy_object(&mut self, object: ObjectId) -> bool {
        let Some(record) = self.objects.get(object) else {
            return false;
        };
        if record.state.is_some() || record.new_state.is_some() {
            log::debug!("Object {} is still in a world and cannot be destroyed", record.serial);
            return false;
        }
        let locator = record.locator;
        for role in [HitboxRoles::OVERLAP, HitboxRoles::SOLID, HitboxRoles::CENTER, HitboxRoles::COLLISION] {
            self.assign_role(object, role, None);
        }
        if let Some(hitbox) = self.hitboxes.get_mut(locator) {
            hitbox.roles = HitboxRoles::empty();
        }
        self.set_subtree_owner(locator, None, None);
        self.objects.remove(object);
        true
    }

    /// Set or clear the overlap hitbox
    pub fn set_overlap_hitbox(&mut self, object: ObjectId, hitbox: Option<HitboxId>) -> bool {
        self.assign_role(object, HitboxRoles::OVERLAP, hitbox)
    }

    /// Set or clear the solid hitbox
    pub fn set_solid_hitbox(&mut self, object: ObjectId, hitbox: Option<HitboxId>) -> bool {
        self.assign_role(object, HitboxRoles::SOLID, hitbox)
    }

    /// Set or clear the center hitbox
    pub fn set_center_hitbox(&mut self, object: ObjectId, hitbox: Option<HitboxId>) -> bool {
        self.assign_role(object, HitboxRoles::CENTER, hitbox)
    }

    /// Set or clear the collision hitbox of a thinker object
    pub fn set_collision_hitbox(&mut self, object: ObjectId, hitbox: Option<HitboxId>) -> bool {
        self.assign_role(object, HitboxRoles::COLLISION, hitbox)
    }

    /// Give `hitbox` the single `role` on `object`, taking it from whichever
    /// hitbox had it.
    ///
    /// The new hitbox must be the locator, a hitbox already below the
    /// locator, or a free-standing hitbox (which is attached under the
    /// locator). A hitbox left with no roles detaches from its parent.
    fn assign_role(&mut self, object: ObjectId, role: HitboxRoles, hitbox: Option<HitboxId>) -> bool {
        let Some(record) = self.objects.get(object) else {
            return false;
        };
        if role == HitboxRoles::COLLISION && record.motion.is_none() {
            log::debug!("Only thinker objects have collision hitboxes");
            return false;
        }
        let locator = record.locator;
        let previous = record.role_slot(role);
        if previous == hitbox {
            return true;
        }

        if let Some(new) = hitbox {
            let Some(candidate) = self.hitboxes.get(new) else {
                return false;
            };
            let below_locator = candidate.object == Some(object);
            let free = candidate.parent.is_none() && candidate.object.is_none();
            if !below_locator && !free {
                log::debug!("Hitbox {} belongs elsewhere and cannot take a role", candidate.serial);
                return false;
            }
            if let Some(old) = previous {
                let old_roles = self.hitboxes.get(old).map_or(HitboxRoles::empty(), |h| h.roles);
                if old_roles == role && old != locator && self.subtree(old).contains(&new) {
                    log::debug!("Role hitbox would be detached along with the hitbox it replaces");
                    return false;
                }
            }
            if free && !self.add_child(locator, new) {
                return false;
            }
        }

        if let Some(old) = previous {
            self.remove_role(old, role);
        }
        if let Some(record) = self.objects.get_mut(object) {
            record.set_role_slot(role, hitbox);
        }
        if let Some(new) = hitbox {
            if let Some(target) = self.hitboxes.get_mut(new) {
                target.roles |= role;
            }
            self.register_roles(new, role);
        }
        true
    }

    /// Take `role` away from a hitbox, detaching it once it has none left
    fn remove_role(&mut self, id: HitboxId, role: HitboxRoles) {
        self.unregister_roles(id, role);
        let Some(hitbox) = self.hitboxes.get_mut(id) else {
            return;
        };
        hitbox.roles -= role;
        if hitbox.roles.is_empty() {
            if let Some(parent) = hitbox.parent {
                self.remove_child(parent, id);
            }
        }
    }

    /// Release every role a hitbox holds and clear the owner's references
    /// to it; used when the hitbox leaves the object's hierarchy
    pub(crate) fn strip_roles(&mut self, id: HitboxId) {
        let Some(hitbox) = self.hitboxes.get(id) else {
            return;
        };
        let (roles, object) = (hitbox.roles, hitbox.object);
        self.unregister_roles(id, roles);
        if let Some(hitbox) = self.hitboxes.get_mut(id) {
            hitbox.roles = HitboxRoles::empty();
        }
        if let Some(record) = object.and_then(|object| self.objects.get_mut(object)) {
            for role in [HitboxRoles::OVERLAP, HitboxRoles::SOLID, HitboxRoles::CENTER, HitboxRoles::COLLISION] {
                if record.role_slot(role) == Some(id) {
                    record.set_role_slot(role, None);
                }
            }
        }
    }

    /// Change the draw priority; the locator is refiled so ordered cell
    /// buckets stay sorted
    pub fn set_draw_priority(&mut self, object: ObjectId, priority: i32) -> bool {
        let Some(locator) = self.objects.get(object).map(|record| record.locator) else {
            return false;
        };
        self.refile(locator, HitboxRoles::LOCATOR, |engine| {
            if let Some(record) = engine.objects.get_mut(object) {
                record.draw_priority = priority;
            }
        });
        true
    }

    /// Replace the classes of an object. [`ObjectClasses::THINKER`] follows
    /// whether the object is a thinker object and cannot be changed.
    pub fn set_classes(&mut self, object: ObjectId, classes: ObjectClasses) -> bool {
        let Some(record) = self.objects.get_mut(object) else {
            return false;
        };
        let thinker = if record.motion.is_some() {
            ObjectClasses::THINKER
        } else {
            ObjectClasses::empty()
        };
        record.classes = (classes - ObjectClasses::THINKER) | thinker;
        true
    }

    /// Set the object's own time factor; negative values use the world's
    pub fn set_object_time_factor(&mut self, object: ObjectId, time_factor: f64) -> Result<(), EngineError> {
        if time_factor.is_nan() || time_factor.is_infinite() {
            return Err(EngineError::InvalidTimeFactor(time_factor));
        }
        let record = self.objects.get_mut(object).ok_or(EngineError::UnknownObject)?;
        record.time_factor = time_factor;
        Ok(())
    }

    /// Time factor actually applied to the object: its own, or its world's
    /// when its own is negative
    pub fn effective_time_factor(&self, object: ObjectId) -> Option<f64> {
        let record = self.objects.get(object)?;
        if record.time_factor >= 0.0 {
            return Some(record.time_factor);
        }
        let state = record.state?;
        self.states.get(state).map(|level| level.time_factor)
    }

    /// Center of an object: the absolute position of its center hitbox if it
    /// has one, otherwise that of its locator
    pub fn object_center(&self, object: ObjectId) -> Option<LevelVector> {
        let record = self.objects.get(object)?;
        let hitbox = record.center.unwrap_or(record.locator);
        self.hitboxes.get(hitbox).map(Hitbox::abs_position)
    }
}

#[cfg(test)]
mod tests {
    use crate::physics::HitboxShape;
    use crate::prelude::*;

    fn rectangle(engine: &mut Engine, x: f64, y: f64) -> HitboxId {
        let shape = HitboxShape::rectangle(-4.0, 4.0, -4.0, 4.0).unwrap();
        engine.create_hitbox(LevelVector::new(x, y), shape)
    }

    #[test]
    fn test_locator_must_be_free() {
        let mut engine = Engine::new();
        let locator = rectangle(&mut engine, 0.0, 0.0);
        let object = engine.create_object(locator).unwrap();
        assert!(matches!(engine.create_object(locator), Err(EngineError::HitboxInUse)));

        let parent = rectangle(&mut engine, 0.0, 0.0);
        let child = rectangle(&mut engine, 0.0, 0.0);
        engine.add_child(parent, child);
        assert!(matches!(engine.create_object(child), Err(EngineError::HitboxInUse)));

        let record = engine.object(object).unwrap();
        assert_eq!(record.locator(), locator);
        assert_eq!(engine.hitbox(locator).unwrap().roles(), HitboxRoles::LOCATOR);
    }

    #[test]
    fn test_role_hitboxes_attach_below_locator() {
        let mut engine = Engine::new();
        let locator = rectangle(&mut engine, 10.0, 10.0);
        let object = engine.create_object(locator).unwrap();
        let trigger = rectangle(&mut engine, 2.0, 0.0);

        assert!(engine.set_overlap_hitbox(object, Some(trigger)));
        assert_eq!(engine.hitbox(trigger).unwrap().parent(), Some(locator));
        assert_eq!(engine.hitbox(trigger).unwrap().abs_position(), LevelVector::new(12.0, 10.0));
        assert_eq!(engine.hitbox(trigger).unwrap().object(), Some(object));

        // The same hitbox can also be solid
        assert!(engine.set_solid_hitbox(object, Some(trigger)));
        assert_eq!(engine.hitbox(trigger).unwrap().num_roles(), 2);

        // Clearing one role keeps it attached, clearing both detaches it
        assert!(engine.set_overlap_hitbox(object, None));
        assert_eq!(engine.hitbox(trigger).unwrap().parent(), Some(locator));
        assert!(engine.set_solid_hitbox(object, None));
        assert_eq!(engine.hitbox(trigger).unwrap().parent(), None);
        assert_eq!(engine.hitbox(trigger).unwrap().object(), None);
    }

    #[test]
    fn test_role_hitbox_of_another_object_is_rejected() {
        let mut engine = Engine::new();
        let first = rectangle(&mut engine, 0.0, 0.0);
        let second = rectangle(&mut engine, 0.0, 0.0);
        let a = engine.create_object(first).unwrap();
        let _b = engine.create_object(second).unwrap();

        assert!(!engine.set_overlap_hitbox(a, Some(second)));
        assert!(engine.set_overlap_hitbox(a, Some(first)));
        assert_eq!(engine.hitbox(first).unwrap().roles(), HitboxRoles::LOCATOR | HitboxRoles::OVERLAP);
    }

    #[test]
    fn test_collision_hitbox_needs_thinker() {
        let mut engine = Engine::new();
        let plain_locator = rectangle(&mut engine, 0.0, 0.0);
        let plain = engine.create_object(plain_locator).unwrap();
        assert!(!engine.set_collision_hitbox(plain, Some(plain_locator)));

        let thinker_locator = rectangle(&mut engine, 0.0, 0.0);
        let thinker = engine.create_thinker_object(thinker_locator).unwrap();
        assert!(engine.set_collision_hitbox(thinker, Some(thinker_locator)));
        assert!(engine.object(thinker).unwrap().is(ObjectClasses::THINKER));
        assert!(!engine.object(plain).unwrap().is(ObjectClasses::THINKER));
    }

    #[test]
    fn test_destroy_object_releases_hitboxes() {
        let mut engine = Engine::new();
        let locator = rectangle(&mut engine, 0.0, 0.0);
        let object = engine.create_object(locator).unwrap();
        let center = engine.create_hitbox(LevelVector::new(1.0, 1.0), HitboxShape::point());
        assert!(engine.set_center_hitbox(object, Some(center)));

        assert!(engine.destroy_object(object));
        assert!(engine.object(object).is_none());
        assert_eq!(engine.hitbox(locator).unwrap().object(), None);
        assert_eq!(engine.hitbox(locator).unwrap().num_roles(), 0);
        assert_eq!(engine.hitbox(center).unwrap().parent(), None);
        assert!(engine.destroy_hitbox(locator));
    }

    #[test]
    fn test_center_and_time_factor() {
        let mut engine = Engine::new();
        let state = engine.create_state(LevelConfig::default().with_time_factor(0.5)).unwrap();
        let locator = rectangle(&mut engine, 10.0, 20.0);
        let object = engine.create_object(locator).unwrap();
        assert_eq!(engine.object_center(object), Some(LevelVector::new(10.0, 20.0)));

        let center = engine.create_hitbox(LevelVector::new(0.0, -3.0), HitboxShape::point());
        engine.set_center_hitbox(object, Some(center));
        assert_eq!(engine.object_center(object), Some(LevelVector::new(10.0, 17.0)));

        // An offset shape reports its position, not the middle of its box
        let offset = engine.create_hitbox(LevelVector::zeros(), HitboxShape::rectangle(0.0, 32.0, 0.0, 32.0).unwrap());
        let other = engine.create_object(offset).unwrap();
        assert_eq!(engine.object_center(other), Some(LevelVector::zeros()));
        assert_eq!(engine.hitbox(offset).unwrap().center(), LevelVector::new(16.0, 16.0));

        assert_eq!(engine.effective_time_factor(object), None);
        engine.add_object(state, object);
        assert_eq!(engine.effective_time_factor(object), Some(0.5));
        engine.set_object_time_factor(object, 2.0).unwrap();
        assert_eq!(engine.effective_time_factor(object), Some(2.0));
        assert!(engine.set_object_time_factor(object, f64::NAN).is_err());
    }

    #[test]
    fn test_classes_keep_thinker_bit() {
        let mut engine = Engine::new();
        let locator = rectangle(&mut engine, 0.0, 0.0);
        let object = engine.create_thinker_object(locator).unwrap();
        let enemy = ObjectClasses::custom(8);
        assert!(engine.set_classes(object, enemy));
        let classes = engine.object(object).unwrap().classes();
        assert!(classes.contains(enemy | ObjectClasses::THINKER));
    }
}
