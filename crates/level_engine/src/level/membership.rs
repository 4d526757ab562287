//! Object membership and iteration
//!
//! Objects enter and leave worlds through [`DeferredCommand::Transfer`].
//! Each object has at most one transition pending at a time: `new_state`
//! always names the world the object will be in once the queue drains, and
//! every transfer records the world it expects to move the object out of.

use super::deferred::DeferredCommand;
use crate::engine::Engine;
use crate::foundation::collections::{ObjectId, StateId};
use crate::physics::{HitboxRoles, ObjectClasses};

impl Engine {
    /// Put an object into a world, moving it out of any world it is in.
    ///
    /// Fails if the object is already in `state` or already headed there.
    pub fn add_object(&mut self, state: StateId, object: ObjectId) -> bool {
        if !self.states.contains_key(state) {
            return false;
        }
        let Some(record) = self.objects.get_mut(object) else {
            return false;
        };
        if record.new_state == Some(state) {
            log::debug!("Object {} is already headed for {:?}", record.serial, state);
            return false;
        }
        let from = record.new_state;
        record.new_state = Some(state);
        self.submit(DeferredCommand::Transfer {
            object,
            from,
            to: Some(state),
        });
        true
    }

    /// Take an object out of its world.
    ///
    /// Fails if the object is not in a world and is not headed for one.
    pub fn remove_object(&mut self, object: ObjectId) -> bool {
        let Some(record) = self.objects.get_mut(object) else {
            return false;
        };
        let Some(from) = record.new_state else {
            return false;
        };
        record.new_state = None;
        self.submit(DeferredCommand::Transfer {
            object,
            from: Some(from),
            to: None,
        });
        true
    }

    pub(crate) fn apply_transfer(&mut self, object: ObjectId, from: Option<StateId>, to: Option<StateId>) {
        let Some(record) = self.objects.get(object) else {
            log::warn!("Ignoring transfer of a destroyed object");
            return;
        };
        if record.state != from {
            log::warn!(
                "Ignoring stale transfer of object {}: expected {:?}, found {:?}",
                record.serial,
                from,
                record.state
            );
            return;
        }
        if from.is_some() {
            self.detach_object(object);
        }
        if let Some(to) = to {
            if self.states.contains_key(to) {
                self.attach_object(object, to);
            } else {
                log::warn!("Object dropped out of destroyed world {:?}", to);
                if let Some(record) = self.objects.get_mut(object) {
                    record.new_state = None;
                }
            }
        }
    }

    fn attach_object(&mut self, object: ObjectId, state: StateId) {
        let Some(record) = self.objects.get_mut(object) else {
            return;
        };
        record.state = Some(state);
        let (serial, locator, hitboxes) = (record.serial, record.locator, record.role_hitboxes());
        let movement_priority = record.motion.as_ref().map(|motion| motion.movement_priority);
        if let Some(level) = self.states.get_mut(state) {
            level.objects.insert((serial, object));
            if let Some(priority) = movement_priority {
                level.thinker_objects.insert((priority, serial, object));
            }
        }
        self.set_subtree_state(locator, Some(state));
        for id in hitboxes {
            let roles = self.hitboxes.get(id).map_or(HitboxRoles::empty(), |hitbox| hitbox.roles);
            self.register_roles(id, roles);
        }
        log::trace!("Object {} entered {:?}", serial, state);
    }

    fn detach_object(&mut self, object: ObjectId) {
        let Some(record) = self.objects.get(object) else {
            return;
        };
        let Some(state) = record.state else {
            return;
        };
        let (serial, locator, hitboxes) = (record.serial, record.locator, record.role_hitboxes());
        let movement_priority = record.motion.as_ref().map(|motion| motion.movement_priority);
        for id in hitboxes {
            self.unregister_roles(id, HitboxRoles::all());
        }
        self.set_subtree_state(locator, None);
        if let Some(level) = self.states.get_mut(state) {
            level.objects.remove(&(serial, object));
            if let Some(priority) = movement_priority {
                level.thinker_objects.remove(&(priority, serial, object));
            }
        }
        if let Some(record) = self.objects.get_mut(object) {
            record.state = None;
        }
        log::trace!("Object {} left {:?}", serial, state);
    }

    /// Objects in a world that pass `filter`, in creation order
    pub fn objects(&self, state: StateId, filter: ObjectClasses) -> Vec<ObjectId> {
        let Some(level) = self.states.get(state) else {
            return Vec::new();
        };
        level
            .objects
            .iter()
            .map(|(_, id)| *id)
            .filter(|id| self.objects.get(*id).is_some_and(|object| object.is(filter)))
            .collect()
    }

    /// Thinker objects in a world, in movement order
    pub fn thinker_objects(&self, state: StateId) -> Vec<ObjectId> {
        self.states
            .get(state)
            .map(|level| level.thinker_objects.iter().map(|(_, _, id)| *id).collect())
            .unwrap_or_default()
    }

    /// Call `f` for every object in a world that passes `filter`.
    ///
    /// Membership changes made inside `f` are deferred until the outermost
    /// iteration closes, so the visited set is the one at the start.
    pub fn for_each_object(&mut self, state: StateId, filter: ObjectClasses, mut f: impl FnMut(&mut Engine, ObjectId)) {
        let snapshot = self.objects(state, filter);
        self.open_iteration();
        for object in snapshot {
            f(self, object);
        }
        self.close_iteration();
    }

    /// Call `f` for every thinker object in a world, in movement order
    pub fn for_each_thinker_object(&mut self, state: StateId, mut f: impl FnMut(&mut Engine, ObjectId)) {
        let snapshot = self.thinker_objects(state);
        self.open_iteration();
        for object in snapshot {
            f(self, object);
        }
        self.close_iteration();
    }
}

#[cfg(test)]
mod tests {
    use crate::physics::HitboxShape;
    use crate::prelude::*;

    fn object_at(engine: &mut Engine, x: f64, y: f64) -> ObjectId {
        let shape = HitboxShape::rectangle(-2.0, 2.0, -2.0, 2.0).unwrap();
        let locator = engine.create_hitbox(LevelVector::new(x, y), shape);
        engine.create_object(locator).unwrap()
    }

    #[test]
    fn test_add_and_remove_outside_iteration_apply_at_once() {
        let mut engine = Engine::new();
        let state = engine.create_default_state().unwrap();
        let object = object_at(&mut engine, 5.0, 5.0);

        assert!(engine.add_object(state, object));
        assert_eq!(engine.object(object).unwrap().state(), Some(state));
        assert!(!engine.add_object(state, object));
        let locator = engine.object(object).unwrap().locator();
        assert_eq!(engine.hitbox(locator).unwrap().state(), Some(state));
        assert!(engine.hitbox(locator).unwrap().cell_range().is_some());

        assert!(engine.remove_object(object));
        assert_eq!(engine.object(object).unwrap().state(), None);
        assert!(engine.hitbox(locator).unwrap().cell_range().is_none());
        assert_eq!(engine.state(state).unwrap().grid().occupied_cells(), 0);
        assert!(!engine.remove_object(object));
    }

    #[test]
    fn test_transfer_between_worlds() {
        let mut engine = Engine::new();
        let first = engine.create_default_state().unwrap();
        let second = engine.create_default_state().unwrap();
        let object = object_at(&mut engine, 0.0, 0.0);

        engine.add_object(first, object);
        assert!(engine.add_object(second, object));
        assert_eq!(engine.object(object).unwrap().state(), Some(second));
        assert_eq!(engine.state(first).unwrap().object_count(), 0);
        assert_eq!(engine.state(second).unwrap().object_count(), 1);
        assert_eq!(engine.state(first).unwrap().grid().occupied_cells(), 0);
    }

    #[test]
    fn test_changes_inside_iteration_are_deferred() {
        let mut engine = Engine::new();
        let state = engine.create_default_state().unwrap();
        let resident = object_at(&mut engine, 0.0, 0.0);
        let newcomer = object_at(&mut engine, 10.0, 0.0);
        engine.add_object(state, resident);

        let mut visited = Vec::new();
        engine.for_each_object(state, ObjectClasses::ANY, |engine, object| {
            visited.push(object);
            assert!(engine.add_object(state, newcomer));
            assert!(engine.remove_object(object));
            assert_eq!(engine.object(newcomer).unwrap().state(), None);
            assert_eq!(engine.object(newcomer).unwrap().new_state(), Some(state));
            assert_eq!(engine.pending_changes(), 2);
        });

        assert_eq!(visited, vec![resident]);
        assert_eq!(engine.pending_changes(), 0);
        assert_eq!(engine.objects(state, ObjectClasses::ANY), vec![newcomer]);
    }

    #[test]
    fn test_snapshot_accessors_filter_classes() {
        let mut engine = Engine::new();
        let state = engine.create_default_state().unwrap();
        let plain = object_at(&mut engine, 0.0, 0.0);
        let locator = engine.create_hitbox(LevelVector::zeros(), HitboxShape::point());
        let thinker = engine.create_thinker_object(locator).unwrap();
        engine.add_object(state, plain);
        engine.add_object(state, thinker);

        assert_eq!(engine.objects(state, ObjectClasses::ANY), vec![plain, thinker]);
        assert_eq!(engine.objects(state, ObjectClasses::THINKER), vec![thinker]);
        assert_eq!(engine.thinker_objects(state), vec![thinker]);
    }

    #[test]
    fn test_destroy_needs_detached_object() {
        let mut engine = Engine::new();
        let state = engine.create_default_state().unwrap();
        let object = object_at(&mut engine, 0.0, 0.0);
        engine.add_object(state, object);
        assert!(!engine.destroy_object(object));
        engine.remove_object(object);
        assert!(engine.destroy_object(object));
        assert_eq!(engine.object_count(), 0);
    }
}
