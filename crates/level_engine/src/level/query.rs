//! Spatial queries over a world
//!
//! Every query takes a class filter. Set queries return objects in
//! creation order; "nearest" queries measure Euclidean distance between
//! object centers and break ties by the lower serial.

use crate::core::config::DrawMode;
use crate::engine::Engine;
use crate::foundation::collections::{HitboxId, ObjectId, StateId};
use crate::foundation::math::LevelVector;
use crate::physics::{Bounds, Direction, ObjectClasses};
use crate::spatial::{Bucket, SpatialIndex};

const CENTER_BUCKETS: [Bucket; 2] = [Bucket::Locator, Bucket::Center];

impl Engine {
    /// Nearest object to `point` in a world
    pub fn nearest_object(&self, state: StateId, point: LevelVector, filter: ObjectClasses) -> Option<ObjectId> {
        self.nearest_of(point, self.objects(state, filter), None)
    }

    /// Nearest other object to `object`, in the object's own world
    pub fn nearest_object_to(&self, object: ObjectId, filter: ObjectClasses) -> Option<ObjectId> {
        let state = self.objects.get(object)?.state?;
        let origin = self.object_center(object)?;
        self.nearest_of(origin, self.objects(state, filter), Some(object))
    }

    /// Objects whose center lies inside `bounds`, edges included
    pub fn objects_within_rectangle(&self, state: StateId, bounds: &Bounds, filter: ObjectClasses) -> Vec<ObjectId> {
        let Some(level) = self.states.get(state) else {
            return Vec::new();
        };
        let candidates = level.grid.query_rect(bounds, &CENTER_BUCKETS);
        self.owners(candidates, filter, None, |engine, object| {
            engine.object_center(object).is_some_and(|center| bounds.contains(center))
        })
    }

    /// Nearest object to `point` among those whose center lies inside `bounds`
    pub fn nearest_object_within_rectangle(
        &self,
        state: StateId,
        point: LevelVector,
        bounds: &Bounds,
        filter: ObjectClasses,
    ) -> Option<ObjectId> {
        self.nearest_of(point, self.objects_within_rectangle(state, bounds, filter), None)
    }

    /// Objects whose center lies inside the circle, edge included
    pub fn objects_within_circle(
        &self,
        state: StateId,
        center: LevelVector,
        radius: f64,
        filter: ObjectClasses,
    ) -> Vec<ObjectId> {
        let Some(level) = self.states.get(state) else {
            return Vec::new();
        };
        let candidates = level.grid.query_circle(center, radius, &CENTER_BUCKETS);
        self.owners(candidates, filter, None, |engine, object| {
            engine
                .object_center(object)
                .is_some_and(|position| (position - center).norm() <= radius)
        })
    }

    /// Nearest object to the circle's center among those inside it
    pub fn nearest_object_within_circle(
        &self,
        state: StateId,
        center: LevelVector,
        radius: f64,
        filter: ObjectClasses,
    ) -> Option<ObjectId> {
        self.nearest_of(center, self.objects_within_circle(state, center, radius, filter), None)
    }

    /// Objects whose overlap hitbox overlaps `hitbox`. The object owning
    /// `hitbox` is never reported.
    pub fn overlapping_objects(&self, state: StateId, hitbox: HitboxId, filter: ObjectClasses) -> Vec<ObjectId> {
        let (Some(level), Some(probe)) = (self.states.get(state), self.hitboxes.get(hitbox)) else {
            return Vec::new();
        };
        let candidates: Vec<HitboxId> = level
            .grid
            .query_rect(&probe.bounds, &[Bucket::Overlap])
            .into_iter()
            .filter(|candidate| self.overlap(hitbox, *candidate))
            .collect();
        self.owners(candidates, filter, probe.object, |_, _| true)
    }

    /// Nearest object to the center of `hitbox` among those overlapping it
    pub fn nearest_overlapping_object(&self, state: StateId, hitbox: HitboxId, filter: ObjectClasses) -> Option<ObjectId> {
        let origin = self.hitboxes.get(hitbox)?.center();
        self.nearest_of(origin, self.overlapping_objects(state, hitbox, filter), None)
    }

    /// Does `hitbox` overlap the overlap hitbox of `object`?
    pub fn is_overlapping_object(&self, hitbox: HitboxId, object: ObjectId) -> bool {
        let Some(record) = self.objects.get(object) else {
            return false;
        };
        if self.hitboxes.get(hitbox).is_some_and(|probe| probe.object == Some(object)) {
            return false;
        }
        record.overlap.is_some_and(|overlap| self.overlap(hitbox, overlap))
    }

    /// Objects whose locator's bounding box meets that of `hitbox`
    pub fn objects_with_meeting_bounding_boxes(
        &self,
        state: StateId,
        hitbox: HitboxId,
        filter: ObjectClasses,
    ) -> Vec<ObjectId> {
        let (Some(level), Some(probe)) = (self.states.get(state), self.hitboxes.get(hitbox)) else {
            return Vec::new();
        };
        let candidates: Vec<HitboxId> = level
            .grid
            .query_rect(&probe.bounds, &[Bucket::Locator])
            .into_iter()
            .filter(|candidate| self.bounding_boxes_meet(hitbox, *candidate))
            .collect();
        self.owners(candidates, filter, probe.object, |_, _| true)
    }

    /// Objects whose solid hitbox `hitbox` intersects. With a direction,
    /// only solids whose surface on that side is solid count.
    pub fn intersecting_solid_objects(
        &self,
        state: StateId,
        hitbox: HitboxId,
        direction: Option<Direction>,
        filter: ObjectClasses,
    ) -> Vec<ObjectId> {
        let (Some(level), Some(probe)) = (self.states.get(state), self.hitboxes.get(hitbox)) else {
            return Vec::new();
        };
        let bucket = direction.map_or(Bucket::Solid, Bucket::SolidSurface);
        let candidates: Vec<HitboxId> = level
            .grid
            .query_rect(&probe.bounds, &[bucket])
            .into_iter()
            .filter(|candidate| self.intersects_solid_hitbox(hitbox, *candidate))
            .collect();
        self.owners(candidates, filter, probe.object, |_, _| true)
    }

    /// Nearest object to the center of `hitbox` among the solids it
    /// intersects
    pub fn nearest_intersecting_solid_object(
        &self,
        state: StateId,
        hitbox: HitboxId,
        direction: Option<Direction>,
        filter: ObjectClasses,
    ) -> Option<ObjectId> {
        let origin = self.hitboxes.get(hitbox)?.center();
        self.nearest_of(origin, self.intersecting_solid_objects(state, hitbox, direction, filter), None)
    }

    /// Locator hitboxes whose bounding boxes meet `region`, in draw order
    ///
    /// [`DrawMode::Flat`] orders by draw priority, [`DrawMode::Over`] by y
    /// so lower objects draw over higher ones, [`DrawMode::Under`] the
    /// reverse. Remaining ties go to draw priority, then serial.
    pub fn visible_locators(&self, state: StateId, region: &Bounds) -> Vec<HitboxId> {
        let Some(level) = self.states.get(state) else {
            return Vec::new();
        };
        let mut visible: Vec<(f64, i32, u64, HitboxId)> = level
            .grid
            .query_rect(region, &[Bucket::Locator])
            .into_iter()
            .filter_map(|id| {
                let hitbox = self.hitboxes.get(id)?;
                if !hitbox.bounds.meets(region) {
                    return None;
                }
                let priority = hitbox
                    .object
                    .and_then(|object| self.objects.get(object))
                    .map_or(0, |object| object.draw_priority);
                let depth = match level.grid.draw_mode() {
                    DrawMode::Flat => 0.0,
                    DrawMode::Over => hitbox.abs_position.y,
                    DrawMode::Under => -hitbox.abs_position.y,
                };
                Some((depth, priority, hitbox.serial, id))
            })
            .collect();
        visible.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });
        visible.into_iter().map(|(_, _, _, id)| id).collect()
    }

    /// Distinct owners of `hitboxes` that pass `filter` and `keep`, minus
    /// `exclude`, in creation order
    fn owners(
        &self,
        hitboxes: Vec<HitboxId>,
        filter: ObjectClasses,
        exclude: Option<ObjectId>,
        keep: impl Fn(&Engine, ObjectId) -> bool,
    ) -> Vec<ObjectId> {
        let mut found: Vec<(u64, ObjectId)> = hitboxes
            .into_iter()
            .filter_map(|id| self.hitboxes.get(id)?.object)
            .filter(|object| Some(*object) != exclude)
            .filter_map(|object| {
                let record = self.objects.get(object)?;
                record.is(filter).then_some((record.serial, object))
            })
            .collect();
        found.sort_unstable();
        found.dedup();
        found
            .into_iter()
            .map(|(_, object)| object)
            .filter(|object| keep(self, *object))
            .collect()
    }

    /// Object in `candidates` whose center is closest to `origin`
    fn nearest_of(&self, origin: LevelVector, candidates: Vec<ObjectId>, exclude: Option<ObjectId>) -> Option<ObjectId> {
        candidates
            .into_iter()
            .filter(|object| Some(*object) != exclude)
            .filter_map(|object| {
                let record = self.objects.get(object)?;
                let distance = (self.object_center(object)? - origin).norm();
                Some((distance, record.serial, object))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, _, object)| object)
    }
}

#[cfg(test)]
mod tests {
    use crate::physics::HitboxShape;
    use crate::prelude::*;

    fn boxed(engine: &mut Engine, state: StateId, x: f64, y: f64, half: f64) -> ObjectId {
        let shape = HitboxShape::rectangle(-half, half, -half, half).unwrap();
        let locator = engine.create_hitbox(LevelVector::new(x, y), shape);
        let object = engine.create_object(locator).unwrap();
        engine.set_overlap_hitbox(object, Some(locator));
        engine.set_solid_hitbox(object, Some(locator));
        engine.add_object(state, object);
        object
    }

    fn world(engine: &mut Engine) -> StateId {
        engine.create_state(LevelConfig::new(32.0, 32.0)).unwrap()
    }

    #[test]
    fn test_nearest_object_breaks_ties_by_serial() {
        let mut engine = Engine::new();
        let state = world(&mut engine);
        let left = boxed(&mut engine, state, -10.0, 0.0, 1.0);
        let right = boxed(&mut engine, state, 10.0, 0.0, 1.0);
        let far = boxed(&mut engine, state, 100.0, 0.0, 1.0);

        assert_eq!(engine.nearest_object(state, LevelVector::zeros(), ObjectClasses::ANY), Some(left));
        assert_eq!(engine.nearest_object(state, LevelVector::new(90.0, 0.0), ObjectClasses::ANY), Some(far));
        assert_eq!(engine.nearest_object_to(left, ObjectClasses::ANY), Some(right));
        assert_eq!(engine.nearest_object(state, LevelVector::zeros(), ObjectClasses::THINKER), None);
    }

    #[test]
    fn test_within_rectangle_and_circle_use_centers() {
        let mut engine = Engine::new();
        let state = world(&mut engine);
        let inside = boxed(&mut engine, state, 10.0, 10.0, 8.0);
        let edge = boxed(&mut engine, state, 64.0, 10.0, 1.0);
        let outside = boxed(&mut engine, state, 80.0, 10.0, 30.0);

        let region = Bounds::new(0.0, 64.0, 0.0, 20.0);
        let found = engine.objects_within_rectangle(state, &region, ObjectClasses::ANY);
        assert_eq!(found, vec![inside, edge]);
        assert!(!found.contains(&outside));
        assert_eq!(
            engine.nearest_object_within_rectangle(state, LevelVector::new(60.0, 10.0), &region, ObjectClasses::ANY),
            Some(edge)
        );

        let around = engine.objects_within_circle(state, LevelVector::new(10.0, 10.0), 54.0, ObjectClasses::ANY);
        assert_eq!(around, vec![inside, edge]);
        assert_eq!(
            engine.nearest_object_within_circle(state, LevelVector::new(70.0, 10.0), 20.0, ObjectClasses::ANY),
            Some(edge)
        );
    }

    #[test]
    fn test_far_off_regions_find_nothing() {
        let mut engine = Engine::new();
        let state = world(&mut engine);
        let object = boxed(&mut engine, state, 0.0, 0.0, 4.0);
        let locator = engine.object(object).unwrap().locator();
        let far = Bounds::new(-1e300, -1e299, 0.0, 10.0);

        assert!(engine.objects_within_rectangle(state, &far, ObjectClasses::ANY).is_empty());
        assert!(engine.objects_within_circle(state, LevelVector::new(-1e300, 0.0), 10.0, ObjectClasses::ANY).is_empty());
        assert!(engine.visible_locators(state, &far).is_empty());

        engine.set_position(locator, LevelVector::new(-1e300, 0.0));
        assert!(engine.overlapping_objects(state, locator, ObjectClasses::ANY).is_empty());
    }

    #[test]
    fn test_offset_locator_is_found_by_its_position() {
        let mut engine = Engine::new();
        let state = world(&mut engine);
        // The box hangs off to the lower right of its position
        let shape = HitboxShape::rectangle(0.0, 32.0, 0.0, 32.0).unwrap();
        let locator = engine.create_hitbox(LevelVector::new(-40.0, -40.0), shape);
        let object = engine.create_object(locator).unwrap();
        engine.add_object(state, object);

        assert_eq!(engine.object_center(object), Some(LevelVector::new(-40.0, -40.0)));
        let around_position = Bounds::new(-42.0, -38.0, -42.0, -38.0);
        assert_eq!(engine.objects_within_rectangle(state, &around_position, ObjectClasses::ANY), vec![object]);
        assert_eq!(
            engine.objects_within_circle(state, LevelVector::new(-41.0, -41.0), 2.0, ObjectClasses::ANY),
            vec![object]
        );
        let around_box = Bounds::new(-24.0, -24.0, -24.0, -24.0);
        assert!(engine.objects_within_rectangle(state, &around_box, ObjectClasses::ANY).is_empty());

        // The filed range follows the position as it moves away from the box
        engine.set_rectangle_edges(locator, 100.0, 132.0, 0.0, 32.0).unwrap();
        let region = Bounds::new(-41.0, -39.0, -41.0, -39.0);
        assert_eq!(engine.objects_within_rectangle(state, &region, ObjectClasses::ANY), vec![object]);
    }

    #[test]
    fn test_overlapping_objects_excludes_owner() {
        let mut engine = Engine::new();
        let state = world(&mut engine);
        let player = boxed(&mut engine, state, 0.0, 0.0, 4.0);
        let coin = boxed(&mut engine, state, 6.0, 0.0, 3.0);
        let _distant = boxed(&mut engine, state, 40.0, 0.0, 3.0);
        let probe = engine.object(player).unwrap().locator();

        assert_eq!(engine.overlapping_objects(state, probe, ObjectClasses::ANY), vec![coin]);
        assert_eq!(engine.nearest_overlapping_object(state, probe, ObjectClasses::ANY), Some(coin));
        assert!(engine.is_overlapping_object(probe, coin));
        assert!(!engine.is_overlapping_object(probe, player));
    }

    #[test]
    fn test_touching_boxes_meet_but_do_not_overlap() {
        let mut engine = Engine::new();
        let state = world(&mut engine);
        let a = boxed(&mut engine, state, 0.0, 0.0, 4.0);
        let b = boxed(&mut engine, state, 8.0, 0.0, 4.0);
        let probe = engine.object(a).unwrap().locator();

        assert_eq!(engine.objects_with_meeting_bounding_boxes(state, probe, ObjectClasses::ANY), vec![b]);
        assert!(engine.overlapping_objects(state, probe, ObjectClasses::ANY).is_empty());
    }

    #[test]
    fn test_intersecting_solids_by_direction() {
        let mut engine = Engine::new();
        let state = world(&mut engine);
        let mover = boxed(&mut engine, state, 0.0, 0.0, 4.0);
        let block = boxed(&mut engine, state, 6.0, 0.0, 4.0);
        let probe = engine.object(mover).unwrap().locator();
        let block_hitbox = engine.object(block).unwrap().locator();

        assert_eq!(engine.intersecting_solid_objects(state, probe, None, ObjectClasses::ANY), vec![block]);
        engine.set_solid_surface(block_hitbox, Direction::Left, false);
        assert!(engine
            .intersecting_solid_objects(state, probe, Some(Direction::Left), ObjectClasses::ANY)
            .is_empty());
        assert_eq!(
            engine.nearest_intersecting_solid_object(state, probe, Some(Direction::Up), ObjectClasses::ANY),
            Some(block)
        );
    }

    #[test]
    fn test_visible_locators_follow_draw_mode() {
        let mut engine = Engine::new();
        let flat = world(&mut engine);
        let over = engine
            .create_state(LevelConfig::new(32.0, 32.0).with_draw_mode(DrawMode::Over))
            .unwrap();

        let low = boxed(&mut engine, flat, 0.0, 20.0, 2.0);
        let high = boxed(&mut engine, flat, 40.0, 0.0, 2.0);
        engine.set_draw_priority(low, 5);
        let region = Bounds::new(-10.0, 50.0, -10.0, 30.0);
        let locator = |engine: &Engine, object: ObjectId| engine.object(object).unwrap().locator();

        assert_eq!(
            engine.visible_locators(flat, &region),
            vec![locator(&engine, high), locator(&engine, low)]
        );

        engine.add_object(over, low);
        engine.add_object(over, high);
        assert_eq!(
            engine.visible_locators(over, &region),
            vec![locator(&engine, high), locator(&engine, low)]
        );
        engine.set_draw_priority(low, -5);
        engine.set_position(locator(&engine, low), LevelVector::new(0.0, -5.0));
        assert_eq!(
            engine.visible_locators(over, &region),
            vec![locator(&engine, low), locator(&engine, high)]
        );
        assert!(engine.visible_locators(flat, &region).is_empty());
    }
}
