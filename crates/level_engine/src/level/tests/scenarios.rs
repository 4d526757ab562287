//! Scenario tests across the engine

use crate::physics::HitboxShape;
use crate::prelude::*;
use crate::spatial::{Bucket, CellRange, SpatialIndex};
use approx::assert_relative_eq;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

fn rectangle(engine: &mut Engine, left: f64, top: f64, right: f64, bottom: f64) -> HitboxId {
    let shape = HitboxShape::rectangle(0.0, right - left, 0.0, bottom - top).unwrap();
    engine.create_hitbox(LevelVector::new(left, top), shape)
}

fn placed(engine: &mut Engine, state: StateId, hitbox: HitboxId) -> ObjectId {
    let object = engine.create_object(hitbox).unwrap();
    engine.add_object(state, object);
    object
}

#[test]
fn test_circle_against_rectangle() {
    let mut engine = Engine::new();
    let circle = engine.create_hitbox(LevelVector::zeros(), HitboxShape::circle(5.0).unwrap());
    let rect = rectangle(&mut engine, 10.0, 10.0, 20.0, 20.0);
    assert!(!engine.overlap(circle, rect));
    assert!(!engine.overlap(rect, circle));

    engine.set_rectangle_edges(rect, 0.0, 17.0, 0.0, 17.0).unwrap();
    engine.set_position(rect, LevelVector::new(3.0, 3.0));
    assert_eq!(engine.hitbox(rect).unwrap().bounds(), Bounds::new(3.0, 20.0, 3.0, 20.0));
    assert!(engine.overlap(circle, rect));
    assert!(engine.overlap(rect, circle));
}

#[test]
fn test_cell_range_after_resize() {
    let mut engine = Engine::new();
    let state = engine.create_state(LevelConfig::new(32.0, 32.0)).unwrap();
    let rect = rectangle(&mut engine, 1.0, 1.0, 31.0, 31.0);
    placed(&mut engine, state, rect);
    assert_eq!(engine.hitbox(rect).unwrap().cell_range(), Some(CellRange::new(0, 0, 0, 0)));

    engine.set_rectangle_edges(rect, 0.0, 31.0, 0.0, 31.0).unwrap();
    let range = engine.hitbox(rect).unwrap().cell_range().unwrap();
    assert_eq!(range, CellRange::new(0, 1, 0, 1));
    let grid = engine.state(state).unwrap().grid();
    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        assert_eq!(grid.cell(x, y).map(|cell| cell.len(Bucket::Locator)), Some(1));
    }
    assert_eq!(grid.occupied_cells(), 4);

    // A box resting on the cell boundary also claims the cells before it
    engine.set_position(rect, LevelVector::new(0.0, 0.0));
    assert_eq!(engine.hitbox(rect).unwrap().cell_range(), Some(CellRange::new(-1, 0, -1, 0)));
}

#[test]
fn test_grid_round_trip_reports_each_hitbox_once() {
    let mut engine = Engine::new();
    let state = engine.create_state(LevelConfig::new(16.0, 16.0)).unwrap();
    let mut inserted = HashSet::new();
    for i in 0..12 {
        let x = f64::from(i) * 13.0 - 40.0;
        let y = f64::from(i % 4) * 21.0 - 30.0;
        let size = 5.0 + f64::from(i) * 4.0;
        let hitbox = rectangle(&mut engine, x, y, x + size, y + size);
        placed(&mut engine, state, hitbox);
        inserted.insert(hitbox);
    }

    let grid = engine.state(state).unwrap().grid();
    let range = grid.bounds().unwrap();
    let everything = grid.cell_bounds(range.left, range.top).union(&grid.cell_bounds(range.right, range.bottom));
    let found = grid.query_rect(&everything, &[Bucket::Locator]);
    assert_eq!(found.len(), inserted.len());
    assert_eq!(found.into_iter().collect::<HashSet<_>>(), inserted);
}

#[test]
fn test_same_object_never_intersects_its_own_solid() {
    let mut engine = Engine::new();
    let state = engine.create_default_state().unwrap();
    let locator = rectangle(&mut engine, 0.0, 0.0, 10.0, 10.0);
    let object = engine.create_thinker_object(locator).unwrap();
    let feet = engine.create_hitbox(LevelVector::zeros(), HitboxShape::rectangle(0.0, 10.0, 0.0, 10.0).unwrap());
    engine.set_solid_hitbox(object, Some(locator));
    engine.set_collision_hitbox(object, Some(feet));
    engine.add_object(state, object);

    assert!(engine.overlap(feet, locator));
    assert!(!engine.intersects_solid_hitbox(feet, locator));
    assert!(engine.intersecting_solid_objects(state, feet, None, ObjectClasses::ANY).is_empty());
}

#[test]
fn test_setting_angle_twice_is_idempotent() {
    let mut engine = Engine::new();
    let root = engine.create_hitbox(LevelVector::new(4.0, 4.0), HitboxShape::point());
    let arm = engine.create_hitbox(LevelVector::new(10.0, 0.0), HitboxShape::line(LevelVector::new(3.0, 1.0)));
    let hand = engine.create_hitbox(LevelVector::new(0.0, 5.0), HitboxShape::circle(1.0).unwrap());
    engine.add_child(root, arm);
    engine.add_child(arm, hand);
    engine.set_y_flip(arm, true);

    let snapshot = |engine: &Engine| {
        [root, arm, hand]
            .iter()
            .map(|id| {
                let hitbox = engine.hitbox(*id).unwrap();
                (hitbox.abs_position(), hitbox.abs_angle(), hitbox.abs_x_flip(), hitbox.abs_y_flip(), hitbox.bounds())
            })
            .collect::<Vec<_>>()
    };

    engine.set_angle(root, 37.0);
    let once = snapshot(&engine);
    engine.set_angle(root, 37.0);
    assert_eq!(snapshot(&engine), once);
    assert_relative_eq!(once[2].1, 37.0);
}

#[test]
fn test_add_then_remove_inside_iteration_has_no_effect() {
    let mut engine = Engine::new();
    let state = engine.create_default_state().unwrap();
    let resident_locator = rectangle(&mut engine, 0.0, 0.0, 1.0, 1.0);
    let resident = placed(&mut engine, state, resident_locator);
    let ghost_locator = rectangle(&mut engine, 5.0, 5.0, 6.0, 6.0);
    let ghost = engine.create_object(ghost_locator).unwrap();

    engine.for_each_object(state, ObjectClasses::ANY, |engine, _| {
        assert!(engine.add_object(state, ghost));
        assert!(engine.remove_object(ghost));
    });

    let mut seen = Vec::new();
    engine.for_each_object(state, ObjectClasses::ANY, |_, object| seen.push(object));
    assert_eq!(seen, vec![resident]);
    assert_eq!(engine.object(ghost).unwrap().state(), None);
    assert_eq!(engine.pending_changes(), 0);
}

fn mover(engine: &mut Engine, state: StateId, log: &Rc<RefCell<Vec<ObjectId>>>, y: f64) -> ObjectId {
    let locator = rectangle(engine, 0.0, y, 4.0, y + 4.0);
    let object = engine.create_thinker_object(locator).unwrap();
    engine.set_collision_hitbox(object, Some(locator));
    engine.set_collision_mode(object, CollisionMode::Discrete);
    engine.set_velocity(object, LevelVector::new(2.0, 0.0));
    let log = Rc::clone(log);
    engine.set_collision_check(object, move |_, mover, _, _| {
        log.borrow_mut().push(mover);
        true
    });
    engine.add_object(state, object);
    object
}

#[test]
fn test_movement_follows_priority_then_serial() {
    let mut engine = Engine::new();
    let state = engine.create_state(LevelConfig::new(64.0, 64.0)).unwrap();
    let wall = rectangle(&mut engine, 5.0, -10.0, 20.0, 100.0);
    let wall_object = engine.create_object(wall).unwrap();
    engine.set_solid_hitbox(wall_object, Some(wall));
    engine.add_object(state, wall_object);

    let log = Rc::new(RefCell::new(Vec::new()));
    let b = mover(&mut engine, state, &log, 0.0);
    let a = mover(&mut engine, state, &log, 10.0);
    let c = mover(&mut engine, state, &log, 20.0);
    engine.set_movement_priority(a, 1);
    engine.set_movement_priority(b, 2);
    engine.set_movement_priority(c, 2);

    engine.step(state).unwrap();
    assert_eq!(*log.borrow(), vec![a, b, c]);
    for object in [a, b, c] {
        assert_eq!(
            engine.collisions(object),
            &[Collision {
                object: wall_object,
                direction: Direction::Left
            }]
        );
    }
}

struct LateArrival {
    newcomer: ObjectId,
    seen_during_callback: Rc<RefCell<Vec<Option<ObjectId>>>>,
    added: bool,
}

impl Thinker for LateArrival {
    fn before_movement(&mut self, engine: &mut Engine, state: StateId) {
        if !self.added {
            assert!(engine.add_object(state, self.newcomer));
            self.added = true;
        }
        let nearest = engine.nearest_object(state, LevelVector::new(100.0, 100.0), ObjectClasses::ANY);
        self.seen_during_callback.borrow_mut().push(nearest);
    }
}

#[test]
fn test_object_added_by_callback_appears_next_frame() {
    let mut engine = Engine::new();
    let state = engine.create_default_state().unwrap();
    let resident_locator = rectangle(&mut engine, 0.0, 0.0, 2.0, 2.0);
    let resident = placed(&mut engine, state, resident_locator);
    let newcomer_locator = rectangle(&mut engine, 99.0, 99.0, 101.0, 101.0);
    let newcomer = engine.create_object(newcomer_locator).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    engine.add_thinker(
        state,
        Box::new(LateArrival {
            newcomer,
            seen_during_callback: Rc::clone(&seen),
            added: false,
        }),
    );

    engine.step(state).unwrap();
    assert_eq!(*seen.borrow(), vec![Some(resident)]);
    assert_eq!(engine.nearest_object(state, LevelVector::new(100.0, 100.0), ObjectClasses::ANY), Some(newcomer));

    engine.step(state).unwrap();
    assert_eq!(*seen.borrow(), vec![Some(resident), Some(newcomer)]);
}

#[test]
fn test_thinker_removed_mid_step_is_not_called_again() {
    struct Counter(Rc<RefCell<u32>>);

    impl Thinker for Counter {
        fn before_movement(&mut self, _engine: &mut Engine, _state: StateId) {
            *self.0.borrow_mut() += 1;
        }

        fn after_movement(&mut self, _engine: &mut Engine, _state: StateId) {
            *self.0.borrow_mut() += 10;
        }
    }

    struct Remover(Option<ThinkerId>);

    impl Thinker for Remover {
        fn before_movement(&mut self, engine: &mut Engine, state: StateId) {
            if let Some(target) = self.0.take() {
                assert!(engine.remove_thinker(state, target));
            }
        }
    }

    let mut engine = Engine::new();
    let state = engine.create_default_state().unwrap();
    let calls = Rc::new(RefCell::new(0));
    let remover = engine.add_thinker(state, Box::new(Remover(None))).unwrap();
    let counter = engine.add_thinker(state, Box::new(Counter(Rc::clone(&calls)))).unwrap();
    engine.remove_thinker(state, remover);
    engine.add_thinker(state, Box::new(Remover(Some(counter))));

    engine.step(state).unwrap();
    // The after-movement hook of the removed thinker is skipped
    assert_eq!(*calls.borrow(), 1);
    engine.step(state).unwrap();
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(engine.state(state).unwrap().thinker_count(), 1);
}

#[test]
fn test_composite_overlap_is_symmetric() {
    let mut engine = Engine::new();
    let composite = engine.create_hitbox(LevelVector::new(50.0, 50.0), HitboxShape::composite());
    let body = engine.create_hitbox(LevelVector::zeros(), HitboxShape::rectangle(-5.0, 5.0, -5.0, 5.0).unwrap());
    let head = engine.create_hitbox(LevelVector::new(0.0, -10.0), HitboxShape::circle(3.0).unwrap());
    assert!(engine.add_component(composite, 0, body));
    assert!(engine.add_component(composite, 1, head));
    assert_eq!(engine.hitbox(composite).unwrap().bounds(), Bounds::new(45.0, 55.0, 37.0, 55.0));

    let beam = engine.create_hitbox(LevelVector::new(40.0, 40.0), HitboxShape::line(LevelVector::new(20.0, 0.0)));
    let pellet = engine.create_hitbox(LevelVector::new(54.0, 38.5), HitboxShape::point());
    let probes = [beam, pellet];
    for probe in probes {
        assert_eq!(engine.overlap(composite, probe), engine.overlap(probe, composite));
    }
    assert!(engine.overlap(composite, beam));
    assert!(!engine.overlap(pellet, composite));

    engine.set_angle(composite, 180.0);
    assert_eq!(engine.hitbox(head).unwrap().abs_position(), LevelVector::new(50.0, 60.0));
    assert!(!engine.overlap(beam, composite));
    assert!(!engine.overlap(composite, beam));
}
