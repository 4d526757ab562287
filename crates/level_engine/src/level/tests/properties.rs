//! Randomized narrow-phase properties

use crate::physics::HitboxShape;
use crate::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Primitive {
    Point,
    Circle(f64),
    Line(f64, f64),
    Rectangle(f64, f64, f64, f64),
    Slope(f64, f64, bool, bool),
}

impl Primitive {
    fn shape(&self) -> HitboxShape {
        match *self {
            Primitive::Point => HitboxShape::point(),
            Primitive::Circle(radius) => HitboxShape::circle(radius).unwrap_or_else(|_| HitboxShape::point()),
            Primitive::Line(dx, dy) => HitboxShape::line(LevelVector::new(dx, dy)),
            Primitive::Rectangle(left, width, top, height) => {
                HitboxShape::rectangle(left, left + width, top, top + height).unwrap_or_else(|_| HitboxShape::point())
            }
            Primitive::Slope(dx, dy, above, below) => HitboxShape::slope(LevelVector::new(dx, dy), above, below),
        }
    }
}

fn coordinate() -> impl Strategy<Value = f64> {
    // Whole and half units make touching edges common
    (-40i32..40).prop_map(|half_units| f64::from(half_units) / 2.0)
}

fn primitive() -> impl Strategy<Value = Primitive> {
    prop_oneof![
        Just(Primitive::Point),
        (0u8..12).prop_map(|radius| Primitive::Circle(f64::from(radius))),
        (coordinate(), coordinate()).prop_map(|(dx, dy)| Primitive::Line(dx, dy)),
        (coordinate(), 0u8..16, coordinate(), 0u8..16)
            .prop_map(|(left, width, top, height)| Primitive::Rectangle(left, f64::from(width), top, f64::from(height))),
        (coordinate(), coordinate(), any::<bool>(), any::<bool>())
            .prop_map(|(dx, dy, above, below)| Primitive::Slope(dx, dy, above, below)),
    ]
}

fn placed() -> impl Strategy<Value = (Primitive, f64, f64, i32, bool, bool)> {
    (primitive(), coordinate(), coordinate(), 0i32..8, any::<bool>(), any::<bool>())
}

fn build(engine: &mut Engine, placement: &(Primitive, f64, f64, i32, bool, bool)) -> HitboxId {
    let (primitive, x, y, eighth_turns, x_flip, y_flip) = placement;
    let id = engine.create_hitbox(LevelVector::new(*x, *y), primitive.shape());
    engine.set_angle(id, f64::from(*eighth_turns) * 45.0);
    engine.set_x_flip(id, *x_flip);
    engine.set_y_flip(id, *y_flip);
    id
}

proptest! {
    #[test]
    fn overlap_is_symmetric(a in placed(), b in placed()) {
        let mut engine = Engine::new();
        let first = build(&mut engine, &a);
        let second = build(&mut engine, &b);
        prop_assert_eq!(engine.overlap(first, second), engine.overlap(second, first));
    }

    #[test]
    fn overlap_implies_meeting_bounds(a in placed(), b in placed()) {
        let mut engine = Engine::new();
        let first = build(&mut engine, &a);
        let second = build(&mut engine, &b);
        if engine.overlap(first, second) {
            prop_assert!(engine.bounding_boxes_meet(first, second));
        }
    }

    #[test]
    fn composite_overlap_matches_any_component(a in placed(), b in placed(), probe in placed()) {
        let mut engine = Engine::new();
        let composite = engine.create_hitbox(LevelVector::zeros(), HitboxShape::composite());
        let first = build(&mut engine, &a);
        let second = build(&mut engine, &b);
        let target = build(&mut engine, &probe);
        let expected = engine.overlap(first, target) || engine.overlap(second, target);

        prop_assert!(engine.add_component(composite, 0, first));
        prop_assert!(engine.add_component(composite, 1, second));
        // Components sit at the composite's origin, so nothing moved
        prop_assert_eq!(engine.overlap(composite, target), expected);
        prop_assert_eq!(engine.overlap(target, composite), expected);
    }
}
