//! Narrow-phase overlap tests
//!
//! Every exact test treats shapes as open regions: touching edges do not
//! overlap. The bounding-box pre-filter is inclusive. Each pair of geometry
//! kinds has one test, and the dispatcher calls it with swapped arguments
//! for the mirrored pair so `overlap(a, b) == overlap(b, a)` holds by
//! construction.

use super::shape::{Bounds, Geometry};
use crate::engine::Engine;
use crate::foundation::collections::HitboxId;
use crate::foundation::math::{
    distance_to_segment, point_in_polygon, segments_intersect, LevelVector, LevelVectorExt,
};

/// Exact overlap of two primitive geometries
pub fn geometries_overlap(a: &Geometry, b: &Geometry) -> bool {
    use Geometry::*;
    match (a, b) {
        (Point(_), Point(_)) => false,
        (Point(p), Circle { center, radius }) | (Circle { center, radius }, Point(p)) => {
            (p - center).length() < *radius
        }
        (Point(p), Segment(s1, s2)) | (Segment(s1, s2), Point(p)) => point_on_segment(*p, *s1, *s2),
        (Point(p), Rect(r)) | (Rect(r), Point(p)) => point_in_rect(*p, r),
        (Point(p), Triangle(t)) | (Triangle(t), Point(p)) => point_in_triangle(*p, t),

        (Circle { center: c1, radius: r1 }, Circle { center: c2, radius: r2 }) => (c1 - c2).length() < r1 + r2,
        (Circle { center, radius }, Segment(s1, s2)) | (Segment(s1, s2), Circle { center, radius }) => {
            distance_to_segment(*center, *s1, *s2) < *radius
        }
        (Circle { center, radius }, Rect(r)) | (Rect(r), Circle { center, radius }) => {
            circle_overlaps_rect(*center, *radius, r)
        }
        (Circle { center, radius }, Triangle(t)) | (Triangle(t), Circle { center, radius }) => {
            circle_overlaps_polygon(*center, *radius, t)
        }

        (Segment(a1, a2), Segment(b1, b2)) => segments_intersect(*a1, *a2, *b1, *b2),
        (Segment(s1, s2), Rect(r)) | (Rect(r), Segment(s1, s2)) => segment_overlaps_rect(*s1, *s2, r),
        (Segment(s1, s2), Triangle(t)) | (Triangle(t), Segment(s1, s2)) => segment_overlaps_polygon(*s1, *s2, t),

        (Rect(r1), Rect(r2)) => rects_overlap(r1, r2),
        (Rect(r), Triangle(t)) | (Triangle(t), Rect(r)) => polygons_overlap(&r.corners(), t),
        (Triangle(t1), Triangle(t2)) => polygons_overlap(t1, t2),
    }
}

fn point_on_segment(point: LevelVector, a: LevelVector, b: LevelVector) -> bool {
    let ab = b - a;
    if (point - a).cross_2d(&ab) != 0.0 {
        return false;
    }
    let t = (point - a).dot(&ab) / ab.dot(&ab);
    t > 0.0 && t < 1.0
}

fn point_in_rect(point: LevelVector, rect: &Bounds) -> bool {
    point.x > rect.left && point.x < rect.right && point.y > rect.top && point.y < rect.bottom
}

fn point_in_triangle(point: LevelVector, triangle: &[LevelVector; 3]) -> bool {
    let on_edge = (0..3).any(|i| distance_to_segment(point, triangle[i], triangle[(i + 1) % 3]) == 0.0);
    !on_edge && point_in_polygon(point, triangle)
}

fn circle_overlaps_rect(center: LevelVector, radius: f64, rect: &Bounds) -> bool {
    let closest = LevelVector::new(center.x.clamp(rect.left, rect.right), center.y.clamp(rect.top, rect.bottom));
    (center - closest).length() < radius
}

fn circle_overlaps_polygon(center: LevelVector, radius: f64, vertices: &[LevelVector]) -> bool {
    if point_in_polygon(center, vertices) {
        return true;
    }
    let count = vertices.len();
    (0..count).any(|i| distance_to_segment(center, vertices[i], vertices[(i + 1) % count]) < radius)
}

fn rects_overlap(a: &Bounds, b: &Bounds) -> bool {
    a.left < b.right && b.left < a.right && a.top < b.bottom && b.top < a.bottom
}

/// Liang-Barsky clip of the segment against the open rectangle
fn segment_overlaps_rect(a: LevelVector, b: LevelVector, rect: &Bounds) -> bool {
    let d = b - a;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let checks = [
        (-d.x, a.x - rect.left),
        (d.x, rect.right - a.x),
        (-d.y, a.y - rect.top),
        (d.y, rect.bottom - a.y),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q <= 0.0 {
                return false;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 >= t1 {
            return false;
        }
    }
    t0 < t1
}

/// Cyrus-Beck clip of the segment against the open convex polygon
fn segment_overlaps_polygon(a: LevelVector, b: LevelVector, vertices: &[LevelVector]) -> bool {
    let d = b - a;
    let count = vertices.len();
    let orientation = signed_area(vertices);
    if orientation == 0.0 {
        return false;
    }
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for i in 0..count {
        let start = vertices[i];
        let edge = vertices[(i + 1) % count] - start;
        let normal = if orientation > 0.0 {
            LevelVector::new(edge.y, -edge.x)
        } else {
            LevelVector::new(-edge.y, edge.x)
        };
        // Inside means normal . (P(t) - start) < 0
        let numerator = normal.dot(&(a - start));
        let denominator = normal.dot(&d);
        if denominator == 0.0 {
            if numerator >= 0.0 {
                return false;
            }
            continue;
        }
        let t = -numerator / denominator;
        if denominator < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 >= t1 {
            return false;
        }
    }
    t0 < t1
}

/// Separating axis test between convex polygons; touching counts as separated
fn polygons_overlap(a: &[LevelVector], b: &[LevelVector]) -> bool {
    for polygon in [a, b] {
        let count = polygon.len();
        for i in 0..count {
            let edge = polygon[(i + 1) % count] - polygon[i];
            let axis = LevelVector::new(-edge.y, edge.x);
            if axis.x == 0.0 && axis.y == 0.0 {
                continue;
            }
            let (a_min, a_max) = project(a, &axis);
            let (b_min, b_max) = project(b, &axis);
            if a_max <= b_min || b_max <= a_min {
                return false;
            }
        }
    }
    true
}

fn project(vertices: &[LevelVector], axis: &LevelVector) -> (f64, f64) {
    vertices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), vertex| {
        let projection = vertex.dot(axis);
        (min.min(projection), max.max(projection))
    })
}

fn signed_area(vertices: &[LevelVector]) -> f64 {
    let count = vertices.len();
    (0..count)
        .map(|i| vertices[i].cross_2d(&vertices[(i + 1) % count]))
        .sum::<f64>()
        / 2.0
}

impl Engine {
    /// Do two hitboxes overlap?
    ///
    /// False for a hitbox against itself and for hitboxes in two different
    /// worlds. Composites overlap when any component does.
    pub fn overlap(&self, a: HitboxId, b: HitboxId) -> bool {
        if a == b {
            return false;
        }
        let (Some(first), Some(second)) = (self.hitboxes.get(a), self.hitboxes.get(b)) else {
            return false;
        };
        if let (Some(first_state), Some(second_state)) = (first.state, second.state) {
            if first_state != second_state {
                return false;
            }
        }
        self.shapes_overlap(a, b)
    }

    /// Does a collision hitbox run into a solid hitbox?
    ///
    /// Like [`overlap`](Self::overlap), but two hitboxes of the same object
    /// never intersect.
    pub fn intersects_solid_hitbox(&self, collision: HitboxId, solid: HitboxId) -> bool {
        let (Some(first), Some(second)) = (self.hitboxes.get(collision), self.hitboxes.get(solid)) else {
            return false;
        };
        if first.object.is_some() && first.object == second.object {
            return false;
        }
        self.overlap(collision, solid)
    }

    /// Do the closed bounding boxes of two hitboxes meet?
    pub fn bounding_boxes_meet(&self, a: HitboxId, b: HitboxId) -> bool {
        match (self.hitboxes.get(a), self.hitboxes.get(b)) {
            (Some(first), Some(second)) => first.bounds.meets(&second.bounds),
            _ => false,
        }
    }

    /// Shape-only test: bounding-box reject, then composite recursion or
    /// the exact primitive test. A composite's component never overlaps the
    /// composite itself.
    fn shapes_overlap(&self, a: HitboxId, b: HitboxId) -> bool {
        let (Some(first), Some(second)) = (self.hitboxes.get(a), self.hitboxes.get(b)) else {
            return false;
        };
        if !first.bounds.meets(&second.bounds) {
            return false;
        }
        match (first.geometry(), second.geometry()) {
            (Some(g1), Some(g2)) => geometries_overlap(&g1, &g2),
            (None, _) => self
                .components(a)
                .into_iter()
                .filter(|&component| component != b)
                .any(|component| self.shapes_overlap(component, b)),
            (_, None) => self
                .components(b)
                .into_iter()
                .filter(|&component| component != a)
                .any(|component| self.shapes_overlap(a, component)),
        }
    }

    pub(crate) fn components(&self, composite: HitboxId) -> Vec<HitboxId> {
        match self.hitboxes.get(composite).map(|hitbox| &hitbox.shape) {
            Some(super::HitboxShape::Composite { components }) => components.values().copied().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> LevelVector {
        LevelVector::new(x, y)
    }

    fn rect(left: f64, right: f64, top: f64, bottom: f64) -> Geometry {
        Geometry::Rect(Bounds::new(left, right, top, bottom))
    }

    fn circle(x: f64, y: f64, radius: f64) -> Geometry {
        Geometry::Circle { center: v(x, y), radius }
    }

    fn both_ways(a: Geometry, b: Geometry) -> bool {
        let forward = geometries_overlap(&a, &b);
        assert_eq!(forward, geometries_overlap(&b, &a), "asymmetric result for {a:?} / {b:?}");
        forward
    }

    #[test]
    fn test_points_never_overlap_points() {
        assert!(!both_ways(Geometry::Point(v(1.0, 1.0)), Geometry::Point(v(1.0, 1.0))));
    }

    #[test]
    fn test_point_against_regions_is_strict() {
        let square = rect(0.0, 10.0, 0.0, 10.0);
        assert!(both_ways(Geometry::Point(v(5.0, 5.0)), square));
        assert!(!both_ways(Geometry::Point(v(10.0, 5.0)), square));
        assert!(both_ways(Geometry::Point(v(3.0, 0.0)), circle(0.0, 0.0, 5.0)));
        assert!(!both_ways(Geometry::Point(v(5.0, 0.0)), circle(0.0, 0.0, 5.0)));
        assert!(both_ways(Geometry::Point(v(1.0, 1.0)), Geometry::Segment(v(0.0, 0.0), v(2.0, 2.0))));
        assert!(!both_ways(Geometry::Point(v(2.0, 2.0)), Geometry::Segment(v(0.0, 0.0), v(2.0, 2.0))));
    }

    #[test]
    fn test_circles() {
        assert!(both_ways(circle(0.0, 0.0, 5.0), circle(9.0, 0.0, 5.0)));
        assert!(!both_ways(circle(0.0, 0.0, 5.0), circle(10.0, 0.0, 5.0)));
        assert!(both_ways(circle(0.0, 0.0, 5.0), Geometry::Segment(v(-10.0, 4.0), v(10.0, 4.0))));
        assert!(!both_ways(circle(0.0, 0.0, 5.0), Geometry::Segment(v(-10.0, 5.0), v(10.0, 5.0))));
    }

    #[test]
    fn test_circle_against_rectangle() {
        assert!(!both_ways(circle(0.0, 0.0, 5.0), rect(10.0, 20.0, 10.0, 20.0)));
        assert!(both_ways(circle(0.0, 0.0, 5.0), rect(3.0, 20.0, 3.0, 20.0)));
        // Center inside
        assert!(both_ways(circle(15.0, 15.0, 1.0), rect(10.0, 20.0, 10.0, 20.0)));
        // Tangent to an edge
        assert!(!both_ways(circle(0.0, 0.0, 5.0), rect(5.0, 20.0, -5.0, 5.0)));
    }

    #[test]
    fn test_segment_against_rectangle() {
        let square = rect(0.0, 10.0, 0.0, 10.0);
        assert!(both_ways(Geometry::Segment(v(-5.0, 5.0), v(15.0, 5.0)), square));
        // Running along an edge
        assert!(!both_ways(Geometry::Segment(v(-5.0, 0.0), v(15.0, 0.0)), square));
        // Through a corner only
        assert!(!both_ways(Geometry::Segment(v(-5.0, 5.0), v(5.0, -5.0)), square));
        // Ending on the boundary
        assert!(!both_ways(Geometry::Segment(v(-5.0, 5.0), v(0.0, 5.0)), square));
        // Fully inside
        assert!(both_ways(Geometry::Segment(v(2.0, 2.0), v(3.0, 3.0)), square));
    }

    #[test]
    fn test_rectangles_need_shared_interior() {
        assert!(both_ways(rect(0.0, 10.0, 0.0, 10.0), rect(5.0, 15.0, 5.0, 15.0)));
        assert!(!both_ways(rect(0.0, 10.0, 0.0, 10.0), rect(10.0, 15.0, 0.0, 10.0)));
    }

    #[test]
    fn test_triangle_pairs() {
        let ramp = Geometry::Triangle([v(0.0, 10.0), v(10.0, 0.0), v(10.0, 10.0)]);
        assert!(both_ways(Geometry::Point(v(8.0, 8.0)), ramp));
        assert!(!both_ways(Geometry::Point(v(2.0, 2.0)), ramp));
        assert!(!both_ways(Geometry::Point(v(5.0, 5.0)), ramp));
        assert!(both_ways(rect(6.0, 8.0, 6.0, 8.0), ramp));
        assert!(!both_ways(rect(0.0, 4.0, 0.0, 4.0), ramp));
        // Sharing the hypotenuse only
        let mirror = Geometry::Triangle([v(0.0, 10.0), v(10.0, 0.0), v(0.0, 0.0)]);
        assert!(!both_ways(mirror, ramp));
        assert!(both_ways(Geometry::Segment(v(0.0, 0.0), v(10.0, 10.0)), ramp));
        assert!(!both_ways(Geometry::Segment(v(0.0, 10.0), v(10.0, 0.0)), ramp));
        assert!(both_ways(circle(4.0, 4.0, 2.0), ramp));
        assert!(!both_ways(circle(2.0, 2.0, 2.0), ramp));
    }

    #[test]
    fn test_composite_does_not_overlap_its_own_components() {
        use crate::physics::HitboxShape;

        let mut engine = Engine::new();
        let composite = engine.create_hitbox(v(0.0, 0.0), HitboxShape::composite());
        let body = engine.create_hitbox(v(0.0, 0.0), HitboxShape::circle(2.0).unwrap());
        let wing = engine.create_hitbox(v(10.0, 0.0), HitboxShape::rectangle(-2.0, 2.0, -2.0, 2.0).unwrap());
        let inner = engine.create_hitbox(v(0.0, 0.0), HitboxShape::composite());
        let tail = engine.create_hitbox(v(-10.0, 0.0), HitboxShape::circle(1.0).unwrap());
        assert!(engine.add_component(composite, 0, body));
        assert!(engine.add_component(composite, 1, wing));
        assert!(engine.add_component(inner, 0, tail));
        assert!(engine.add_component(composite, 2, inner));

        for part in [body, wing, inner, tail] {
            assert!(!engine.overlap(composite, part));
            assert!(!engine.overlap(part, composite));
        }

        let stranger = engine.create_hitbox(v(10.0, 0.0), HitboxShape::point());
        assert!(engine.overlap(composite, stranger));
    }
}
