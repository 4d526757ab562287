//! Math utilities and types
//!
//! Provides the 2D vector type used for every position, difference and
//! velocity in a level, plus the small set of geometric predicates the
//! narrow phase is built from.
//!
//! Coordinates are screen-oriented: x grows to the right and y grows down.
//! Angles are measured in degrees, counter-clockwise as seen on screen, so a
//! vector of length `l` at angle `a` is `(l cos a, -l sin a)`.

pub use nalgebra::Vector2;

/// 2D vector type used for all level coordinates
pub type LevelVector = Vector2<f64>;

/// Cosine and sine of an angle in degrees.
///
/// Quarter turns are returned exactly so that axis-aligned layouts do not
/// accumulate rounding noise.
pub fn cos_sin_degrees(angle: f64) -> (f64, f64) {
    let angle = normalize_angle(angle);
    if angle == 0.0 {
        (1.0, 0.0)
    } else if angle == 90.0 {
        (0.0, 1.0)
    } else if angle == 180.0 {
        (-1.0, 0.0)
    } else if angle == 270.0 {
        (0.0, -1.0)
    } else {
        let radians = angle.to_radians();
        (radians.cos(), radians.sin())
    }
}

/// Normalize an angle in degrees to the range [0, 360)
pub fn normalize_angle(angle: f64) -> f64 {
    let normalized = angle % 360.0;
    if normalized < 0.0 {
        let wrapped = normalized + 360.0;
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    } else {
        normalized
    }
}

/// Create a vector from a length and an angle in degrees
pub fn polar(length: f64, angle: f64) -> LevelVector {
    let (cos, sin) = cos_sin_degrees(angle);
    LevelVector::new(length * cos, -length * sin)
}

/// Level-specific operations on [`LevelVector`]
pub trait LevelVectorExt {
    /// Angle of this vector in degrees, in [0, 360). The zero vector has angle 0.
    fn angle_degrees(&self) -> f64;

    /// Euclidean length
    fn length(&self) -> f64;

    /// 2D cross product (z component of the 3D cross product)
    fn cross_2d(&self, other: &Self) -> f64;

    /// Rotate in place by an angle in degrees
    fn rotate(&mut self, angle: f64);

    /// Rotated copy
    fn rotated(&self, angle: f64) -> Self;

    /// Negate x and/or y in place
    fn flip(&mut self, x_flip: bool, y_flip: bool);

    /// Flipped copy
    fn flipped(&self, x_flip: bool, y_flip: bool) -> Self;

    /// Keep the length, point in the given direction
    fn set_angle(&mut self, angle: f64);

    /// Keep the direction, scale to the given length
    fn set_length(&mut self, length: f64);

    /// Express a relative vector in the frame `(angle, x_flip, y_flip)`:
    /// flip first, then rotate.
    fn relative_to_frame(&self, angle: f64, x_flip: bool, y_flip: bool) -> Self;
}

impl LevelVectorExt for LevelVector {
    fn angle_degrees(&self) -> f64 {
        if self.x == 0.0 && self.y == 0.0 {
            return 0.0;
        }
        normalize_angle((-self.y).atan2(self.x).to_degrees())
    }

    fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    fn cross_2d(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    fn rotate(&mut self, angle: f64) {
        let (cos, sin) = cos_sin_degrees(angle);
        let x = self.x * cos + self.y * sin;
        let y = self.y * cos - self.x * sin;
        self.x = x;
        self.y = y;
    }

    fn rotated(&self, angle: f64) -> Self {
        let mut rotated = *self;
        rotated.rotate(angle);
        rotated
    }

    fn flip(&mut self, x_flip: bool, y_flip: bool) {
        if x_flip {
            self.x = -self.x;
        }
        if y_flip {
            self.y = -self.y;
        }
    }

    fn flipped(&self, x_flip: bool, y_flip: bool) -> Self {
        let mut flipped = *self;
        flipped.flip(x_flip, y_flip);
        flipped
    }

    fn set_angle(&mut self, angle: f64) {
        *self = polar(self.length(), angle);
    }

    fn set_length(&mut self, length: f64) {
        let current = self.length();
        if current == 0.0 {
            *self = LevelVector::new(length, 0.0);
        } else {
            *self *= length / current;
        }
    }

    fn relative_to_frame(&self, angle: f64, x_flip: bool, y_flip: bool) -> Self {
        let mut v = self.flipped(x_flip, y_flip);
        if angle != 0.0 {
            v.rotate(angle);
        }
        v
    }
}

/// Do the open segments `p1-p2` and `q1-q2` cross?
///
/// Crossings must happen strictly inside both segments (t and u in the open
/// interval (0, 1)). Parallel segments only count when they are collinear
/// and share a stretch of positive length.
pub fn segments_intersect(p1: LevelVector, p2: LevelVector, q1: LevelVector, q2: LevelVector) -> bool {
    let r = p2 - p1;
    let s = q2 - q1;
    let denominator = r.cross_2d(&s);
    let offset = q1 - p1;

    if denominator == 0.0 {
        if offset.cross_2d(&r) != 0.0 {
            return false;
        }
        // Collinear: compare projections onto the longer direction
        let axis = if r.length() >= s.length() { r } else { s };
        let axis_len_sq = axis.dot(&axis);
        if axis_len_sq == 0.0 {
            return false;
        }
        let project = |point: LevelVector| (point - p1).dot(&axis) / axis_len_sq;
        let (a0, a1) = min_max(project(p1), project(p2));
        let (b0, b1) = min_max(project(q1), project(q2));
        return a0.max(b0) < a1.min(b1);
    }

    let t = offset.cross_2d(&s) / denominator;
    let u = offset.cross_2d(&r) / denominator;
    t > 0.0 && t < 1.0 && u > 0.0 && u < 1.0
}

/// Even-odd ray casting point-in-polygon test
pub fn point_in_polygon(point: LevelVector, vertices: &[LevelVector]) -> bool {
    let mut inside = false;
    let count = vertices.len();
    if count < 3 {
        return false;
    }
    let mut j = count - 1;
    for i in 0..count {
        let a = vertices[i];
        let b = vertices[j];
        if (a.y > point.y) != (b.y > point.y) {
            let crossing_x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < crossing_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Closest point on segment `a-b` to `point`
pub fn closest_point_on_segment(point: LevelVector, a: LevelVector, b: LevelVector) -> LevelVector {
    let ab = b - a;
    let len_sq = ab.dot(&ab);
    if len_sq == 0.0 {
        return a;
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Distance from `point` to segment `a-b`
pub fn distance_to_segment(point: LevelVector, a: LevelVector, b: LevelVector) -> f64 {
    (point - closest_point_on_segment(point, a, b)).length()
}

/// Does a closed circle touch a closed axis-aligned rectangle?
///
/// Used as the cheap cell filter for circular queries, so edges count.
pub fn circle_meets_rectangle(
    center: LevelVector,
    radius: f64,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
) -> bool {
    let closest_x = center.x.clamp(left, right);
    let closest_y = center.y.clamp(top, bottom);
    let dx = center.x - closest_x;
    let dy = center.y - closest_y;
    dx * dx + dy * dy <= radius * radius
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
