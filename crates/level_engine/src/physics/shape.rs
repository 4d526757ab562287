//! Hitbox shape variants
//!
//! A shape stores its relative description (what the caller set) together
//! with the absolute form derived from the owning hitbox's transform.
//! Lines rotate and flip with their hitbox; rectangles and slopes are
//! axis-aligned and only respond to flips.

use crate::engine::EngineError;
use crate::foundation::collections::HitboxId;
use crate::foundation::math::{LevelVector, LevelVectorExt};
use std::collections::BTreeMap;

/// Axis-aligned bounding box in level coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest x
    pub left: f64,
    /// Largest x
    pub right: f64,
    /// Smallest y (top of the screen)
    pub top: f64,
    /// Largest y
    pub bottom: f64,
}

impl Bounds {
    /// Create bounds from edges
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self { left, right, top, bottom }
    }

    /// Zero-size bounds at a point
    pub fn point(position: LevelVector) -> Self {
        Self::new(position.x, position.x, position.y, position.y)
    }

    /// Smallest bounds containing both points
    pub fn spanning(a: LevelVector, b: LevelVector) -> Self {
        Self::new(a.x.min(b.x), a.x.max(b.x), a.y.min(b.y), a.y.max(b.y))
    }

    /// Smallest bounds containing both boxes
    pub fn union(&self, other: &Bounds) -> Self {
        Self::new(
            self.left.min(other.left),
            self.right.max(other.right),
            self.top.min(other.top),
            self.bottom.max(other.bottom),
        )
    }

    /// Do the closed boxes touch or intersect?
    pub fn meets(&self, other: &Bounds) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }

    /// Is the point inside the closed box?
    pub fn contains(&self, point: LevelVector) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    /// Midpoint of the box
    pub fn center(&self) -> LevelVector {
        LevelVector::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Width of the box
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Height of the box
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Corners in winding order starting top-left
    pub fn corners(&self) -> [LevelVector; 4] {
        [
            LevelVector::new(self.left, self.top),
            LevelVector::new(self.right, self.top),
            LevelVector::new(self.right, self.bottom),
            LevelVector::new(self.left, self.bottom),
        ]
    }
}

/// Rectangle offsets from a hitbox's position.
///
/// Always satisfies `left <= right` and `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edges {
    /// Offset of the left edge
    pub left: f64,
    /// Offset of the right edge
    pub right: f64,
    /// Offset of the top edge
    pub top: f64,
    /// Offset of the bottom edge
    pub bottom: f64,
}

impl Edges {
    /// Validate and create edge offsets
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Result<Self, EngineError> {
        if !(left <= right && top <= bottom) {
            return Err(EngineError::InvalidRectangle { left, right, top, bottom });
        }
        Ok(Self { left, right, top, bottom })
    }

    /// Offsets as seen after flipping: each flipped axis swaps sides and signs
    pub fn flipped(&self, x_flip: bool, y_flip: bool) -> Self {
        let (left, right) = if x_flip { (-self.right, -self.left) } else { (self.left, self.right) };
        let (top, bottom) = if y_flip { (-self.bottom, -self.top) } else { (self.top, self.bottom) };
        Self { left, right, top, bottom }
    }
}

/// Shape of a hitbox
#[derive(Debug, Clone, PartialEq)]
pub enum HitboxShape {
    /// A single point
    Point,

    /// A circle around the hitbox position
    Circle {
        /// Radius, never negative
        radius: f64,
    },

    /// A segment from the hitbox position to position + difference
    Line {
        /// Difference as set, before the hitbox transform
        rel_difference: LevelVector,
        /// Difference after the hitbox's flip and rotation
        abs_difference: LevelVector,
    },

    /// An axis-aligned rectangle given by edge offsets
    Rectangle {
        /// Offsets as set
        rel: Edges,
        /// Offsets after the hitbox's flips
        abs: Edges,
    },

    /// An axis-aligned ramp: a directed segment plus the side that is filled
    Slope {
        /// Difference as set
        rel_difference: LevelVector,
        /// Difference after the hitbox's flips
        abs_difference: LevelVector,
        /// Region above the segment (smaller y) is filled
        present_above: bool,
        /// Region below the segment (greater y) is filled
        present_below: bool,
    },

    /// A group of component hitboxes keyed by integer
    Composite {
        /// Components; each one is also a child of the composite
        components: BTreeMap<i32, HitboxId>,
    },
}

impl HitboxShape {
    /// A point
    pub fn point() -> Self {
        HitboxShape::Point
    }

    /// A circle; fails for negative or NaN radii
    pub fn circle(radius: f64) -> Result<Self, EngineError> {
        validate_radius(radius)?;
        Ok(HitboxShape::Circle { radius })
    }

    /// A segment from the hitbox position along `difference`
    pub fn line(difference: LevelVector) -> Self {
        HitboxShape::Line {
            rel_difference: difference,
            abs_difference: difference,
        }
    }

    /// A rectangle given by edge offsets from the hitbox position
    pub fn rectangle(left: f64, right: f64, top: f64, bottom: f64) -> Result<Self, EngineError> {
        let edges = Edges::new(left, right, top, bottom)?;
        Ok(HitboxShape::Rectangle { rel: edges, abs: edges })
    }

    /// A slope along `difference`, filled above and/or below the segment
    pub fn slope(difference: LevelVector, present_above: bool, present_below: bool) -> Self {
        HitboxShape::Slope {
            rel_difference: difference,
            abs_difference: difference,
            present_above,
            present_below,
        }
    }

    /// An empty composite
    pub fn composite() -> Self {
        HitboxShape::Composite {
            components: BTreeMap::new(),
        }
    }

    /// Name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            HitboxShape::Point => "point",
            HitboxShape::Circle { .. } => "circle",
            HitboxShape::Line { .. } => "line",
            HitboxShape::Rectangle { .. } => "rectangle",
            HitboxShape::Slope { .. } => "slope",
            HitboxShape::Composite { .. } => "composite",
        }
    }

    /// Re-derive the absolute form from the hitbox's absolute transform
    pub(crate) fn update_absolute(&mut self, angle: f64, x_flip: bool, y_flip: bool) {
        match self {
            HitboxShape::Line {
                rel_difference,
                abs_difference,
            } => *abs_difference = rel_difference.relative_to_frame(angle, x_flip, y_flip),
            HitboxShape::Rectangle { rel, abs } => *abs = rel.flipped(x_flip, y_flip),
            HitboxShape::Slope {
                rel_difference,
                abs_difference,
                ..
            } => *abs_difference = rel_difference.flipped(x_flip, y_flip),
            HitboxShape::Point | HitboxShape::Circle { .. } | HitboxShape::Composite { .. } => {}
        }
    }

    /// Bounding box at `position`. Composites return `None`; their box is
    /// the union of their components.
    pub(crate) fn bounds_at(&self, position: LevelVector) -> Option<Bounds> {
        match self {
            HitboxShape::Point => Some(Bounds::point(position)),
            HitboxShape::Circle { radius } => Some(Bounds::new(
                position.x - radius,
                position.x + radius,
                position.y - radius,
                position.y + radius,
            )),
            HitboxShape::Line { abs_difference, .. } | HitboxShape::Slope { abs_difference, .. } => {
                Some(Bounds::spanning(position, position + abs_difference))
            }
            HitboxShape::Rectangle { abs, .. } => Some(Bounds::new(
                position.x + abs.left,
                position.x + abs.right,
                position.y + abs.top,
                position.y + abs.bottom,
            )),
            HitboxShape::Composite { .. } => None,
        }
    }
}

pub(crate) fn validate_radius(radius: f64) -> Result<(), EngineError> {
    if radius >= 0.0 && radius.is_finite() {
        Ok(())
    } else {
        Err(EngineError::InvalidRadius(radius))
    }
}

/// Absolute geometry of a primitive hitbox, as used by the narrow phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// A point
    Point(LevelVector),
    /// A circle with positive radius
    Circle {
        /// Center
        center: LevelVector,
        /// Radius
        radius: f64,
    },
    /// A segment between two points
    Segment(LevelVector, LevelVector),
    /// An axis-aligned rectangle
    Rect(Bounds),
    /// A triangle; only produced by slopes
    Triangle([LevelVector; 3]),
}

impl Geometry {
    /// Build the geometry of a slope.
    ///
    /// No filled side gives the bare segment. An axis-parallel segment, or
    /// one filled on both sides, gives its bounding rectangle. Anything else
    /// is the triangle between the segment and the bounding-box corner on
    /// the filled side.
    pub fn slope(start: LevelVector, difference: LevelVector, above: bool, below: bool) -> Self {
        let end = start + difference;
        if !above && !below {
            return Geometry::Segment(start, end);
        }
        if difference.x == 0.0 || difference.y == 0.0 || (above && below) {
            return Geometry::Rect(Bounds::spanning(start, end));
        }
        // The two bounding-box corners off the diagonal
        let first = LevelVector::new(start.x, end.y);
        let second = LevelVector::new(end.x, start.y);
        let (upper, lower) = if first.y < second.y { (first, second) } else { (second, first) };
        let corner = if above { upper } else { lower };
        Geometry::Triangle([start, end, corner])
    }
}

/// Slope of a directed segment: change in y per unit of x, in level
/// coordinates (y down). Vertical segments return infinity.
pub fn slope_value(difference: LevelVector) -> f64 {
    if difference.x == 0.0 {
        f64::INFINITY
    } else {
        difference.y / difference.x
    }
}

/// y of the segment `start..start+difference` at `x`, clamped to its ends
pub fn y_at_x(start: LevelVector, difference: LevelVector, x: f64) -> f64 {
    if difference.x == 0.0 {
        return start.y.min(start.y + difference.y);
    }
    let t = ((x - start.x) / difference.x).clamp(0.0, 1.0);
    start.y + difference.y * t
}

/// x of the segment `start..start+difference` at `y`, clamped to its ends
pub fn x_at_y(start: LevelVector, difference: LevelVector, y: f64) -> f64 {
    if difference.y == 0.0 {
        return start.x.min(start.x + difference.x);
    }
    let t = ((y - start.y) / difference.y).clamp(0.0, 1.0);
    start.x + difference.x * t
}
