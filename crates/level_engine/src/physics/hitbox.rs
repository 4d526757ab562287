//! The hitbox record stored in the engine's hitbox arena
//!
//! A hitbox keeps both its relative transform (as set by the caller) and the
//! absolute transform derived from its parent chain. The engine keeps the
//! absolute values, the cached bounds and the grid registration in sync; see
//! `physics::transform` and `physics::hierarchy`.

use super::roles::{Direction, Directions, HitboxRoles};
use super::shape::{slope_value, x_at_y, y_at_x, Bounds, Geometry, HitboxShape};
use crate::foundation::collections::{HitboxId, ObjectId, StateId};
use crate::foundation::math::{normalize_angle, LevelVector, LevelVectorExt};
use crate::spatial::CellRange;

/// Absolute transform of a parent, handed down to its children
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Frame {
    pub position: LevelVector,
    pub angle: f64,
    pub x_flip: bool,
    pub y_flip: bool,
}

/// A positioned, oriented shape
#[derive(Debug, Clone)]
pub struct Hitbox {
    pub(crate) serial: u64,
    pub(crate) shape: HitboxShape,

    pub(crate) rel_position: LevelVector,
    pub(crate) abs_position: LevelVector,
    pub(crate) rel_angle: f64,
    pub(crate) abs_angle: f64,
    pub(crate) rel_x_flip: bool,
    pub(crate) rel_y_flip: bool,
    pub(crate) abs_x_flip: bool,
    pub(crate) abs_y_flip: bool,

    pub(crate) parent: Option<HitboxId>,
    pub(crate) children: Vec<HitboxId>,
    pub(crate) component_of: Option<HitboxId>,
    pub(crate) object: Option<ObjectId>,
    pub(crate) state: Option<StateId>,

    pub(crate) roles: HitboxRoles,
    pub(crate) cell_range: Option<CellRange>,
    pub(crate) cell_roles: HitboxRoles,
    pub(crate) solid_surfaces: Directions,

    pub(crate) bounds: Bounds,
}

impl Hitbox {
    pub(crate) fn new(serial: u64, position: LevelVector, shape: HitboxShape) -> Self {
        Self {
            serial,
            shape,
            rel_position: position,
            abs_position: position,
            rel_angle: 0.0,
            abs_angle: 0.0,
            rel_x_flip: false,
            rel_y_flip: false,
            abs_x_flip: false,
            abs_y_flip: false,
            parent: None,
            children: Vec::new(),
            component_of: None,
            object: None,
            state: None,
            roles: HitboxRoles::empty(),
            cell_range: None,
            cell_roles: HitboxRoles::empty(),
            solid_surfaces: Directions::all(),
            bounds: Bounds::point(position),
        }
    }

    /// Recompute the absolute transform from the parent's, or from the
    /// relative values when there is no parent
    pub(crate) fn update_absolute(&mut self, parent: Option<Frame>) {
        match parent {
            Some(frame) => {
                let mut angle = self.rel_angle;
                if frame.x_flip {
                    angle = 180.0 - angle;
                }
                if frame.y_flip {
                    angle = 360.0 - angle;
                }
                self.abs_angle = normalize_angle(frame.angle + angle);
                self.abs_x_flip = frame.x_flip != self.rel_x_flip;
                self.abs_y_flip = frame.y_flip != self.rel_y_flip;
                self.abs_position =
                    frame.position + self.rel_position.relative_to_frame(frame.angle, frame.x_flip, frame.y_flip);
            }
            None => {
                self.abs_angle = self.rel_angle;
                self.abs_x_flip = self.rel_x_flip;
                self.abs_y_flip = self.rel_y_flip;
                self.abs_position = self.rel_position;
            }
        }
        self.shape.update_absolute(self.abs_angle, self.abs_x_flip, self.abs_y_flip);
    }

    pub(crate) fn frame(&self) -> Frame {
        Frame {
            position: self.abs_position,
            angle: self.abs_angle,
            x_flip: self.abs_x_flip,
            y_flip: self.abs_y_flip,
        }
    }

    /// Creation serial; unique and increasing
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// The shape
    pub fn shape(&self) -> &HitboxShape {
        &self.shape
    }

    /// Position relative to the parent
    pub fn rel_position(&self) -> LevelVector {
        self.rel_position
    }

    /// Absolute position
    pub fn abs_position(&self) -> LevelVector {
        self.abs_position
    }

    /// Angle relative to the parent, in [0, 360)
    pub fn rel_angle(&self) -> f64 {
        self.rel_angle
    }

    /// Absolute angle, in [0, 360)
    pub fn abs_angle(&self) -> f64 {
        self.abs_angle
    }

    /// Relative x flip
    pub fn rel_x_flip(&self) -> bool {
        self.rel_x_flip
    }

    /// Relative y flip
    pub fn rel_y_flip(&self) -> bool {
        self.rel_y_flip
    }

    /// Absolute x flip
    pub fn abs_x_flip(&self) -> bool {
        self.abs_x_flip
    }

    /// Absolute y flip
    pub fn abs_y_flip(&self) -> bool {
        self.abs_y_flip
    }

    /// Parent hitbox
    pub fn parent(&self) -> Option<HitboxId> {
        self.parent
    }

    /// Child hitboxes in attachment order
    pub fn children(&self) -> &[HitboxId] {
        &self.children
    }

    /// Composite this hitbox is a component of
    pub fn component_of(&self) -> Option<HitboxId> {
        self.component_of
    }

    /// Owning object
    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    /// World of the owning object
    pub fn state(&self) -> Option<StateId> {
        self.state
    }

    /// Roles this hitbox serves
    pub fn roles(&self) -> HitboxRoles {
        self.roles
    }

    /// Number of roles this hitbox serves
    pub fn num_roles(&self) -> u32 {
        self.roles.count()
    }

    /// Grid cells currently occupied, if registered
    pub fn cell_range(&self) -> Option<CellRange> {
        self.cell_range
    }

    /// Number of roles this hitbox is registered in the grid under
    pub fn num_cell_roles(&self) -> u32 {
        self.cell_roles.count()
    }

    /// Solid surface directions
    pub fn solid_surfaces(&self) -> Directions {
        self.solid_surfaces
    }

    /// Is the given side solid?
    pub fn is_solid_surface(&self, direction: Direction) -> bool {
        self.solid_surfaces.has(direction)
    }

    /// Absolute bounding box
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Left edge of the bounding box
    pub fn left_edge(&self) -> f64 {
        self.bounds.left
    }

    /// Right edge of the bounding box
    pub fn right_edge(&self) -> f64 {
        self.bounds.right
    }

    /// Top edge of the bounding box
    pub fn top_edge(&self) -> f64 {
        self.bounds.top
    }

    /// Bottom edge of the bounding box
    pub fn bottom_edge(&self) -> f64 {
        self.bounds.bottom
    }

    /// Center of the bounding box
    pub fn center(&self) -> LevelVector {
        self.bounds.center()
    }

    /// Area the grid files this hitbox under: the bounding box grown to
    /// take in the absolute position
    pub(crate) fn filing_bounds(&self) -> Bounds {
        self.bounds.union(&Bounds::point(self.abs_position))
    }

    /// Radius, for circles
    pub fn radius(&self) -> Option<f64> {
        match self.shape {
            HitboxShape::Circle { radius } => Some(radius),
            _ => None,
        }
    }

    /// Component stored under `key`, for composites
    pub fn component(&self, key: i32) -> Option<HitboxId> {
        match &self.shape {
            HitboxShape::Composite { components } => components.get(&key).copied(),
            _ => None,
        }
    }

    /// Absolute endpoints, for lines and slopes
    pub fn endpoints(&self) -> Option<(LevelVector, LevelVector)> {
        match &self.shape {
            HitboxShape::Line { abs_difference, .. } | HitboxShape::Slope { abs_difference, .. } => {
                Some((self.abs_position, self.abs_position + abs_difference))
            }
            _ => None,
        }
    }

    /// Filled sides of a slope after flips, as `(above, below)`
    pub fn slope_presence(&self) -> Option<(bool, bool)> {
        match self.shape {
            HitboxShape::Slope {
                present_above,
                present_below,
                ..
            } => {
                if self.abs_y_flip {
                    Some((present_below, present_above))
                } else {
                    Some((present_above, present_below))
                }
            }
            _ => None,
        }
    }

    /// Rise per unit of run, for slopes
    pub fn slope_value(&self) -> Option<f64> {
        match &self.shape {
            HitboxShape::Slope { abs_difference, .. } => Some(slope_value(*abs_difference)),
            _ => None,
        }
    }

    /// y of the slope at `x`, clamped to the segment ends
    pub fn y_at_x(&self, x: f64) -> Option<f64> {
        match &self.shape {
            HitboxShape::Slope { abs_difference, .. } => Some(y_at_x(self.abs_position, *abs_difference, x)),
            _ => None,
        }
    }

    /// x of the slope at `y`, clamped to the segment ends
    pub fn x_at_y(&self, y: f64) -> Option<f64> {
        match &self.shape {
            HitboxShape::Slope { abs_difference, .. } => Some(x_at_y(self.abs_position, *abs_difference, y)),
            _ => None,
        }
    }

    /// Narrow-phase geometry. Composites have none.
    pub(crate) fn geometry(&self) -> Option<Geometry> {
        let position = self.abs_position;
        match &self.shape {
            HitboxShape::Point => Some(Geometry::Point(position)),
            HitboxShape::Circle { radius } if *radius > 0.0 => Some(Geometry::Circle {
                center: position,
                radius: *radius,
            }),
            HitboxShape::Circle { .. } => Some(Geometry::Point(position)),
            HitboxShape::Line { abs_difference, .. } => {
                if abs_difference.x == 0.0 && abs_difference.y == 0.0 {
                    Some(Geometry::Point(position))
                } else {
                    Some(Geometry::Segment(position, position + abs_difference))
                }
            }
            HitboxShape::Rectangle { .. } => Some(Geometry::Rect(self.bounds)),
            HitboxShape::Slope { abs_difference, .. } => {
                let (above, below) = self.slope_presence().unwrap_or((false, false));
                Some(Geometry::slope(position, *abs_difference, above, below))
            }
            HitboxShape::Composite { .. } => None,
        }
    }
}
