//! Transform setters and shape mutators
//!
//! Every change to a hitbox's relative transform or shape is pushed down its
//! subtree, then bounds are refreshed bottom-up so composites see their
//! components' new boxes. Each refresh re-registers the hitbox in the grid
//! when its filed cell range moves.

use super::hitbox::{Frame, Hitbox};
use super::shape::{validate_radius, Bounds, Edges, HitboxShape};
use crate::engine::{Engine, EngineError};
use crate::foundation::collections::HitboxId;
use crate::foundation::math::{normalize_angle, LevelVector};

impl Engine {
    /// Set the position relative to the parent
    pub fn set_position(&mut self, id: HitboxId, position: LevelVector) -> bool {
        self.update_relative(id, |hitbox| hitbox.rel_position = position)
    }

    /// Move by `delta` relative to the parent
    pub fn change_position(&mut self, id: HitboxId, delta: LevelVector) -> bool {
        self.update_relative(id, |hitbox| hitbox.rel_position += delta)
    }

    /// Set the angle relative to the parent, in degrees
    pub fn set_angle(&mut self, id: HitboxId, angle: f64) -> bool {
        self.update_relative(id, |hitbox| hitbox.rel_angle = normalize_angle(angle))
    }

    /// Rotate by `delta` degrees relative to the parent
    pub fn change_angle(&mut self, id: HitboxId, delta: f64) -> bool {
        self.update_relative(id, |hitbox| hitbox.rel_angle = normalize_angle(hitbox.rel_angle + delta))
    }

    /// Set the relative x flip
    pub fn set_x_flip(&mut self, id: HitboxId, flip: bool) -> bool {
        self.update_relative(id, |hitbox| hitbox.rel_x_flip = flip)
    }

    /// Set the relative y flip
    pub fn set_y_flip(&mut self, id: HitboxId, flip: bool) -> bool {
        self.update_relative(id, |hitbox| hitbox.rel_y_flip = flip)
    }

    /// Toggle the relative x flip
    pub fn flip_x(&mut self, id: HitboxId) -> bool {
        self.update_relative(id, |hitbox| hitbox.rel_x_flip = !hitbox.rel_x_flip)
    }

    /// Toggle the relative y flip
    pub fn flip_y(&mut self, id: HitboxId) -> bool {
        self.update_relative(id, |hitbox| hitbox.rel_y_flip = !hitbox.rel_y_flip)
    }

    /// Change a circle's radius
    pub fn set_radius(&mut self, id: HitboxId, radius: f64) -> Result<(), EngineError> {
        validate_radius(radius)?;
        self.update_shape(id, "circle", |shape| match shape {
            HitboxShape::Circle { radius: current } => {
                *current = radius;
                true
            }
            _ => false,
        })
    }

    /// Change a line's difference vector
    pub fn set_line_difference(&mut self, id: HitboxId, difference: LevelVector) -> Result<(), EngineError> {
        self.update_shape(id, "line", |shape| match shape {
            HitboxShape::Line { rel_difference, .. } => {
                *rel_difference = difference;
                true
            }
            _ => false,
        })
    }

    /// Change a rectangle's edge offsets
    pub fn set_rectangle_edges(
        &mut self,
        id: HitboxId,
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
    ) -> Result<(), EngineError> {
        let edges = Edges::new(left, right, top, bottom)?;
        self.update_shape(id, "rectangle", |shape| match shape {
            HitboxShape::Rectangle { rel, .. } => {
                *rel = edges;
                true
            }
            _ => false,
        })
    }

    /// Change a slope's difference vector and filled sides
    pub fn set_slope(
        &mut self,
        id: HitboxId,
        difference: LevelVector,
        above: bool,
        below: bool,
    ) -> Result<(), EngineError> {
        self.update_shape(id, "slope", |shape| match shape {
            HitboxShape::Slope {
                rel_difference,
                present_above,
                present_below,
                ..
            } => {
                *rel_difference = difference;
                *present_above = above;
                *present_below = below;
                true
            }
            _ => false,
        })
    }

    fn update_relative(&mut self, id: HitboxId, update: impl FnOnce(&mut Hitbox)) -> bool {
        let Some(hitbox) = self.hitboxes.get_mut(id) else {
            return false;
        };
        update(hitbox);
        self.propagate_transform(id);
        true
    }

    fn update_shape(
        &mut self,
        id: HitboxId,
        expected: &'static str,
        update: impl FnOnce(&mut HitboxShape) -> bool,
    ) -> Result<(), EngineError> {
        let hitbox = self.hitboxes.get_mut(id).ok_or(EngineError::UnknownHitbox)?;
        if !update(&mut hitbox.shape) {
            return Err(EngineError::ShapeMismatch {
                expected,
                found: hitbox.shape.kind(),
            });
        }
        self.propagate_transform(id);
        Ok(())
    }

    /// Recompute absolute transforms for `root` and its descendants, then
    /// their bounds, then the bounds of any composites above `root`
    pub(crate) fn propagate_transform(&mut self, root: HitboxId) {
        let order = self.subtree(root);
        for &id in &order {
            let parent_frame: Option<Frame> = self
                .hitboxes
                .get(id)
                .and_then(|hitbox| hitbox.parent)
                .and_then(|parent| self.hitboxes.get(parent))
                .map(Hitbox::frame);
            if let Some(hitbox) = self.hitboxes.get_mut(id) {
                hitbox.update_absolute(parent_frame);
            }
        }
        for &id in order.iter().rev() {
            self.refresh_bounds(id);
        }
        if let Some(composite) = self.hitboxes.get(root).and_then(|hitbox| hitbox.component_of) {
            self.refresh_bounds_upward(composite);
        }
    }

    /// Refresh bounds of `id` and of the composites it belongs to, stopping
    /// at the first box that does not change
    pub(crate) fn refresh_bounds_upward(&mut self, id: HitboxId) {
        let mut current = Some(id);
        while let Some(id) = current {
            if !self.refresh_bounds(id) {
                break;
            }
            current = self.hitboxes.get(id).and_then(|hitbox| hitbox.component_of);
        }
    }

    /// Recompute the cached bounding box; returns whether it changed
    pub(crate) fn refresh_bounds(&mut self, id: HitboxId) -> bool {
        let Some(hitbox) = self.hitboxes.get(id) else {
            return false;
        };
        let bounds = match &hitbox.shape {
            HitboxShape::Composite { components } => components
                .values()
                .filter_map(|component| self.hitboxes.get(*component))
                .map(|component| component.bounds)
                .reduce(|union, next| union.union(&next))
                .unwrap_or_else(|| Bounds::point(hitbox.abs_position)),
            shape => shape
                .bounds_at(hitbox.abs_position)
                .unwrap_or_else(|| Bounds::point(hitbox.abs_position)),
        };
        let changed = hitbox.bounds != bounds;
        if changed {
            if let Some(hitbox) = self.hitboxes.get_mut(id) {
                hitbox.bounds = bounds;
            }
        }
        // The filed range also covers the position, which can move on its own
        self.update_cell_registration(id);
        changed
    }
}
