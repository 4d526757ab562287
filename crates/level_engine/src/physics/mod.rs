//! Hitboxes and the narrow phase
//!
//! Hitbox records, their shapes, the transform and hierarchy operations the
//! engine performs on them, and the exact pairwise overlap tests.

pub mod collision;
pub mod hitbox;
pub mod roles;
pub mod shape;

mod hierarchy;
mod transform;

pub use collision::geometries_overlap;
pub use hitbox::Hitbox;
pub use roles::{Direction, Directions, HitboxRoles, ObjectClasses};
pub use shape::{Bounds, Edges, Geometry, HitboxShape};
