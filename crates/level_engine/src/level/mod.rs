//! Worlds, objects and the per-frame step
//!
//! Objects live in the engine's arena and enter worlds through deferred
//! transfers. Each world owns a cell grid; spatial queries and the movement
//! step run against it.

pub mod deferred;
pub mod object;
pub mod state;
pub mod thinker;

mod membership;
mod movement;
mod query;

#[cfg(test)]
mod tests;

pub use deferred::{DeferredCommand, DeferredQueue};
pub use object::{Collision, CollisionCheck, CollisionMode, LevelObject, Motion};
pub use state::{LevelState, StepState};
pub use thinker::Thinker;
