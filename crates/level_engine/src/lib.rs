//! # Level Engine
//!
//! A 2D level engine: hierarchical hitboxes, a uniform cell grid and a
//! frame-stepped world model with deferred membership changes.
//!
//! ## Features
//!
//! - **Hitboxes**: points, circles, lines, rectangles, slopes and composites
//!   arranged in parent/child trees with rotation and flips
//! - **Narrow phase**: exact overlap tests for every shape pair
//! - **Cell grid**: sparse per-world grid with role buckets and incremental
//!   updates as hitboxes move
//! - **Worlds**: objects, thinker objects and thinkers stepped once per frame
//! - **Safe iteration**: structural changes made while iterating are queued
//!   and applied once the iteration ends
//!
//! ## Quick Start
//!
//! ```rust
//! use level_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let mut engine = Engine::new();
//!     let world = engine.create_state(LevelConfig::new(32.0, 32.0))?;
//!
//!     let body = engine.create_hitbox(LevelVector::new(0.0, 0.0), HitboxShape::rectangle(-4.0, 4.0, -4.0, 4.0)?);
//!     let ship = engine.create_thinker_object(body)?;
//!     engine.set_velocity(ship, LevelVector::new(2.0, 0.0));
//!     engine.add_object(world, ship);
//!
//!     engine.step(world)?;
//!     assert_eq!(engine.hitbox(body).map(|hitbox| hitbox.abs_position().x), Some(2.0));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]

// Core engine modules
pub mod config;
pub mod core;
pub mod foundation;
pub mod level;
pub mod physics;
pub mod spatial;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{Config, DrawMode, EngineConfig, LevelConfig},
        foundation::{
            collections::{HitboxId, ObjectId, StateId, ThinkerId},
            math::{LevelVector, LevelVectorExt},
        },
        level::{Collision, CollisionMode, LevelObject, LevelState, StepState, Thinker},
        physics::{Bounds, Direction, Directions, Hitbox, HitboxRoles, HitboxShape, ObjectClasses},
        Engine, EngineError,
    };
}
