//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and geometric predicates
//! - Handle types for the hitbox, object, world and thinker arenas
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
