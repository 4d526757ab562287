//! Spatial partitioning
//!
//! A sparse uniform grid per world, the broad-phase query interface over it,
//! and the bookkeeping that keeps hitboxes filed as they move.

pub mod grid;
pub mod spatial_query;

mod registration;

pub use grid::{Bucket, Cell, CellGrid, CellRange, GridEntry};
pub use spatial_query::SpatialIndex;
