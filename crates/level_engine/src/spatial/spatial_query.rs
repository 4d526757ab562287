//! Broad-phase query interface
//!
//! Queries survey every cell that a region touches and report each hitbox
//! once, however many of those cells it spans. The narrow phase then runs
//! only on the returned candidates.

use super::grid::{Bucket, CellGrid, CellRange, GridEntry};
use crate::foundation::collections::HitboxId;
use crate::foundation::math::{circle_meets_rectangle, LevelVector};
use crate::physics::{Bounds, HitboxRoles};
use std::collections::HashSet;

/// Interface of a broad-phase structure that files hitboxes by role
pub trait SpatialIndex {
    /// File `entry` under `roles` in `range`
    fn insert(&mut self, entry: &GridEntry, range: CellRange, roles: HitboxRoles);

    /// Unfile `entry`'s `roles` from `range`
    fn remove(&mut self, entry: &GridEntry, range: CellRange, roles: HitboxRoles);

    /// Move `entry` from one range to another under the same roles
    fn relocate(&mut self, entry: &GridEntry, from: CellRange, to: CellRange, roles: HitboxRoles) {
        self.remove(entry, from, roles);
        self.insert(entry, to, roles);
    }

    /// Distinct hitboxes in the given buckets of every cell `bounds` touches,
    /// in first-seen order
    fn query_rect(&self, bounds: &Bounds, buckets: &[Bucket]) -> Vec<HitboxId>;

    /// Like [`query_rect`](Self::query_rect) over the circle's bounding box,
    /// skipping cells the circle does not reach
    fn query_circle(&self, center: LevelVector, radius: f64, buckets: &[Bucket]) -> Vec<HitboxId>;

    /// Remove everything
    fn clear(&mut self);
}

impl SpatialIndex for CellGrid {
    fn insert(&mut self, entry: &GridEntry, range: CellRange, roles: HitboxRoles) {
        CellGrid::insert(self, entry, range, roles);
    }

    fn remove(&mut self, entry: &GridEntry, range: CellRange, roles: HitboxRoles) {
        CellGrid::remove(self, entry, range, roles);
    }

    fn query_rect(&self, bounds: &Bounds, buckets: &[Bucket]) -> Vec<HitboxId> {
        collect_unique(self, bounds, buckets, |_| true)
    }

    fn query_circle(&self, center: LevelVector, radius: f64, buckets: &[Bucket]) -> Vec<HitboxId> {
        let bounds = Bounds::new(center.x - radius, center.x + radius, center.y - radius, center.y + radius);
        collect_unique(self, &bounds, buckets, |cell| {
            circle_meets_rectangle(center, radius, cell.left, cell.right, cell.top, cell.bottom)
        })
    }

    fn clear(&mut self) {
        CellGrid::clear(self);
    }
}

fn collect_unique(
    grid: &CellGrid,
    bounds: &Bounds,
    buckets: &[Bucket],
    keep_cell: impl Fn(&Bounds) -> bool,
) -> Vec<HitboxId> {
    let Some(range) = grid.query_range(bounds) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for ((x, y), cell) in grid.cells_in(range) {
        if !keep_cell(&grid.cell_bounds(x, y)) {
            continue;
        }
        for bucket in buckets {
            for id in cell.hitboxes(*bucket) {
                if seen.insert(id) {
                    found.push(id);
                }
            }
        }
    }
    found
}
