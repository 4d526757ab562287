//! Sparse uniform grid of cells
//!
//! Cells are keyed by integer coordinate and created on first use. Each cell
//! buckets the hitboxes that overlap it by role. A hitbox registers in the
//! inclusive range of cells its bounding box touches, so a box that ends
//! exactly on a cell boundary is present on both sides of it.

use crate::core::config::{DrawMode, LevelConfig};
use crate::foundation::collections::HitboxId;
use crate::physics::{Bounds, Direction, Directions, HitboxRoles};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Inclusive rectangle of cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Leftmost cell column
    pub left: i64,
    /// Rightmost cell column
    pub right: i64,
    /// Topmost cell row
    pub top: i64,
    /// Bottommost cell row
    pub bottom: i64,
}

impl CellRange {
    /// Create a range from inclusive bounds
    pub fn new(left: i64, right: i64, top: i64, bottom: i64) -> Self {
        Self { left, right, top, bottom }
    }

    /// Does the range include the cell?
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    /// Number of cells in the range
    pub fn cell_count(&self) -> u64 {
        let width = self.right.saturating_sub(self.left).saturating_add(1).max(0) as u64;
        let height = self.bottom.saturating_sub(self.top).saturating_add(1).max(0) as u64;
        width.saturating_mul(height)
    }

    /// Smallest range covering both
    pub fn union(&self, other: &CellRange) -> Self {
        Self::new(
            self.left.min(other.left),
            self.right.max(other.right),
            self.top.min(other.top),
            self.bottom.max(other.bottom),
        )
    }

    /// Cells common to both ranges
    pub fn intersection(&self, other: &CellRange) -> Option<Self> {
        let range = Self::new(
            self.left.max(other.left),
            self.right.min(other.right),
            self.top.max(other.top),
            self.bottom.min(other.bottom),
        );
        (range.left <= range.right && range.top <= range.bottom).then_some(range)
    }

    /// Every cell coordinate, row by row
    pub fn cells(&self) -> impl Iterator<Item = (i64, i64)> {
        let (left, right) = (self.left, self.right);
        (self.top..=self.bottom).flat_map(move |y| (left..=right).map(move |x| (x, y)))
    }
}

/// Which bucket of a cell a query scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Locator hitboxes
    Locator,
    /// Center hitboxes
    Center,
    /// Overlap hitboxes
    Overlap,
    /// Solid hitboxes, any surface
    Solid,
    /// Solid hitboxes that are solid on the given side
    SolidSurface(Direction),
    /// Collision hitboxes
    Collision,
}

/// What the grid needs to know about a hitbox to file it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridEntry {
    /// The hitbox
    pub hitbox: HitboxId,
    /// Its creation serial
    pub serial: u64,
    /// Draw priority of the owning object
    pub draw_priority: i32,
    /// Solid sides
    pub surfaces: Directions,
}

/// Sort key of the ordered locator bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct DrawKey {
    priority: i32,
    serial: u64,
    hitbox: HitboxId,
}

impl From<&GridEntry> for DrawKey {
    fn from(entry: &GridEntry) -> Self {
        Self {
            priority: entry.draw_priority,
            serial: entry.serial,
            hitbox: entry.hitbox,
        }
    }
}

#[derive(Debug)]
enum LocatorBucket {
    Ordered(BTreeSet<DrawKey>),
    Unordered(HashSet<HitboxId>),
}

/// One grid cell
#[derive(Debug)]
pub struct Cell {
    locators: LocatorBucket,
    centers: HashSet<HitboxId>,
    overlaps: HashSet<HitboxId>,
    solids: HashSet<HitboxId>,
    solid_surfaces: [HashSet<HitboxId>; 4],
    collisions: HashSet<HitboxId>,
}

impl Cell {
    fn new(draw_mode: DrawMode) -> Self {
        let locators = match draw_mode {
            DrawMode::Flat => LocatorBucket::Ordered(BTreeSet::new()),
            DrawMode::Over | DrawMode::Under => LocatorBucket::Unordered(HashSet::new()),
        };
        Self {
            locators,
            centers: HashSet::new(),
            overlaps: HashSet::new(),
            solids: HashSet::new(),
            solid_surfaces: Default::default(),
            collisions: HashSet::new(),
        }
    }

    fn insert(&mut self, entry: &GridEntry, roles: HitboxRoles) {
        let id = entry.hitbox;
        if roles.contains(HitboxRoles::LOCATOR) {
            match &mut self.locators {
                LocatorBucket::Ordered(keys) => {
                    keys.insert(DrawKey::from(entry));
                }
                LocatorBucket::Unordered(ids) => {
                    ids.insert(id);
                }
            }
        }
        if roles.contains(HitboxRoles::CENTER) {
            self.centers.insert(id);
        }
        if roles.contains(HitboxRoles::OVERLAP) {
            self.overlaps.insert(id);
        }
        if roles.contains(HitboxRoles::SOLID) {
            self.solids.insert(id);
            for direction in entry.surfaces.directions() {
                self.solid_surfaces[direction.index()].insert(id);
            }
        }
        if roles.contains(HitboxRoles::COLLISION) {
            self.collisions.insert(id);
        }
    }

    fn remove(&mut self, entry: &GridEntry, roles: HitboxRoles) {
        let id = entry.hitbox;
        if roles.contains(HitboxRoles::LOCATOR) {
            match &mut self.locators {
                LocatorBucket::Ordered(keys) => {
                    keys.remove(&DrawKey::from(entry));
                }
                LocatorBucket::Unordered(ids) => {
                    ids.remove(&id);
                }
            }
        }
        if roles.contains(HitboxRoles::CENTER) {
            self.centers.remove(&id);
        }
        if roles.contains(HitboxRoles::OVERLAP) {
            self.overlaps.remove(&id);
        }
        if roles.contains(HitboxRoles::SOLID) {
            self.solids.remove(&id);
            for bucket in &mut self.solid_surfaces {
                bucket.remove(&id);
            }
        }
        if roles.contains(HitboxRoles::COLLISION) {
            self.collisions.remove(&id);
        }
    }

    /// Does the cell hold nothing at all?
    pub fn is_empty(&self) -> bool {
        let no_locators = match &self.locators {
            LocatorBucket::Ordered(keys) => keys.is_empty(),
            LocatorBucket::Unordered(ids) => ids.is_empty(),
        };
        no_locators
            && self.centers.is_empty()
            && self.overlaps.is_empty()
            && self.solids.is_empty()
            && self.collisions.is_empty()
    }

    /// Hitboxes in a bucket. Locators come out in draw order when the grid
    /// uses [`DrawMode::Flat`].
    pub fn hitboxes(&self, bucket: Bucket) -> Box<dyn Iterator<Item = HitboxId> + '_> {
        match bucket {
            Bucket::Locator => match &self.locators {
                LocatorBucket::Ordered(keys) => Box::new(keys.iter().map(|key| key.hitbox)),
                LocatorBucket::Unordered(ids) => Box::new(ids.iter().copied()),
            },
            Bucket::Center => Box::new(self.centers.iter().copied()),
            Bucket::Overlap => Box::new(self.overlaps.iter().copied()),
            Bucket::Solid => Box::new(self.solids.iter().copied()),
            Bucket::SolidSurface(direction) => Box::new(self.solid_surfaces[direction.index()].iter().copied()),
            Bucket::Collision => Box::new(self.collisions.iter().copied()),
        }
    }

    /// Number of hitboxes in a bucket
    pub fn len(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Locator => match &self.locators {
                LocatorBucket::Ordered(keys) => keys.len(),
                LocatorBucket::Unordered(ids) => ids.len(),
            },
            Bucket::Center => self.centers.len(),
            Bucket::Overlap => self.overlaps.len(),
            Bucket::Solid => self.solids.len(),
            Bucket::SolidSurface(direction) => self.solid_surfaces[direction.index()].len(),
            Bucket::Collision => self.collisions.len(),
        }
    }
}

/// Sparse grid of fixed-size cells
#[derive(Debug)]
pub struct CellGrid {
    cell_width: f64,
    cell_height: f64,
    draw_mode: DrawMode,
    cells: HashMap<(i64, i64), Cell>,
    bounds: Option<CellRange>,
}

impl CellGrid {
    /// Create an empty grid; the configuration must already be validated
    pub fn new(config: &LevelConfig) -> Self {
        Self {
            cell_width: config.cell_width,
            cell_height: config.cell_height,
            draw_mode: config.draw_mode,
            cells: HashMap::new(),
            bounds: None,
        }
    }

    /// Width of a cell
    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    /// Height of a cell
    pub fn cell_height(&self) -> f64 {
        self.cell_height
    }

    /// Draw mode of the locator buckets
    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Envelope of every cell that has ever been occupied
    pub fn bounds(&self) -> Option<CellRange> {
        self.bounds
    }

    /// Cell at a coordinate, if occupied
    pub fn cell(&self, x: i64, y: i64) -> Option<&Cell> {
        self.cells.get(&(x, y))
    }

    /// Number of occupied cells
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Area covered by a cell
    pub fn cell_bounds(&self, x: i64, y: i64) -> Bounds {
        let left = x as f64 * self.cell_width;
        let top = y as f64 * self.cell_height;
        Bounds::new(left, left + self.cell_width, top, top + self.cell_height)
    }

    /// Inclusive range of cells touched by a bounding box
    pub fn cell_range(&self, bounds: &Bounds) -> CellRange {
        CellRange::new(
            cell_before(bounds.left / self.cell_width),
            (bounds.right / self.cell_width).floor() as i64,
            cell_before(bounds.top / self.cell_height),
            (bounds.bottom / self.cell_height).floor() as i64,
        )
    }

    /// Cells to survey for a region, clipped to the occupied envelope.
    ///
    /// Uses the exclusive range; an axis that comes out empty (a region of
    /// zero extent on a cell boundary) is widened to the two cells beside it.
    pub fn query_range(&self, bounds: &Bounds) -> Option<CellRange> {
        let envelope = self.bounds?;
        let (left, right) = widen(
            (bounds.left / self.cell_width).floor() as i64,
            cell_before(bounds.right / self.cell_width),
        );
        let (top, bottom) = widen(
            (bounds.top / self.cell_height).floor() as i64,
            cell_before(bounds.bottom / self.cell_height),
        );
        CellRange::new(left, right, top, bottom).intersection(&envelope)
    }

    /// File a hitbox under `roles` in every cell of `range`
    pub fn insert(&mut self, entry: &GridEntry, range: CellRange, roles: HitboxRoles) {
        let draw_mode = self.draw_mode;
        for coordinate in range.cells() {
            self.cells
                .entry(coordinate)
                .or_insert_with(|| Cell::new(draw_mode))
                .insert(entry, roles);
        }
        self.bounds = Some(match self.bounds {
            Some(bounds) => bounds.union(&range),
            None => range,
        });
    }

    /// Remove a hitbox's `roles` from every cell of `range`, dropping cells
    /// that become empty
    pub fn remove(&mut self, entry: &GridEntry, range: CellRange, roles: HitboxRoles) {
        for coordinate in range.cells() {
            if let Some(cell) = self.cells.get_mut(&coordinate) {
                cell.remove(entry, roles);
                if cell.is_empty() {
                    self.cells.remove(&coordinate);
                }
            }
        }
    }

    /// Occupied cells inside `range` with their coordinates, row by row
    pub fn cells_in(&self, range: CellRange) -> Vec<((i64, i64), &Cell)> {
        if range.cell_count() > self.cells.len() as u64 {
            let mut found: Vec<_> = self
                .cells
                .iter()
                .filter(|((x, y), _)| range.contains(*x, *y))
                .map(|(coordinate, cell)| (*coordinate, cell))
                .collect();
            found.sort_by_key(|((x, y), _)| (*y, *x));
            found
        } else {
            range
                .cells()
                .filter_map(|coordinate| self.cells.get(&coordinate).map(|cell| (coordinate, cell)))
                .collect()
        }
    }

    /// Remove every hitbox; the envelope is reset too
    pub fn clear(&mut self) {
        self.cells.clear();
        self.bounds = None;
    }
}

/// Index of the cell ending at or just before `edge` (in cell units).
/// Casts saturate, so far-off coordinates clamp to the ends of `i64`.
fn cell_before(edge: f64) -> i64 {
    (edge.ceil() as i64).saturating_sub(1)
}

fn widen(min: i64, max: i64) -> (i64, i64) {
    if min > max {
        (max, min)
    } else {
        (min, max)
    }
}
