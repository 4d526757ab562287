//! Hitbox roles, solid-surface directions and object classes
//!
//! All three are small bit sets: a hitbox can serve several roles at once,
//! a solid hitbox can be solid on any subset of its four sides, and an object
//! can belong to any number of classes that queries filter on.

use bitflags::bitflags;

bitflags! {
    /// Purposes a hitbox serves for the object that owns it
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HitboxRoles: u8 {
        /// Defines the object's position, rotation and flip; exactly one per object
        const LOCATOR = 1 << 0;
        /// Non-blocking overlap queries (triggers, pickups)
        const OVERLAP = 1 << 1;
        /// Solid surfaces that other objects collide with
        const SOLID = 1 << 2;
        /// Shape a moving object uses to detect solid surfaces
        const COLLISION = 1 << 3;
        /// Point used as the object's center by distance queries
        const CENTER = 1 << 4;
    }
}

impl HitboxRoles {
    /// Number of roles held
    pub fn count(self) -> u32 {
        self.bits().count_ones()
    }
}

/// One of the four sides of a solid surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Negative x
    Left,
    /// Positive x
    Right,
    /// Negative y (up on screen)
    Up,
    /// Positive y (down on screen)
    Down,
}

impl Direction {
    /// All directions in bucket order
    pub const ALL: [Direction; 4] = [Direction::Left, Direction::Right, Direction::Up, Direction::Down];

    /// Index of this direction's per-direction bucket
    pub fn index(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
            Direction::Up => 2,
            Direction::Down => 3,
        }
    }

    /// The opposite side
    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Surface a mover runs into when travelling by `(dx, dy)`.
    ///
    /// Moving right meets left-facing surfaces, moving down meets top
    /// surfaces, and so on. Returns at most two directions.
    pub fn facing_motion(dx: f64, dy: f64) -> impl Iterator<Item = Direction> {
        let horizontal = if dx > 0.0 {
            Some(Direction::Left)
        } else if dx < 0.0 {
            Some(Direction::Right)
        } else {
            None
        };
        let vertical = if dy > 0.0 {
            Some(Direction::Up)
        } else if dy < 0.0 {
            Some(Direction::Down)
        } else {
            None
        };
        horizontal.into_iter().chain(vertical)
    }
}

bitflags! {
    /// Set of solid-surface directions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Directions: u8 {
        /// Left side is solid
        const LEFT = 1 << 0;
        /// Right side is solid
        const RIGHT = 1 << 1;
        /// Top side is solid
        const UP = 1 << 2;
        /// Bottom side is solid
        const DOWN = 1 << 3;
    }
}

impl From<Direction> for Directions {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => Directions::LEFT,
            Direction::Right => Directions::RIGHT,
            Direction::Up => Directions::UP,
            Direction::Down => Directions::DOWN,
        }
    }
}

impl Directions {
    /// Does the set contain the given direction?
    pub fn has(self, direction: Direction) -> bool {
        self.contains(Directions::from(direction))
    }

    /// Iterate the contained directions in bucket order
    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |direction| self.has(*direction))
    }
}

bitflags! {
    /// Runtime classes an object belongs to; queries filter on these.
    ///
    /// Bits 0-7 are reserved for the engine, bits 8-63 are free for games
    /// (see [`ObjectClasses::custom`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectClasses: u64 {
        /// Object takes part in the per-frame movement step
        const THINKER = 1 << 0;
    }
}

impl ObjectClasses {
    /// Filter that matches every object
    pub const ANY: Self = Self::empty();

    /// A game-defined class. `bit` must be in 8..64.
    pub fn custom(bit: u32) -> Self {
        debug_assert!((8..64).contains(&bit), "custom class bits are 8..64");
        Self::from_bits_retain(1u64 << (bit % 64))
    }

    /// Does an object with these classes pass `filter`?
    pub fn matches(self, filter: Self) -> bool {
        self.contains(filter)
    }
}
