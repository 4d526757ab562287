//! Handle types for the engine's arenas
//!
//! Hitboxes, objects, worlds and thinkers live in slot maps owned by the
//! [`Engine`](crate::Engine). Every cross reference (parent, children,
//! owning object, composite component) is one of these handles, never a
//! pointer, so a dropped entry can only ever produce a failed lookup.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle to a hitbox in the engine's hitbox arena
    pub struct HitboxId;

    /// Handle to a level object
    pub struct ObjectId;

    /// Handle to a world (level state)
    pub struct StateId;

    /// Handle to a per-frame thinker registered with a world
    pub struct ThinkerId;
}

/// Handle-based map of hitboxes
pub type HitboxArena = SlotMap<HitboxId, crate::physics::Hitbox>;

/// Handle-based map of level objects
pub type ObjectArena = SlotMap<ObjectId, crate::level::LevelObject>;

/// Monotonic serial number source.
///
/// Serials are never reused and give a stable, creation-ordered tie-break
/// that slot map keys (which recycle slots) cannot.
#[derive(Debug, Default)]
pub struct SerialSequence {
    next: u64,
}

impl SerialSequence {
    /// Create a sequence starting at zero
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Issue the next serial
    pub fn issue(&mut self) -> u64 {
        let serial = self.next;
        self.next += 1;
        serial
    }

    /// Number of serials issued so far
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serials_are_monotonic() {
        let mut sequence = SerialSequence::new();
        let a = sequence.issue();
        let b = sequence.issue();
        let c = sequence.issue();
        assert!(a < b && b < c);
        assert_eq!(sequence.issued(), 3);
    }
}
