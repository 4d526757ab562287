//! Core engine implementation
//!
//! The [`Engine`] owns every arena in the system: hitboxes, objects and
//! worlds. It also owns the single iteration gate and the deferred command
//! queue that together keep iteration safe while callbacks add, remove and
//! reorder objects.

use crate::{
    config::ConfigError,
    core::config::{EngineConfig, LevelConfig},
    foundation::{
        collections::{HitboxArena, HitboxId, ObjectArena, ObjectId, SerialSequence, SlotMap, StateId},
        math::LevelVector,
    },
    level::{deferred::DeferredQueue, LevelObject, LevelState},
    physics::{Hitbox, HitboxShape},
};
use thiserror::Error;

/// Main engine struct
///
/// Every hitbox, object and world is addressed through a handle into one of
/// the engine's arenas. Structural changes to world membership go through the
/// deferred queue and are applied as soon as no iteration is open.
pub struct Engine {
    /// Hitbox arena
    pub(crate) hitboxes: HitboxArena,

    /// Object arena
    pub(crate) objects: ObjectArena,

    /// Worlds
    pub(crate) states: SlotMap<StateId, LevelState>,

    /// Serial source for hitboxes, objects and thinkers
    pub(crate) serials: SerialSequence,

    /// Number of iterations currently open anywhere in the engine
    pub(crate) open_iterations: usize,

    /// Membership changes waiting for the gate to close
    pub(crate) deferred: DeferredQueue,

    /// Engine configuration
    config: EngineConfig,
}

impl Engine {
    /// Create a new engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new engine with the given configuration
    pub fn with_config(config: EngineConfig) -> Self {
        log::debug!("Initializing level engine (default cells {}x{})", config.level.cell_width, config.level.cell_height);
        Self {
            hitboxes: HitboxArena::with_key(),
            objects: ObjectArena::with_key(),
            states: SlotMap::with_key(),
            serials: SerialSequence::new(),
            open_iterations: 0,
            deferred: DeferredQueue::new(),
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a world with the given grid and time settings
    pub fn create_state(&mut self, config: LevelConfig) -> Result<StateId, EngineError> {
        config.validate()?;
        let state = self.states.insert(LevelState::new(config));
        log::debug!("Created world {:?}", state);
        Ok(state)
    }

    /// Create a world using the engine's default world configuration
    pub fn create_default_state(&mut self) -> Result<StateId, EngineError> {
        self.create_state(self.config.level.clone())
    }

    /// Destroy a world.
    ///
    /// Only empty worlds with nothing pending can be destroyed, and only
    /// while no iteration is open.
    pub fn destroy_state(&mut self, state: StateId) -> bool {
        let Some(level) = self.states.get(state) else {
            return false;
        };
        if self.is_iterating() {
            log::debug!("Refusing to destroy world {:?} during iteration", state);
            return false;
        }
        let pending = self
            .objects
            .values()
            .any(|object| object.new_state == Some(state) || object.state == Some(state));
        if !level.objects.is_empty() || pending || self.deferred.mentions_state(state) {
            log::debug!("Refusing to destroy non-empty world {:?}", state);
            return false;
        }
        self.states.remove(state);
        true
    }

    /// Look up a world
    pub fn state(&self, state: StateId) -> Option<&LevelState> {
        self.states.get(state)
    }

    /// Look up a world mutably
    pub(crate) fn state_mut(&mut self, state: StateId) -> Option<&mut LevelState> {
        self.states.get_mut(state)
    }

    /// All worlds
    pub fn state_ids(&self) -> Vec<StateId> {
        self.states.keys().collect()
    }

    /// Create a free-standing hitbox at `position`
    ///
    /// The shape has already been validated by its constructor, so creation
    /// itself cannot fail.
    pub fn create_hitbox(&mut self, position: LevelVector, shape: HitboxShape) -> HitboxId {
        let serial = self.serials.issue();
        let id = self.hitboxes.insert(Hitbox::new(serial, position, shape));
        self.refresh_bounds(id);
        id
    }

    /// Destroy a free-standing hitbox and its whole subtree
    ///
    /// Fails for hitboxes that have a parent or belong to an object.
    pub fn destroy_hitbox(&mut self, id: HitboxId) -> bool {
        let Some(hitbox) = self.hitboxes.get(id) else {
            return false;
        };
        if hitbox.parent.is_some() || hitbox.object.is_some() {
            log::debug!("Hitbox {} is attached and cannot be destroyed", hitbox.serial);
            return false;
        }
        for descendant in self.subtree(id) {
            self.hitboxes.remove(descendant);
        }
        true
    }

    /// Look up a hitbox
    pub fn hitbox(&self, id: HitboxId) -> Option<&Hitbox> {
        self.hitboxes.get(id)
    }

    /// Number of live hitboxes
    pub fn hitbox_count(&self) -> usize {
        self.hitboxes.len()
    }

    /// Look up an object
    pub fn object(&self, id: ObjectId) -> Option<&LevelObject> {
        self.objects.get(id)
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Is any iteration currently open?
    pub fn is_iterating(&self) -> bool {
        self.open_iterations > 0
    }

    /// Open an iteration; structural changes are deferred until it closes
    pub(crate) fn open_iteration(&mut self) {
        self.open_iterations += 1;
    }

    /// Close an iteration, draining the deferred queue once none is open
    pub(crate) fn close_iteration(&mut self) {
        self.open_iterations = self.open_iterations.saturating_sub(1);
        if self.open_iterations == 0 {
            self.drain_deferred();
        }
    }

    /// Handles of `root` and all of its descendants, parents before children
    pub(crate) fn subtree(&self, root: HitboxId) -> Vec<HitboxId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(hitbox) = self.hitboxes.get(id) {
                order.push(id);
                stack.extend(hitbox.children.iter().rev().copied());
            }
        }
        order
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Circle radius was negative or not a number
    #[error("Invalid radius: {0}")]
    InvalidRadius(f64),

    /// Grid cells must have a positive, finite size
    #[error("Invalid cell size: {width}x{height}")]
    InvalidCellSize {
        /// Requested cell width
        width: f64,
        /// Requested cell height
        height: f64,
    },

    /// Rectangle offsets had left > right or top > bottom
    #[error("Invalid rectangle: left {left}, right {right}, top {top}, bottom {bottom}")]
    InvalidRectangle {
        /// Left offset
        left: f64,
        /// Right offset
        right: f64,
        /// Top offset
        top: f64,
        /// Bottom offset
        bottom: f64,
    },

    /// Time factors must be finite and not negative
    #[error("Invalid time factor: {0}")]
    InvalidTimeFactor(f64),

    /// The hitbox handle does not refer to a live hitbox
    #[error("Unknown hitbox")]
    UnknownHitbox,

    /// The object handle does not refer to a live object
    #[error("Unknown object")]
    UnknownObject,

    /// The world handle does not refer to a live world
    #[error("Unknown world")]
    UnknownState,

    /// The operation expects a different hitbox shape
    #[error("Shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Shape the operation works on
        expected: &'static str,
        /// Shape the hitbox actually has
        found: &'static str,
    },

    /// The hitbox already has a parent or an owning object
    #[error("Hitbox is already in use")]
    HitboxInUse,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
