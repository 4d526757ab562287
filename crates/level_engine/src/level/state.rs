//! Worlds
//!
//! A [`LevelState`] owns its cell grid, the set of objects in it, the
//! thinker objects ordered for movement and the registered thinkers.

use super::thinker::ThinkerSlot;
use crate::core::config::LevelConfig;
use crate::engine::{Engine, EngineError};
use crate::foundation::collections::{ObjectId, SlotMap, StateId, ThinkerId};
use crate::spatial::CellGrid;
use std::collections::BTreeSet;

/// Where a world is within its current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepState {
    /// Not stepping
    #[default]
    Idle,
    /// Running before-movement hooks or moving thinker objects
    BeforeMovement,
    /// Running after-movement hooks
    AfterMovement,
}

/// A world: a grid of cells and the objects placed in it
pub struct LevelState {
    pub(crate) grid: CellGrid,
    pub(crate) time_factor: f64,
    /// Objects keyed by serial
    pub(crate) objects: BTreeSet<(u64, ObjectId)>,
    /// Thinker objects keyed by movement priority, then serial
    pub(crate) thinker_objects: BTreeSet<(i32, u64, ObjectId)>,
    pub(crate) thinkers: SlotMap<ThinkerId, ThinkerSlot>,
    pub(crate) step_state: StepState,
    pub(crate) frame: u64,
}

impl LevelState {
    /// Create an empty world; the configuration must already be validated
    pub fn new(config: LevelConfig) -> Self {
        Self {
            grid: CellGrid::new(&config),
            time_factor: config.time_factor,
            objects: BTreeSet::new(),
            thinker_objects: BTreeSet::new(),
            thinkers: SlotMap::with_key(),
            step_state: StepState::Idle,
            frame: 0,
        }
    }

    /// Cell grid
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Time factor applied to objects without their own
    pub fn time_factor(&self) -> f64 {
        self.time_factor
    }

    /// Number of objects in the world
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of thinker objects in the world
    pub fn thinker_object_count(&self) -> usize {
        self.thinker_objects.len()
    }

    /// Number of registered thinkers, including ones not yet active
    pub fn thinker_count(&self) -> usize {
        self.thinkers.len()
    }

    /// Is the object in this world?
    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.iter().any(|(_, id)| *id == object)
    }

    /// Step marker
    pub fn step_state(&self) -> StepState {
        self.step_state
    }

    /// Number of completed steps
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Engine {
    /// Change a world's time factor. Zero pauses the world.
    pub fn set_state_time_factor(&mut self, state: StateId, time_factor: f64) -> Result<(), EngineError> {
        if !time_factor.is_finite() || time_factor < 0.0 {
            return Err(EngineError::InvalidTimeFactor(time_factor));
        }
        let level = self.states.get_mut(state).ok_or(EngineError::UnknownState)?;
        level.time_factor = time_factor;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_new_world_is_idle() {
        let mut engine = Engine::new();
        let state = engine.create_state(LevelConfig::new(32.0, 32.0)).unwrap();
        let level = engine.state(state).unwrap();
        assert_eq!(level.step_state(), StepState::Idle);
        assert_eq!(level.frame(), 0);
        assert_eq!(level.object_count(), 0);
        assert_eq!(level.grid().occupied_cells(), 0);
    }

    #[test]
    fn test_time_factor_validation() {
        let mut engine = Engine::new();
        let state = engine.create_default_state().unwrap();
        assert!(engine.set_state_time_factor(state, 0.0).is_ok());
        assert!(matches!(
            engine.set_state_time_factor(state, -0.5),
            Err(EngineError::InvalidTimeFactor(_))
        ));
        assert!(matches!(
            engine.set_state_time_factor(state, f64::INFINITY),
            Err(EngineError::InvalidTimeFactor(_))
        ));
        assert_eq!(engine.state(state).unwrap().time_factor(), 0.0);
    }
}
