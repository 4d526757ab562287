//! Per-frame callbacks
//!
//! A thinker is registered with one world and called twice per step, once
//! before the thinker objects move and once after. Registration and removal
//! follow the same deferral rules as object membership.

use super::deferred::DeferredCommand;
use crate::engine::Engine;
use crate::foundation::collections::{StateId, ThinkerId};

/// Per-frame hooks run by [`Engine::step`]
pub trait Thinker {
    /// Called before any thinker object moves
    fn before_movement(&mut self, _engine: &mut Engine, _state: StateId) {}

    /// Called after every thinker object has moved
    fn after_movement(&mut self, _engine: &mut Engine, _state: StateId) {}
}

/// A registered thinker and its bookkeeping
pub(crate) struct ThinkerSlot {
    /// Empty while the thinker is running
    pub(crate) thinker: Option<Box<dyn Thinker>>,
    pub(crate) serial: u64,
    pub(crate) active: bool,
    pub(crate) removing: bool,
}

impl Engine {
    /// Register a thinker with a world. It is called from the first step
    /// that starts after the registration is applied.
    pub fn add_thinker(&mut self, state: StateId, thinker: Box<dyn Thinker>) -> Option<ThinkerId> {
        if !self.states.contains_key(state) {
            return None;
        }
        let serial = self.serials.issue();
        let level = self.states.get_mut(state)?;
        let id = level.thinkers.insert(ThinkerSlot {
            thinker: Some(thinker),
            serial,
            active: false,
            removing: false,
        });
        self.submit(DeferredCommand::ActivateThinker { state, thinker: id });
        Some(id)
    }

    /// Unregister a thinker. It is not called again once this returns.
    pub fn remove_thinker(&mut self, state: StateId, thinker: ThinkerId) -> bool {
        let Some(slot) = self.states.get_mut(state).and_then(|level| level.thinkers.get_mut(thinker)) else {
            return false;
        };
        if slot.removing {
            return false;
        }
        slot.removing = true;
        self.submit(DeferredCommand::RemoveThinker { state, thinker });
        true
    }

    pub(crate) fn apply_activate_thinker(&mut self, state: StateId, thinker: ThinkerId) {
        match self.states.get_mut(state).and_then(|level| level.thinkers.get_mut(thinker)) {
            Some(slot) if !slot.removing => slot.active = true,
            Some(_) => {}
            None => log::warn!("Ignoring activation of unknown thinker {:?}", thinker),
        }
    }

    pub(crate) fn apply_remove_thinker(&mut self, state: StateId, thinker: ThinkerId) {
        if let Some(level) = self.states.get_mut(state) {
            if level.thinkers.remove(thinker).is_none() {
                log::warn!("Ignoring removal of unknown thinker {:?}", thinker);
            }
        }
    }

    /// Active thinkers of a world in registration order
    pub(crate) fn active_thinkers(&self, state: StateId) -> Vec<ThinkerId> {
        let Some(level) = self.states.get(state) else {
            return Vec::new();
        };
        let mut active: Vec<(u64, ThinkerId)> = level
            .thinkers
            .iter()
            .filter(|(_, slot)| slot.active && !slot.removing)
            .map(|(id, slot)| (slot.serial, id))
            .collect();
        active.sort_unstable();
        active.into_iter().map(|(_, id)| id).collect()
    }

    /// Run one thinker hook. The thinker is taken out of its slot for the
    /// call so it can borrow the engine mutably.
    pub(crate) fn run_thinker(
        &mut self,
        state: StateId,
        id: ThinkerId,
        hook: impl FnOnce(&mut dyn Thinker, &mut Engine, StateId),
    ) {
        let taken = self
            .states
            .get_mut(state)
            .and_then(|level| level.thinkers.get_mut(id))
            .filter(|slot| slot.active && !slot.removing)
            .and_then(|slot| slot.thinker.take());
        let Some(mut thinker) = taken else {
            return;
        };
        hook(thinker.as_mut(), self, state);
        if let Some(slot) = self.states.get_mut(state).and_then(|level| level.thinkers.get_mut(id)) {
            slot.thinker = Some(thinker);
        }
    }
}
