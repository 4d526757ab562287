//! Deferred structural changes
//!
//! Changes to world membership, thinker registration and movement priority
//! are expressed as commands. A command submitted while any iteration is
//! open waits in one engine-wide FIFO queue; the queue is drained when the
//! last iteration closes. Commands submitted with no iteration open apply
//! at once.

use crate::engine::Engine;
use crate::foundation::collections::{ObjectId, StateId, ThinkerId};
use std::collections::VecDeque;

/// A structural change waiting to be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredCommand {
    /// Move an object between worlds; `None` means "no world"
    Transfer {
        /// Object to move
        object: ObjectId,
        /// World the object must be in when the command applies
        from: Option<StateId>,
        /// Destination world
        to: Option<StateId>,
    },
    /// Change the movement priority of a thinker object
    MovementPriority {
        /// Thinker object
        object: ObjectId,
        /// New priority
        priority: i32,
    },
    /// Start calling a registered thinker
    ActivateThinker {
        /// World the thinker is registered with
        state: StateId,
        /// Thinker
        thinker: ThinkerId,
    },
    /// Unregister a thinker
    RemoveThinker {
        /// World the thinker is registered with
        state: StateId,
        /// Thinker
        thinker: ThinkerId,
    },
}

impl DeferredCommand {
    /// Does the command touch `state`?
    pub fn mentions_state(&self, state: StateId) -> bool {
        match *self {
            Self::Transfer { from, to, .. } => from == Some(state) || to == Some(state),
            Self::MovementPriority { .. } => false,
            Self::ActivateThinker { state: owner, .. } | Self::RemoveThinker { state: owner, .. } => owner == state,
        }
    }
}

/// FIFO queue of deferred commands
#[derive(Debug, Default)]
pub struct DeferredQueue {
    commands: VecDeque<DeferredCommand>,
}

impl DeferredQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command
    pub fn push(&mut self, command: DeferredCommand) {
        self.commands.push_back(command);
    }

    /// Take the oldest command
    pub fn pop(&mut self) -> Option<DeferredCommand> {
        self.commands.pop_front()
    }

    /// Number of waiting commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Is nothing waiting?
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Does any waiting command touch `state`?
    pub fn mentions_state(&self, state: StateId) -> bool {
        self.commands.iter().any(|command| command.mentions_state(state))
    }
}

impl Engine {
    /// Apply `command` now, or queue it if an iteration is open
    pub(crate) fn submit(&mut self, command: DeferredCommand) {
        if self.is_iterating() {
            log::trace!("Deferring {:?}", command);
            self.deferred.push(command);
        } else {
            self.apply(command);
        }
    }

    /// Number of commands waiting for the open iterations to close
    pub fn pending_changes(&self) -> usize {
        self.deferred.len()
    }

    /// Apply every queued command in submission order
    pub(crate) fn drain_deferred(&mut self) {
        if !self.deferred.is_empty() {
            log::trace!("Applying {} deferred changes", self.deferred.len());
        }
        while !self.is_iterating() {
            let Some(command) = self.deferred.pop() else {
                break;
            };
            self.apply(command);
        }
    }

    fn apply(&mut self, command: DeferredCommand) {
        match command {
            DeferredCommand::Transfer { object, from, to } => self.apply_transfer(object, from, to),
            DeferredCommand::MovementPriority { object, priority } => self.apply_movement_priority(object, priority),
            DeferredCommand::ActivateThinker { state, thinker } => self.apply_activate_thinker(state, thinker),
            DeferredCommand::RemoveThinker { state, thinker } => self.apply_remove_thinker(state, thinker),
        }
    }
}
