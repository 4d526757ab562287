//! Parent/child links and composite components
//!
//! Hitboxes form a forest. A child inherits the owning object and world of
//! its parent; attaching never creates a cycle and never steals a hitbox
//! that already has a parent or an owner.

use super::shape::HitboxShape;
use crate::engine::Engine;
use crate::foundation::collections::{HitboxId, ObjectId, StateId};

impl Engine {
    /// Attach `child` under `parent`
    ///
    /// Fails if either handle is stale, if `child` is `parent`, if `child`
    /// already has a parent or an owning object, or if `child` is an
    /// ancestor of `parent`.
    pub fn add_child(&mut self, parent: HitboxId, child: HitboxId) -> bool {
        if !self.can_attach(parent, child) {
            return false;
        }
        let Some((object, state)) = self.hitboxes.get(parent).map(|hitbox| (hitbox.object, hitbox.state)) else {
            return false;
        };
        if let Some(hitbox) = self.hitboxes.get_mut(child) {
            hitbox.parent = Some(parent);
        }
        if let Some(hitbox) = self.hitboxes.get_mut(parent) {
            hitbox.children.push(child);
        }
        self.set_subtree_owner(child, object, state);
        self.propagate_transform(child);
        true
    }

    /// Detach `child` from `parent`
    ///
    /// Only succeeds when `parent` is the current parent of `child`. Roles
    /// held anywhere in the detached subtree are released, and a detached
    /// component leaves its composite.
    pub fn remove_child(&mut self, parent: HitboxId, child: HitboxId) -> bool {
        if self.hitboxes.get(child).and_then(|hitbox| hitbox.parent) != Some(parent) {
            return false;
        }
        for id in self.subtree(child) {
            if self.hitboxes.get(id).is_some_and(|hitbox| !hitbox.roles.is_empty()) {
                self.strip_roles(id);
            }
        }
        let mut was_component = false;
        if let Some(hitbox) = self.hitboxes.get_mut(child) {
            hitbox.parent = None;
            if hitbox.component_of == Some(parent) {
                hitbox.component_of = None;
                was_component = true;
            }
        }
        if let Some(hitbox) = self.hitboxes.get_mut(parent) {
            hitbox.children.retain(|id| *id != child);
            if was_component {
                if let HitboxShape::Composite { components } = &mut hitbox.shape {
                    components.retain(|_, id| *id != child);
                }
            }
        }
        self.set_subtree_owner(child, None, None);
        self.propagate_transform(child);
        if was_component {
            self.refresh_bounds_upward(parent);
        }
        true
    }

    /// Add `component` to a composite under `key`, replacing any component
    /// already stored there
    pub fn add_component(&mut self, composite: HitboxId, key: i32, component: HitboxId) -> bool {
        let Some(HitboxShape::Composite { components }) = self.hitboxes.get(composite).map(|hitbox| &hitbox.shape) else {
            log::debug!("add_component on a non-composite hitbox");
            return false;
        };
        let previous = components.get(&key).copied();
        if !self.can_attach(composite, component) {
            return false;
        }
        if let Some(previous) = previous {
            self.remove_child(composite, previous);
        }
        if !self.add_child(composite, component) {
            return false;
        }
        if let Some(hitbox) = self.hitboxes.get_mut(component) {
            hitbox.component_of = Some(composite);
        }
        if let Some(hitbox) = self.hitboxes.get_mut(composite) {
            if let HitboxShape::Composite { components } = &mut hitbox.shape {
                components.insert(key, component);
            }
        }
        self.refresh_bounds_upward(composite);
        true
    }

    /// Remove and return the component stored under `key`
    pub fn remove_component(&mut self, composite: HitboxId, key: i32) -> Option<HitboxId> {
        let component = self.hitboxes.get(composite)?.component(key)?;
        self.remove_child(composite, component).then_some(component)
    }

    /// Is `ancestor` on the parent chain of `id`?
    pub fn is_ancestor(&self, ancestor: HitboxId, id: HitboxId) -> bool {
        let mut current = self.hitboxes.get(id).and_then(|hitbox| hitbox.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.hitboxes.get(parent).and_then(|hitbox| hitbox.parent);
        }
        false
    }

    fn can_attach(&self, parent: HitboxId, child: HitboxId) -> bool {
        if parent == child {
            log::debug!("A hitbox cannot be its own child");
            return false;
        }
        let (Some(_), Some(candidate)) = (self.hitboxes.get(parent), self.hitboxes.get(child)) else {
            return false;
        };
        if candidate.parent.is_some() || candidate.object.is_some() {
            log::debug!("Hitbox {} already has a parent or an owner", candidate.serial);
            return false;
        }
        if self.is_ancestor(child, parent) {
            log::debug!("Attaching hitbox {} would create a cycle", candidate.serial);
            return false;
        }
        true
    }

    /// Set the owning object and world for `root` and everything below it
    pub(crate) fn set_subtree_owner(&mut self, root: HitboxId, object: Option<ObjectId>, state: Option<StateId>) {
        for id in self.subtree(root) {
            if let Some(hitbox) = self.hitboxes.get_mut(id) {
                hitbox.object = object;
                hitbox.state = state;
            }
        }
    }

    /// Set the world for `root` and everything below it
    pub(crate) fn set_subtree_state(&mut self, root: HitboxId, state: Option<StateId>) {
        for id in self.subtree(root) {
            if let Some(hitbox) = self.hitboxes.get_mut(id) {
                hitbox.state = state;
            }
        }
    }
}
