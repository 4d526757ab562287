//! Keeping hitboxes filed in their world's grid
//!
//! A hitbox is filed under each grid role it currently serves while its
//! object is in a world. The cell range is computed when the first role is
//! filed and dropped when the last one is unfiled; in between it follows the
//! hitbox's bounding box, grown where needed to cover its position so that
//! center queries find offset shapes.

use super::grid::GridEntry;
use super::spatial_query::SpatialIndex;
use crate::engine::Engine;
use crate::foundation::collections::HitboxId;
use crate::physics::{Direction, Directions, HitboxRoles};

impl Engine {
    pub(crate) fn grid_entry(&self, id: HitboxId) -> Option<GridEntry> {
        let hitbox = self.hitboxes.get(id)?;
        let draw_priority = hitbox
            .object
            .and_then(|object| self.objects.get(object))
            .map_or(0, |object| object.draw_priority);
        Some(GridEntry {
            hitbox: id,
            serial: hitbox.serial,
            draw_priority,
            surfaces: hitbox.solid_surfaces,
        })
    }

    /// File `id` under `roles` in the grid of its world
    pub(crate) fn register_roles(&mut self, id: HitboxId, roles: HitboxRoles) {
        let Some(entry) = self.grid_entry(id) else {
            return;
        };
        let Some(hitbox) = self.hitboxes.get_mut(id) else {
            return;
        };
        let roles = roles - hitbox.cell_roles;
        let Some(state) = hitbox.state else {
            return;
        };
        let Some(level) = self.states.get_mut(state) else {
            return;
        };
        if roles.is_empty() {
            return;
        }
        let range = hitbox.cell_range.unwrap_or_else(|| level.grid.cell_range(&hitbox.filing_bounds()));
        SpatialIndex::insert(&mut level.grid, &entry, range, roles);
        hitbox.cell_range = Some(range);
        hitbox.cell_roles |= roles;
        log::trace!("Filed hitbox {} as {:?} in {:?}", hitbox.serial, roles, range);
    }

    /// Unfile `id`'s `roles` from the grid of its world
    pub(crate) fn unregister_roles(&mut self, id: HitboxId, roles: HitboxRoles) {
        let Some(entry) = self.grid_entry(id) else {
            return;
        };
        let Some(hitbox) = self.hitboxes.get_mut(id) else {
            return;
        };
        let roles = roles & hitbox.cell_roles;
        let (Some(range), Some(state)) = (hitbox.cell_range, hitbox.state) else {
            return;
        };
        if roles.is_empty() {
            return;
        }
        if let Some(level) = self.states.get_mut(state) {
            SpatialIndex::remove(&mut level.grid, &entry, range, roles);
        }
        hitbox.cell_roles -= roles;
        if hitbox.cell_roles.is_empty() {
            hitbox.cell_range = None;
        }
    }

    /// Move a filed hitbox to the cells its current bounds touch
    pub(crate) fn update_cell_registration(&mut self, id: HitboxId) {
        let Some(entry) = self.grid_entry(id) else {
            return;
        };
        let Some(hitbox) = self.hitboxes.get_mut(id) else {
            return;
        };
        let (Some(old_range), Some(state)) = (hitbox.cell_range, hitbox.state) else {
            return;
        };
        let Some(level) = self.states.get_mut(state) else {
            return;
        };
        let new_range = level.grid.cell_range(&hitbox.filing_bounds());
        if new_range != old_range {
            level.grid.relocate(&entry, old_range, new_range, hitbox.cell_roles);
            hitbox.cell_range = Some(new_range);
        }
    }

    /// Refile `id` under `roles` after something its grid entry carries
    /// (draw priority, solid surfaces) has changed
    pub(crate) fn refile(&mut self, id: HitboxId, roles: HitboxRoles, change: impl FnOnce(&mut Self)) {
        let filed = self.hitboxes.get(id).map_or(HitboxRoles::empty(), |hitbox| hitbox.cell_roles & roles);
        self.unregister_roles(id, filed);
        change(self);
        self.register_roles(id, filed);
    }

    /// Make one side of a hitbox solid or not
    pub fn set_solid_surface(&mut self, id: HitboxId, direction: Direction, solid: bool) -> bool {
        let Some(current) = self.hitboxes.get(id).map(|hitbox| hitbox.solid_surfaces) else {
            return false;
        };
        let mut surfaces = current;
        surfaces.set(Directions::from(direction), solid);
        self.set_solid_surfaces(id, surfaces)
    }

    /// Replace the set of solid sides of a hitbox
    pub fn set_solid_surfaces(&mut self, id: HitboxId, surfaces: Directions) -> bool {
        if !self.hitboxes.contains_key(id) {
            return false;
        }
        self.refile(id, HitboxRoles::SOLID, |engine| {
            if let Some(hitbox) = engine.hitboxes.get_mut(id) {
                hitbox.solid_surfaces = surfaces;
            }
        });
        true
    }
}
