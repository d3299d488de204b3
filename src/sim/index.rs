//! Spatial entity index
//!
//! Owns every placed entity, keyed by a stable [`EntityId`], alongside a
//! derived grid-cell -> entity-set index. The footprint each entity was
//! registered under is tracked explicitly so that removal and reindexing never
//! depend on the entity's (possibly already mutated) current pose.
//!
//! Iteration order is id order, which is insertion order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::Vec2;

use super::entity::{Entity, EntityId, EntityKind, EntityTag};
use crate::GridCell;

/// Light origin and emission angle, the input to a cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emitter {
    pub origin: Vec2,
    pub angle: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    /// Authoritative entity store
    entities: BTreeMap<EntityId, Entity>,
    /// Cells each entity is currently registered under
    footprints: HashMap<EntityId, Vec<GridCell>>,
    /// Cell -> entities occupying it
    grid: HashMap<GridCell, BTreeSet<EntityId>>,
    /// Per-kind buckets, in insertion order
    mirrors: Vec<EntityId>,
    walls: Vec<EntityId>,
    crystals: Vec<EntityId>,
    light: Option<EntityId>,
    /// Next entity ID
    next_id: u32,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new entity ID
    fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add an entity, returning its new identifier
    ///
    /// A second light source replaces the first.
    pub fn add(&mut self, entity: Entity) -> EntityId {
        if entity.tag() == EntityTag::Light {
            if let Some(old) = self.light {
                log::warn!("Replacing light source {:?}", old);
                self.remove(old);
            }
        }

        let id = self.next_entity_id();
        match entity.tag() {
            EntityTag::Mirror => self.mirrors.push(id),
            EntityTag::Wall => self.walls.push(id),
            EntityTag::Crystal => self.crystals.push(id),
            EntityTag::Light => self.light = Some(id),
        }

        let cells = entity.footprint();
        self.entities.insert(id, entity);
        self.register(id, cells);
        id
    }

    /// Remove an entity from the store, its bucket and every cell it occupies
    ///
    /// Absent ids are ignored.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        match entity.tag() {
            EntityTag::Mirror => self.mirrors.retain(|&m| m != id),
            EntityTag::Wall => self.walls.retain(|&w| w != id),
            EntityTag::Crystal => self.crystals.retain(|&c| c != id),
            EntityTag::Light => {
                if self.light == Some(id) {
                    self.light = None;
                }
            }
        }
        self.unregister(id);
        Some(entity)
    }

    /// Re-register an entity under its current footprint
    ///
    /// Must follow any pose change made through [`SpatialIndex::get_mut`].
    pub fn reindex(&mut self, id: EntityId) {
        let Some(cells) = self.entities.get(&id).map(Entity::footprint) else {
            return;
        };
        self.unregister(id);
        self.register(id, cells);
    }

    fn register(&mut self, id: EntityId, cells: Vec<GridCell>) {
        for &cell in &cells {
            self.grid.entry(cell).or_default().insert(id);
        }
        self.footprints.insert(id, cells);
    }

    fn unregister(&mut self, id: EntityId) {
        let Some(cells) = self.footprints.remove(&id) else {
            return;
        };
        for cell in cells {
            if let Some(set) = self.grid.get_mut(&cell) {
                set.remove(&id);
                if set.is_empty() {
                    self.grid.remove(&cell);
                }
            }
        }
    }

    /// Move an entity to a new anchor cell and reindex it
    pub fn set_cell(&mut self, id: EntityId, cell: GridCell) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.cell = cell;
            self.reindex(id);
        }
    }

    /// Set a mirror's angle and reindex it
    pub fn set_mirror_angle(&mut self, id: EntityId, angle: f32) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.set_mirror_angle(angle);
            self.reindex(id);
        }
    }

    /// Rotate a mirror by ±90° in place; false if `id` is not a mirror
    pub fn rotate_mirror(&mut self, id: EntityId, clockwise: bool) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) if entity.tag() == EntityTag::Mirror => {
                entity.rotate_quarter(clockwise);
                self.reindex(id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable access; call [`SpatialIndex::reindex`] after changing the pose
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// All entities in id order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().map(|(&id, entity)| (id, entity))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ids registered in a cell, ascending
    pub fn entities_at(&self, cell: GridCell) -> Vec<EntityId> {
        self.grid
            .get(&cell)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether something could be placed at `cell`
    ///
    /// `excluding` lets a dragged entity ignore its own registration.
    pub fn can_place_at(&self, cell: GridCell, excluding: Option<EntityId>) -> bool {
        if !cell.in_bounds() {
            return false;
        }
        self.grid
            .get(&cell)
            .is_none_or(|set| set.iter().all(|&id| Some(id) == excluding))
    }

    /// Closest mirror whose center is strictly within `radius` of `point`
    pub fn nearest_mirror(&self, point: Vec2, radius: f32) -> Option<EntityId> {
        let mut best: Option<(EntityId, f32)> = None;
        for &id in &self.mirrors {
            let Some(mirror) = self.entities.get(&id) else {
                continue;
            };
            let dist = point.distance(mirror.center());
            if dist < radius && best.is_none_or(|(_, best_dist)| dist < best_dist) {
                best = Some((id, dist));
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn light(&self) -> Option<EntityId> {
        self.light
    }

    /// Origin and angle of the light source, if any
    pub fn emitter(&self) -> Option<Emitter> {
        let light = self.entities.get(&self.light?)?;
        match light.kind {
            EntityKind::Light { angle } => Some(Emitter {
                origin: light.center(),
                angle,
            }),
            _ => None,
        }
    }

    pub fn mirrors(&self) -> &[EntityId] {
        &self.mirrors
    }

    pub fn walls(&self) -> &[EntityId] {
        &self.walls
    }

    pub fn crystals(&self) -> &[EntityId] {
        &self.crystals
    }

    /// Mark a crystal lit for this pass
    pub fn activate_crystal(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.set_active(true);
        }
    }

    /// Clear every crystal's active flag
    pub fn reset_crystals(&mut self) {
        for id in &self.crystals {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.set_active(false);
            }
        }
    }

    /// True iff there is at least one crystal and every crystal is lit
    pub fn check_win_condition(&self) -> bool {
        !self.crystals.is_empty()
            && self
                .crystals
                .iter()
                .all(|id| self.entities.get(id).is_some_and(Entity::is_active))
    }

    /// Drop every entity; ids keep counting up
    pub fn clear(&mut self) {
        self.entities.clear();
        self.footprints.clear();
        self.grid.clear();
        self.mirrors.clear();
        self.walls.clear();
        self.crystals.clear();
        self.light = None;
    }

    /// Whether the grid is exactly the inverse of the entities' footprints
    pub fn is_consistent(&self) -> bool {
        let mut expected: HashMap<GridCell, BTreeSet<EntityId>> = HashMap::new();
        for (&id, entity) in &self.entities {
            let cells = entity.footprint();
            if self.footprints.get(&id) != Some(&cells) {
                return false;
            }
            for cell in cells {
                expected.entry(cell).or_default().insert(id);
            }
        }
        self.footprints.len() == self.entities.len() && expected == self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_center;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_add_registers_every_wall_cell() {
        let mut index = SpatialIndex::new();
        let id = index.add(Entity::wall(GridCell::new(2, 3), 3, 2));
        for dx in 0..3 {
            for dy in 0..2 {
                assert_eq!(index.entities_at(GridCell::new(2 + dx, 3 + dy)), vec![id]);
            }
        }
        assert!(index.entities_at(GridCell::new(5, 3)).is_empty());
        assert_eq!(index.walls(), &[id]);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_add_remove_round_trip_point() {
        let mut index = SpatialIndex::new();
        index.add(Entity::crystal(GridCell::new(4, 4)));
        let before = index.grid.clone();

        let id = index.add(Entity::mirror(GridCell::new(4, 4), FRAC_PI_4));
        assert_eq!(index.entities_at(GridCell::new(4, 4)).len(), 2);
        index.remove(id);

        assert_eq!(index.grid, before);
        assert!(index.mirrors().is_empty());
        assert!(index.is_consistent());
    }

    #[test]
    fn test_add_remove_round_trip_wall() {
        let mut index = SpatialIndex::new();
        index.add(Entity::light(GridCell::new(1, 1), 0.0));
        let before = index.grid.clone();

        let id = index.add(Entity::wall(GridCell::new(0, 0), 20, 1));
        assert_eq!(index.grid.len(), 21);
        index.remove(id);

        assert_eq!(index.grid, before);
        assert!(index.walls().is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut index = SpatialIndex::new();
        let id = index.add(Entity::crystal(GridCell::new(1, 1)));
        assert!(index.remove(id).is_some());
        assert!(index.remove(id).is_none());
        assert!(index.remove(EntityId(999)).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_reindex_drops_stale_cells() {
        let mut index = SpatialIndex::new();
        let id = index.add(Entity::mirror(GridCell::new(3, 3), FRAC_PI_4));

        index.get_mut(id).unwrap().cell = GridCell::new(8, 9);
        // Pose changed but not yet reindexed
        assert!(!index.is_consistent());

        index.reindex(id);
        assert!(index.entities_at(GridCell::new(3, 3)).is_empty());
        assert_eq!(index.entities_at(GridCell::new(8, 9)), vec![id]);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_set_cell_keeps_id_and_order() {
        let mut index = SpatialIndex::new();
        let a = index.add(Entity::mirror(GridCell::new(1, 1), FRAC_PI_4));
        let b = index.add(Entity::mirror(GridCell::new(2, 2), FRAC_PI_4));
        index.set_cell(a, GridCell::new(5, 5));

        let order: Vec<_> = index.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, b]);
        assert_eq!(index.mirrors(), &[a, b]);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_can_place_at() {
        let mut index = SpatialIndex::new();
        index.add(Entity::wall(GridCell::new(5, 5), 2, 1));
        let mirror = index.add(Entity::mirror(GridCell::new(8, 8), FRAC_PI_4));

        assert!(!index.can_place_at(GridCell::new(6, 5), None));
        assert!(index.can_place_at(GridCell::new(7, 5), None));
        assert!(!index.can_place_at(GridCell::new(8, 8), None));
        // A dragged mirror does not block itself
        assert!(index.can_place_at(GridCell::new(8, 8), Some(mirror)));
        // Out of bounds
        assert!(!index.can_place_at(GridCell::new(20, 0), None));
        assert!(!index.can_place_at(GridCell::new(0, -1), Some(mirror)));
    }

    #[test]
    fn test_nearest_mirror() {
        let mut index = SpatialIndex::new();
        let a = index.add(Entity::mirror(GridCell::new(2, 2), FRAC_PI_4));
        let b = index.add(Entity::mirror(GridCell::new(3, 2), FRAC_PI_4));

        let near_b = cell_center(GridCell::new(3, 2)) + Vec2::new(-5.0, 0.0);
        assert_eq!(index.nearest_mirror(near_b, 30.0), Some(b));

        let near_a = cell_center(GridCell::new(2, 2)) + Vec2::new(0.0, 10.0);
        assert_eq!(index.nearest_mirror(near_a, 30.0), Some(a));

        let far = cell_center(GridCell::new(10, 10));
        assert_eq!(index.nearest_mirror(far, 30.0), None);
        // Coarser radius reaches further
        let between = cell_center(GridCell::new(2, 3)) + Vec2::new(0.0, 5.0);
        assert_eq!(index.nearest_mirror(between, 30.0), None);
        assert_eq!(index.nearest_mirror(between, 50.0), Some(a));
    }

    #[test]
    fn test_win_condition() {
        let mut index = SpatialIndex::new();
        assert!(!index.check_win_condition());

        let a = index.add(Entity::crystal(GridCell::new(1, 1)));
        let b = index.add(Entity::crystal(GridCell::new(2, 2)));
        assert!(!index.check_win_condition());

        index.activate_crystal(a);
        assert!(!index.check_win_condition());
        index.activate_crystal(b);
        assert!(index.check_win_condition());

        index.reset_crystals();
        assert!(!index.check_win_condition());
    }

    #[test]
    fn test_second_light_replaces_first() {
        let mut index = SpatialIndex::new();
        let first = index.add(Entity::light(GridCell::new(1, 1), 0.0));
        let second = index.add(Entity::light(GridCell::new(2, 2), 1.0));

        assert_eq!(index.light(), Some(second));
        assert!(index.get(first).is_none());
        assert!(index.can_place_at(GridCell::new(1, 1), None));
        let emitter = index.emitter().unwrap();
        assert_eq!(emitter.origin, cell_center(GridCell::new(2, 2)));
        assert_eq!(emitter.angle, 1.0);
    }

    #[test]
    fn test_clear() {
        let mut index = SpatialIndex::new();
        index.add(Entity::light(GridCell::new(1, 1), 0.0));
        index.add(Entity::wall(GridCell::new(0, 0), 3, 3));
        index.clear();
        assert!(index.is_empty());
        assert!(index.emitter().is_none());
        assert!(index.entities_at(GridCell::new(0, 0)).is_empty());
        assert!(index.is_consistent());
    }

    fn arb_entity() -> impl Strategy<Value = Entity> {
        let cell = (-2..22i32, -2..17i32).prop_map(|(x, y)| GridCell::new(x, y));
        prop_oneof![
            (cell.clone(), 0.0..6.3f32).prop_map(|(c, a)| Entity::mirror(c, a)),
            (cell.clone(), 1..5u32, 1..5u32).prop_map(|(c, w, h)| Entity::wall(c, w, h)),
            cell.prop_map(Entity::crystal),
        ]
    }

    proptest! {
        #[test]
        fn prop_add_then_remove_restores_grid(
            base in prop::collection::vec(arb_entity(), 0..8),
            extra in arb_entity(),
        ) {
            let mut index = SpatialIndex::new();
            for entity in base {
                index.add(entity);
            }
            let before = index.grid.clone();

            let id = index.add(extra);
            index.remove(id);

            prop_assert_eq!(&index.grid, &before);
            prop_assert!(index.is_consistent());
        }

        #[test]
        fn prop_moves_keep_index_consistent(
            entities in prop::collection::vec(arb_entity(), 1..8),
            moves in prop::collection::vec((0..8usize, 0..20i32, 0..15i32), 0..16),
        ) {
            let mut index = SpatialIndex::new();
            let ids: Vec<_> = entities.into_iter().map(|e| index.add(e)).collect();
            for (which, x, y) in moves {
                let id = ids[which % ids.len()];
                index.set_cell(id, GridCell::new(x, y));
                prop_assert!(index.is_consistent());
            }
        }
    }
}
