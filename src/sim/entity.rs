//! Placed entities
//!
//! An entity is a grid cell plus a closed set of kinds. Kind is fixed for the
//! entity's lifetime; the cell (and a mirror's angle) can change, after which
//! the owning [`SpatialIndex`](super::SpatialIndex) must be reindexed.

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{ARENA_COLS, ARENA_ROWS, GRID_SIZE, MIRROR_HALF_LENGTH};
use crate::{GridCell, cell_center, cell_origin, normalize_angle};

/// Stable entity identifier, allocated in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Kind tag without per-kind data, used for buckets and dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityTag {
    Light,
    Mirror,
    Wall,
    Crystal,
}

/// Entity kinds with their kind-specific state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Light source emitting a single beam at `angle` (radians)
    Light { angle: f32 },
    /// Two-sided flat mirror through the cell center
    Mirror { angle: f32, half_length: f32 },
    /// Axis-aligned block covering `width` x `height` cells
    Wall { width: u32, height: u32 },
    /// Target; `active` is derived per propagation pass
    Crystal { active: bool },
}

/// A placed entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub cell: GridCell,
    pub kind: EntityKind,
}

impl Entity {
    pub fn light(cell: GridCell, angle: f32) -> Self {
        Self {
            cell,
            kind: EntityKind::Light { angle },
        }
    }

    pub fn mirror(cell: GridCell, angle: f32) -> Self {
        Self {
            cell,
            kind: EntityKind::Mirror {
                angle: normalize_angle(angle),
                half_length: MIRROR_HALF_LENGTH,
            },
        }
    }

    /// A wall; each dimension is clamped to between one cell and the arena size
    pub fn wall(cell: GridCell, width: u32, height: u32) -> Self {
        Self {
            cell,
            kind: EntityKind::Wall {
                width: width.clamp(1, ARENA_COLS as u32),
                height: height.clamp(1, ARENA_ROWS as u32),
            },
        }
    }

    pub fn crystal(cell: GridCell) -> Self {
        Self {
            cell,
            kind: EntityKind::Crystal { active: false },
        }
    }

    pub fn tag(&self) -> EntityTag {
        match self.kind {
            EntityKind::Light { .. } => EntityTag::Light,
            EntityKind::Mirror { .. } => EntityTag::Mirror,
            EntityKind::Wall { .. } => EntityTag::Wall,
            EntityKind::Crystal { .. } => EntityTag::Crystal,
        }
    }

    /// World-space center of the anchor cell
    pub fn center(&self) -> Vec2 {
        cell_center(self.cell)
    }

    /// Every grid cell the entity occupies, row-major from the anchor
    pub fn footprint(&self) -> Vec<GridCell> {
        match self.kind {
            EntityKind::Wall { width, height } => {
                // Dimensions are clamped to the arena, so the product is small
                let mut cells = Vec::with_capacity((width * height) as usize);
                for dy in 0..height as i32 {
                    for dx in 0..width as i32 {
                        cells.extend(self.cell.checked_offset(dx, dy));
                    }
                }
                cells
            }
            _ => vec![self.cell],
        }
    }

    /// World-space bounds (min, max) of a wall; `None` for other kinds
    pub fn wall_bounds(&self) -> Option<(Vec2, Vec2)> {
        match self.kind {
            EntityKind::Wall { width, height } => {
                let min = cell_origin(self.cell);
                let size = Vec2::new(width as f32, height as f32) * GRID_SIZE;
                Some((min, min + size))
            }
            _ => None,
        }
    }

    /// Orientation angle of a light or mirror
    pub fn angle(&self) -> Option<f32> {
        match self.kind {
            EntityKind::Light { angle } | EntityKind::Mirror { angle, .. } => Some(angle),
            _ => None,
        }
    }

    /// Whether this is a crystal lit during the last pass
    pub fn is_active(&self) -> bool {
        matches!(self.kind, EntityKind::Crystal { active: true })
    }

    /// Set a crystal's active flag; no-op for other kinds
    pub(crate) fn set_active(&mut self, value: bool) {
        if let EntityKind::Crystal { active } = &mut self.kind {
            *active = value;
        }
    }

    /// Set a mirror's angle (normalized to [0, 2π)); no-op for other kinds
    pub(crate) fn set_mirror_angle(&mut self, value: f32) {
        if let EntityKind::Mirror { angle, .. } = &mut self.kind {
            *angle = normalize_angle(value);
        }
    }

    /// Rotate a mirror in place by a quarter turn
    pub(crate) fn rotate_quarter(&mut self, clockwise: bool) {
        if let EntityKind::Mirror { angle, .. } = self.kind {
            let delta = if clockwise { FRAC_PI_2 } else { -FRAC_PI_2 };
            self.set_mirror_angle(angle + delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_4, PI};

    #[test]
    fn test_wall_footprint_covers_every_cell() {
        let wall = Entity::wall(GridCell::new(5, 5), 3, 2);
        let cells = wall.footprint();
        assert_eq!(cells.len(), 6);
        assert!(cells.contains(&GridCell::new(5, 5)));
        assert!(cells.contains(&GridCell::new(7, 6)));
        assert!(!cells.contains(&GridCell::new(8, 5)));
    }

    #[test]
    fn test_point_footprint() {
        assert_eq!(Entity::crystal(GridCell::new(4, 2)).footprint(), vec![GridCell::new(4, 2)]);
        assert_eq!(Entity::light(GridCell::new(1, 1), 0.0).footprint().len(), 1);
    }

    #[test]
    fn test_zero_sized_wall_clamped() {
        let wall = Entity::wall(GridCell::new(0, 0), 0, 0);
        assert_eq!(wall.footprint(), vec![GridCell::new(0, 0)]);
    }

    #[test]
    fn test_oversized_wall_clamped_to_arena() {
        let wall = Entity::wall(GridCell::new(0, 0), 70_000, 70_000);
        assert_eq!(wall.footprint().len(), 300);
        assert!(matches!(wall.kind, EntityKind::Wall { width: 20, height: 15 }));
    }

    #[test]
    fn test_footprint_stops_at_coordinate_limit() {
        let wall = Entity::wall(GridCell::new(i32::MAX - 1, 0), 4, 1);
        assert_eq!(
            wall.footprint(),
            vec![GridCell::new(i32::MAX - 1, 0), GridCell::new(i32::MAX, 0)]
        );
    }

    #[test]
    fn test_wall_bounds() {
        let (min, max) = Entity::wall(GridCell::new(1, 2), 2, 1).wall_bounds().unwrap();
        assert_eq!(min, Vec2::new(40.0, 80.0));
        assert_eq!(max, Vec2::new(120.0, 120.0));
        assert!(Entity::crystal(GridCell::new(0, 0)).wall_bounds().is_none());
    }

    #[test]
    fn test_mirror_rotation_wraps() {
        let mut mirror = Entity::mirror(GridCell::new(3, 3), FRAC_PI_4);
        mirror.rotate_quarter(false);
        let angle = mirror.angle().unwrap();
        assert!((angle - (2.0 * PI - FRAC_PI_4)).abs() < 1e-5);

        mirror.rotate_quarter(true);
        assert!((mirror.angle().unwrap() - FRAC_PI_4).abs() < 1e-5);
    }

    #[test]
    fn test_crystal_activation_flag() {
        let mut crystal = Entity::crystal(GridCell::new(0, 0));
        assert!(!crystal.is_active());
        crystal.set_active(true);
        assert!(crystal.is_active());

        let mut wall = Entity::wall(GridCell::new(0, 0), 1, 1);
        wall.set_active(true);
        assert!(!wall.is_active());
    }
}
