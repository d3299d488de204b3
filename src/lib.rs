//! Light Maze - light propagation and solvability core for a mirror puzzle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (vectors, intersections, spatial index, ray casting, play session)
//! - `level`: Level definition data model and lint checks
//! - `solver`: Single-mirror solvability search and hints
//! - `config`: Tunable engine parameters

pub mod config;
pub mod error;
pub mod level;
pub mod sim;
pub mod solver;

pub use config::EngineConfig;
pub use error::Error;
pub use level::LevelDefinition;
pub use solver::{LevelValidator, MirrorPlacement, Solution, Validation};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Size of one grid cell in world units
    pub const GRID_SIZE: f32 = 40.0;

    /// Arena dimensions in cells
    pub const ARENA_COLS: i32 = 20;
    pub const ARENA_ROWS: i32 = 15;
    /// Arena dimensions in world units
    pub const ARENA_WIDTH: f32 = ARENA_COLS as f32 * GRID_SIZE;
    pub const ARENA_HEIGHT: f32 = ARENA_ROWS as f32 * GRID_SIZE;

    /// Ray march step length
    pub const STEP_SIZE: f32 = 2.0;
    /// Maximum reflection depth (rays at this depth are never spawned)
    pub const MAX_DEPTH: u32 = 10;
    /// Step ceiling per ray segment
    pub const MAX_STEPS: u32 = 1000;
    /// Offset applied to a reflected ray origin so it clears the mirror
    pub const REFLECT_OFFSET: f32 = 1.0;

    /// Mirror reflective half-length (0.35 of a cell)
    pub const MIRROR_HALF_LENGTH: f32 = GRID_SIZE * 0.35;
    /// Below this |dir . normal| a ray counts as parallel to a mirror
    pub const PARALLEL_EPSILON: f32 = 0.001;

    /// Crystal capture radius
    pub const CRYSTAL_CAPTURE_RADIUS: f32 = 15.0;
    /// Distance a ray skips past a crystal it just lit
    pub const CRYSTAL_CLEARANCE: f32 = 20.0;

    /// Mirror pick radius for mouse input
    pub const PICK_RADIUS: f32 = 30.0;
    /// Larger pick radius for touch input
    pub const TOUCH_PICK_RADIUS: f32 = 35.0;
}

/// A grid cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether the cell lies inside the playable 20x15 arena
    #[inline]
    pub fn in_bounds(self) -> bool {
        self.x >= 0 && self.x < consts::ARENA_COLS && self.y >= 0 && self.y < consts::ARENA_ROWS
    }

    /// The cell offset by (dx, dy), saturating at the `i32` range
    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// The cell offset by (dx, dy), or `None` past the `i32` range
    #[inline]
    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }
}

/// World-space center of a grid cell
#[inline]
pub fn cell_center(cell: GridCell) -> Vec2 {
    use consts::GRID_SIZE;
    Vec2::new(
        cell.x as f32 * GRID_SIZE + GRID_SIZE / 2.0,
        cell.y as f32 * GRID_SIZE + GRID_SIZE / 2.0,
    )
}

/// World-space top-left corner of a grid cell
#[inline]
pub fn cell_origin(cell: GridCell) -> Vec2 {
    Vec2::new(cell.x as f32, cell.y as f32) * consts::GRID_SIZE
}

/// Grid cell containing a world point
#[inline]
pub fn cell_at(point: Vec2) -> GridCell {
    GridCell::new(
        (point.x / consts::GRID_SIZE).floor() as i32,
        (point.y / consts::GRID_SIZE).floor() as i32,
    )
}

/// Normalize an angle to [0, 2π)
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    angle.rem_euclid(std::f32::consts::TAU)
}
