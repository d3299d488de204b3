//! Deterministic simulation module
//!
//! All light and placement logic lives here. This module must be pure and deterministic:
//! - Fixed step length and step/depth ceilings only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod caster;
pub mod entity;
pub mod index;
pub mod intersect;
pub mod puzzle;
pub mod vector;

pub use caster::{Ray, RayCaster, RayEnd};
pub use entity::{Entity, EntityId, EntityKind, EntityTag};
pub use index::{Emitter, SpatialIndex};
pub use intersect::{Hit, crystal_hit, entity_hit, mirror_hit, wall_hit};
pub use puzzle::{Puzzle, PuzzleEvent};
