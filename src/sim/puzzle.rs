//! Play session for one level
//!
//! Owns the level's spatial index (fixed geometry plus draggable mirrors) and
//! applies player moves between propagation passes. Every method takes
//! `&mut self` and runs to completion, so a move can never interleave with a
//! cast.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::caster::{Ray, RayCaster};
use super::entity::EntityId;
use super::index::SpatialIndex;
use crate::GridCell;
use crate::level::LevelDefinition;

/// Something the presentation layer may want to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuzzleEvent {
    /// A crystal lit up this pass that was dark in the previous one
    CrystalActivated { id: EntityId },
    /// Every crystal is lit; fires once per attempt
    LevelComplete { moves: u32 },
}

/// Saved mirror pose for undo
#[derive(Debug, Clone, Copy)]
struct MirrorPose {
    id: EntityId,
    cell: GridCell,
    angle: f32,
}

/// Undo snapshot
#[derive(Debug, Clone)]
struct Snapshot {
    mirrors: Vec<MirrorPose>,
    move_count: u32,
}

/// One level being played
#[derive(Debug, Clone)]
pub struct Puzzle {
    level: LevelDefinition,
    caster: RayCaster,
    index: SpatialIndex,
    mirrors: Vec<EntityId>,
    rays: Vec<Ray>,
    move_count: u32,
    history: Vec<Snapshot>,
    complete: bool,
}

impl Puzzle {
    pub fn load(level: LevelDefinition, caster: RayCaster) -> Self {
        let (index, mirrors) = level.build_index();
        log::debug!(
            "Loaded '{}' with {} entities, {} mirrors",
            level.display_name(),
            index.len(),
            mirrors.len()
        );
        Self {
            level,
            caster,
            index,
            mirrors,
            rays: Vec::new(),
            move_count: 0,
            history: Vec::new(),
            complete: false,
        }
    }

    /// Rebuild the level from its definition; clears moves and history
    pub fn reset(&mut self) {
        let (index, mirrors) = self.level.build_index();
        self.index = index;
        self.mirrors = mirrors;
        self.rays.clear();
        self.move_count = 0;
        self.history.clear();
        self.complete = false;
    }

    pub fn level(&self) -> &LevelDefinition {
        &self.level
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Draggable mirror ids in declaration order
    pub fn mirrors(&self) -> &[EntityId] {
        &self.mirrors
    }

    /// Rays from the most recent tick
    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn can_undo(&self) -> bool {
        !self.complete && !self.history.is_empty()
    }

    /// Mirror under a pointer position
    pub fn mirror_at(&self, point: Vec2, touch: bool) -> Option<EntityId> {
        let radius = self.caster.config().pick_radius_for(touch);
        self.index.nearest_mirror(point, radius)
    }

    /// Move a mirror to `cell` if the cell is free and in bounds
    ///
    /// Moves are rejected once the level is complete.
    pub fn drag_mirror(&mut self, id: EntityId, cell: GridCell) -> bool {
        if self.complete || !self.mirrors.contains(&id) || !self.index.can_place_at(cell, Some(id)) {
            return false;
        }
        if self.index.get(id).is_some_and(|m| m.cell == cell) {
            return false;
        }
        self.save_state();
        self.index.set_cell(id, cell);
        self.move_count += 1;
        true
    }

    /// Rotate a mirror a quarter turn in place
    pub fn rotate_mirror(&mut self, id: EntityId, clockwise: bool) -> bool {
        if self.complete || !self.mirrors.contains(&id) {
            return false;
        }
        self.save_state();
        self.index.rotate_mirror(id, clockwise);
        self.move_count += 1;
        true
    }

    fn save_state(&mut self) {
        let mirrors = self
            .mirrors
            .iter()
            .filter_map(|&id| {
                let mirror = self.index.get(id)?;
                Some(MirrorPose {
                    id,
                    cell: mirror.cell,
                    angle: mirror.angle()?,
                })
            })
            .collect();
        self.history.push(Snapshot {
            mirrors,
            move_count: self.move_count,
        });
    }

    /// Restore the mirror poses and move count from before the last move
    pub fn undo(&mut self) -> bool {
        if self.complete {
            return false;
        }
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        for pose in snapshot.mirrors {
            self.index.set_cell(pose.id, pose.cell);
            self.index.set_mirror_angle(pose.id, pose.angle);
        }
        self.move_count = snapshot.move_count;
        true
    }

    /// Recast the light and report what changed
    pub fn tick(&mut self) -> Vec<PuzzleEvent> {
        let previously_active: Vec<EntityId> = self
            .index
            .crystals()
            .iter()
            .copied()
            .filter(|&id| self.index.get(id).is_some_and(|c| c.is_active()))
            .collect();

        self.rays = self.caster.cast_level(&mut self.index);

        let mut events: Vec<PuzzleEvent> = self
            .index
            .crystals()
            .iter()
            .copied()
            .filter(|&id| {
                self.index.get(id).is_some_and(|c| c.is_active()) && !previously_active.contains(&id)
            })
            .map(|id| PuzzleEvent::CrystalActivated { id })
            .collect();

        if self.index.check_win_condition() && !self.complete {
            self.complete = true;
            log::info!(
                "'{}' complete in {} moves",
                self.level.display_name(),
                self.move_count
            );
            events.push(PuzzleEvent::LevelComplete {
                moves: self.move_count,
            });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_center;
    use crate::level::{CrystalDef, LightDef, MirrorDef, WallDef};
    use std::f32::consts::FRAC_PI_4;

    /// Beam runs east along row 7; crystal sits below at (7, 11)
    fn level() -> LevelDefinition {
        LevelDefinition {
            name: Some("Corner".into()),
            par_moves: Some(1),
            light_source: Some(LightDef { x: 2, y: 7, angle: 0.0 }),
            walls: vec![
                WallDef { x: 0, y: 0, width: 20, height: 1 },
                WallDef { x: 0, y: 14, width: 20, height: 1 },
                WallDef { x: 0, y: 0, width: 1, height: 15 },
                WallDef { x: 19, y: 0, width: 1, height: 15 },
            ],
            crystals: vec![CrystalDef { x: 7, y: 11 }],
            mirrors: vec![MirrorDef { x: 7, y: 3, angle: FRAC_PI_4 }],
            ..Default::default()
        }
    }

    #[test]
    fn test_drag_onto_beam_completes_level() {
        let mut puzzle = Puzzle::load(level(), RayCaster::new());
        assert!(puzzle.tick().is_empty());
        assert!(!puzzle.is_complete());

        let mirror = puzzle.mirrors()[0];
        assert!(puzzle.drag_mirror(mirror, GridCell::new(7, 7)));
        assert_eq!(puzzle.move_count(), 1);

        let crystal = puzzle.index().crystals()[0];
        let events = puzzle.tick();
        assert_eq!(
            events,
            vec![
                PuzzleEvent::CrystalActivated { id: crystal },
                PuzzleEvent::LevelComplete { moves: 1 },
            ]
        );
        assert_eq!(puzzle.rays().len(), 2);

        // Steady state: nothing new to report
        assert!(puzzle.tick().is_empty());
        assert!(puzzle.is_complete());
    }

    #[test]
    fn test_drag_rejects_occupied_and_out_of_bounds() {
        let mut puzzle = Puzzle::load(level(), RayCaster::new());
        let mirror = puzzle.mirrors()[0];

        // Wall cell, light cell, crystal cell, off the board
        assert!(!puzzle.drag_mirror(mirror, GridCell::new(0, 5)));
        assert!(!puzzle.drag_mirror(mirror, GridCell::new(2, 7)));
        assert!(!puzzle.drag_mirror(mirror, GridCell::new(7, 11)));
        assert!(!puzzle.drag_mirror(mirror, GridCell::new(20, 5)));
        // Same cell is not a move
        assert!(!puzzle.drag_mirror(mirror, GridCell::new(7, 3)));

        assert_eq!(puzzle.move_count(), 0);
        assert!(!puzzle.can_undo());
        assert_eq!(puzzle.index().get(mirror).unwrap().cell, GridCell::new(7, 3));
    }

    #[test]
    fn test_rotate_and_undo() {
        let mut puzzle = Puzzle::load(level(), RayCaster::new());
        let mirror = puzzle.mirrors()[0];

        assert!(puzzle.drag_mirror(mirror, GridCell::new(7, 7)));
        assert!(puzzle.rotate_mirror(mirror, true));
        assert_eq!(puzzle.move_count(), 2);
        let angle = puzzle.index().get(mirror).unwrap().angle().unwrap();
        assert!((angle - 3.0 * FRAC_PI_4).abs() < 1e-5);

        assert!(puzzle.undo());
        let restored = puzzle.index().get(mirror).unwrap();
        assert!((restored.angle().unwrap() - FRAC_PI_4).abs() < 1e-5);
        assert_eq!(restored.cell, GridCell::new(7, 7));
        assert_eq!(puzzle.move_count(), 1);

        assert!(puzzle.undo());
        assert_eq!(puzzle.index().get(mirror).unwrap().cell, GridCell::new(7, 3));
        assert_eq!(puzzle.index().entities_at(GridCell::new(7, 7)), vec![]);
        assert_eq!(puzzle.move_count(), 0);
        assert!(puzzle.index().is_consistent());

        assert!(!puzzle.undo());
    }

    #[test]
    fn test_moves_rejected_after_completion() {
        let mut puzzle = Puzzle::load(level(), RayCaster::new());
        let mirror = puzzle.mirrors()[0];
        assert!(puzzle.drag_mirror(mirror, GridCell::new(7, 7)));
        assert!(puzzle.tick().contains(&PuzzleEvent::LevelComplete { moves: 1 }));

        assert!(!puzzle.drag_mirror(mirror, GridCell::new(8, 8)));
        assert!(!puzzle.rotate_mirror(mirror, true));
        assert!(!puzzle.undo());
        assert_eq!(puzzle.move_count(), 1);
        assert_eq!(puzzle.index().get(mirror).unwrap().cell, GridCell::new(7, 7));
        assert!(!puzzle.can_undo());

        // A fresh attempt accepts moves again
        puzzle.reset();
        let mirror = puzzle.mirrors()[0];
        assert!(puzzle.drag_mirror(mirror, GridCell::new(8, 8)));
    }

    #[test]
    fn test_mirror_at_pick_radius() {
        let puzzle = Puzzle::load(level(), RayCaster::new());
        let mirror = puzzle.mirrors()[0];
        let center = cell_center(GridCell::new(7, 3));

        assert_eq!(puzzle.mirror_at(center + Vec2::new(29.0, 0.0), false), Some(mirror));
        assert_eq!(puzzle.mirror_at(center + Vec2::new(32.0, 0.0), false), None);
        assert_eq!(puzzle.mirror_at(center + Vec2::new(32.0, 0.0), true), Some(mirror));
    }

    #[test]
    fn test_reset_restores_level() {
        let mut puzzle = Puzzle::load(level(), RayCaster::new());
        let mirror = puzzle.mirrors()[0];
        puzzle.drag_mirror(mirror, GridCell::new(7, 7));
        puzzle.tick();
        assert!(puzzle.is_complete());

        puzzle.reset();
        assert_eq!(puzzle.move_count(), 0);
        assert!(!puzzle.is_complete());
        assert!(!puzzle.can_undo());
        assert!(puzzle.rays().is_empty());
        let mirror = puzzle.mirrors()[0];
        assert_eq!(puzzle.index().get(mirror).unwrap().cell, GridCell::new(7, 3));
        assert!(puzzle.tick().is_empty());
    }

    #[test]
    fn test_unknown_mirror_rejected() {
        let mut puzzle = Puzzle::load(level(), RayCaster::new());
        let light = puzzle.index().light().unwrap();
        assert!(!puzzle.rotate_mirror(light, true));
        assert!(!puzzle.drag_mirror(light, GridCell::new(5, 5)));
        assert_eq!(puzzle.move_count(), 0);
    }
}
