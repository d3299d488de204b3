//! Level solvability checks
//!
//! A level is valid when the simulation can be driven to a win: either the
//! light already reaches every crystal, or one of the level's draggable
//! mirrors placed on a strategic cell at 45° or 135° completes it. Every
//! reported solution is a witness that was verified by casting.
//!
//! Combinations of two or more mirrors are not searched, so `None` means
//! "no single-mirror solution", not "unsolvable".

use std::collections::HashSet;
use std::f32::consts::FRAC_PI_4;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::level::LevelDefinition;
use crate::sim::{Entity, Ray, RayCaster, SpatialIndex};
use crate::{GridCell, cell_at};

/// Angles tried for every candidate cell, in order
const CANDIDATE_ANGLES: [f32; 2] = [FRAC_PI_4, 3.0 * FRAC_PI_4];

const UNSOLVABLE_HINT: &str = "This level cannot be solved in its current design.";
const NO_MIRRORS_HINT: &str = "The light should reach all crystals without any mirrors!";
const GENERAL_HINTS: [&str; 4] = [
    "Try placing a mirror where the light beam hits a wall.",
    "Consider redirecting the light beam towards the crystals.",
    "Sometimes a 45° angle mirror works better than a 135° angle.",
    "Look for positions where the light can bounce to reach all crystals.",
];

/// One mirror placement in a witness solution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorPlacement {
    /// Index into the level's declared mirrors
    pub mirror: usize,
    pub cell: GridCell,
    pub angle: f32,
}

/// Verified mirror arrangement that lights every crystal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub move_count: u32,
    pub mirror_placements: Vec<MirrorPlacement>,
}

/// Result of [`LevelValidator::validate_level`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_valid: bool,
    pub solution: Option<Solution>,
    pub issues: Vec<String>,
}

impl Validation {
    fn invalid(issue: &str) -> Self {
        Self {
            is_valid: false,
            solution: None,
            issues: vec![issue.to_string()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevelValidator {
    caster: RayCaster,
}

impl LevelValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            caster: RayCaster::from_config(config),
        }
    }

    pub fn validate_level(&self, level: &LevelDefinition) -> Validation {
        if level.light_source.is_none() {
            return Validation::invalid("Level must have a light source");
        }
        if level.crystals.is_empty() {
            return Validation::invalid("Level must have at least one crystal");
        }
        let placement = level.placement_issues();
        if !placement.is_empty() {
            return Validation {
                is_valid: false,
                solution: None,
                issues: placement,
            };
        }

        match self.find_solution(level) {
            Some(solution) => Validation {
                is_valid: true,
                solution: Some(solution),
                issues: Vec::new(),
            },
            None => Validation::invalid("Level has no valid solution"),
        }
    }

    /// Search for a zero- or single-mirror witness
    pub fn find_solution(&self, level: &LevelDefinition) -> Option<Solution> {
        let mut index = level.fixed_index();
        let emitter = index.emitter()?;

        let baseline = self.caster.cast(emitter, &mut index);
        if index.check_win_condition() {
            return Some(Solution {
                move_count: 0,
                mirror_placements: Vec::new(),
            });
        }

        if level.mirrors.is_empty() {
            return None;
        }

        let candidates = self.strategic_positions(level, &baseline_points(&baseline));
        log::debug!(
            "Searching {} candidate cells for {} mirrors",
            candidates.len(),
            level.mirrors.len()
        );

        for mirror in 0..level.mirrors.len() {
            for &cell in &candidates {
                if !index.can_place_at(cell, None) {
                    continue;
                }
                for angle in CANDIDATE_ANGLES {
                    if self.wins_with(&mut index, cell, angle) {
                        log::debug!("Found witness: mirror {mirror} at {cell:?}, angle {angle}");
                        return Some(Solution {
                            move_count: 1,
                            mirror_placements: vec![MirrorPlacement {
                                mirror,
                                cell,
                                angle,
                            }],
                        });
                    }
                }
            }
        }

        None
    }

    /// Place a temporary mirror, cast, and take it out again
    fn wins_with(&self, index: &mut SpatialIndex, cell: GridCell, angle: f32) -> bool {
        let id = index.add(Entity::mirror(cell, angle));
        self.caster.cast_level(index);
        let won = index.check_win_condition();
        index.remove(id);
        won
    }

    /// Candidate cells for a mirror, deduplicated in first-seen order
    ///
    /// Every cell around the given ray points (3x3 neighbourhood), then the
    /// cells on the straight line from the light to each crystal, endpoints
    /// excluded. Only in-bounds cells are returned; lines with an endpoint
    /// outside the arena are skipped.
    pub fn strategic_positions(&self, level: &LevelDefinition, ray_points: &[Vec2]) -> Vec<GridCell> {
        let mut seen = HashSet::new();
        let mut positions = Vec::new();
        let mut push = |cell: GridCell| {
            if cell.in_bounds() && seen.insert(cell) {
                positions.push(cell);
            }
        };

        for &point in ray_points {
            let center = cell_at(point);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    push(center.offset(dx, dy));
                }
            }
        }

        // Both ends in the arena keep the whole line in it
        if let Some(light) = level.light_source.filter(|l| l.cell().in_bounds()) {
            let from = light.cell();
            for crystal in &level.crystals {
                let to = crystal.cell();
                if !to.in_bounds() {
                    continue;
                }
                let dx = to.x - from.x;
                let dy = to.y - from.y;
                let steps = dx.abs().max(dy.abs());
                for i in 1..steps {
                    let t = i as f32 / steps as f32;
                    push(GridCell::new(
                        round_half_up(from.x as f32 + dx as f32 * t),
                        round_half_up(from.y as f32 + dy as f32 * t),
                    ));
                }
            }
        }

        positions
    }

    /// A hint for the player, or for the author if the level is broken
    pub fn generate_hint<R: Rng + ?Sized>(&self, level: &LevelDefinition, rng: &mut R) -> &'static str {
        let validation = self.validate_level(level);
        match validation.solution {
            None => UNSOLVABLE_HINT,
            Some(solution) if solution.move_count == 0 => NO_MIRRORS_HINT,
            Some(_) => GENERAL_HINTS[rng.random_range(0..GENERAL_HINTS.len())],
        }
    }

    /// [`LevelValidator::generate_hint`] with a `Pcg32` seeded from `seed`
    pub fn hint_for_seed(&self, level: &LevelDefinition, seed: u64) -> &'static str {
        self.generate_hint(level, &mut Pcg32::seed_from_u64(seed))
    }
}

fn baseline_points(rays: &[Ray]) -> Vec<Vec2> {
    rays.iter().flat_map(|ray| ray.points.iter().copied()).collect()
}

#[inline]
fn round_half_up(v: f32) -> i32 {
    (v + 0.5).floor() as i32
}
