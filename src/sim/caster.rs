//! Ray propagation
//!
//! Light is marched in fixed steps from the emitter. After every step each
//! obstacle is tested with its intersection primitive and the closest hit
//! inside a two-step lookahead window is resolved:
//! - Wall: the ray stops on the wall boundary
//! - Mirror: the ray stops and a reflected child ray is queued (depth + 1)
//! - Crystal: the crystal lights up and the ray skips past it and continues,
//!   stopping early at any wall or mirror inside the skipped stretch
//!
//! Reflections are followed through an explicit work list rather than
//! recursion. Work per cast is bounded by `max_depth × max_steps` steps.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, EntityTag};
use super::index::{Emitter, SpatialIndex};
use super::intersect::{Hit, entity_hit};
use super::vector::{direction, normalize, reflect};
use crate::EngineConfig;
use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH};

/// Why a ray stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RayEnd {
    /// Absorbed by a wall
    Wall,
    /// Reflected; the child ray follows it in the cast output
    Mirror,
    /// Hit a mirror at the reflection depth ceiling; no child was spawned
    DepthLimit,
    /// Left the arena
    Boundary,
    /// Ran out of steps
    StepLimit,
    /// Zero-length direction
    Degenerate,
}

/// One straight-ish light segment, from its origin to its termination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec2,
    /// Unit direction (zero if degenerate)
    pub direction: Vec2,
    /// Number of reflections before this segment
    pub depth: u32,
    /// Visited points, starting at `origin`
    pub points: Vec<Vec2>,
    pub active: bool,
    /// Set once the ray terminates
    pub end: Option<RayEnd>,
}

impl Ray {
    pub fn new(origin: Vec2, direction: Vec2, depth: u32) -> Self {
        Self {
            origin,
            direction: normalize(direction),
            depth,
            points: vec![origin],
            active: true,
            end: None,
        }
    }

    /// Last point of the polyline
    pub fn last_point(&self) -> Vec2 {
        self.points.last().copied().unwrap_or(self.origin)
    }

    fn terminate(&mut self, end: RayEnd) {
        self.active = false;
        self.end = Some(end);
    }
}

/// Closest obstacle hit in one step
#[derive(Debug, Clone, Copy)]
struct StepHit {
    id: EntityId,
    tag: EntityTag,
    hit: Hit,
}

/// Ray marcher
#[derive(Debug, Clone)]
pub struct RayCaster {
    config: EngineConfig,
}

impl Default for RayCaster {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl RayCaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Trace the light from `emitter` through the index
    ///
    /// Crystals are reset first, so afterwards their `active` flags reflect
    /// exactly this pass. Rays are returned in creation order: the initial
    /// ray, then each reflection in turn.
    pub fn cast(&self, emitter: Emitter, index: &mut SpatialIndex) -> Vec<Ray> {
        index.reset_crystals();

        let mut rays = Vec::new();
        let mut pending = vec![Ray::new(emitter.origin, direction(emitter.angle), 0)];

        while let Some(mut ray) = pending.pop() {
            if let Some(child) = self.trace(&mut ray, index) {
                pending.push(child);
            }
            rays.push(ray);
        }

        rays
    }

    /// Cast from the index's own light source; empty if there is none
    pub fn cast_level(&self, index: &mut SpatialIndex) -> Vec<Ray> {
        match index.emitter() {
            Some(emitter) => self.cast(emitter, index),
            None => {
                index.reset_crystals();
                Vec::new()
            }
        }
    }

    /// March one ray to termination, returning its reflected child if any
    fn trace(&self, ray: &mut Ray, index: &mut SpatialIndex) -> Option<Ray> {
        if ray.direction == Vec2::ZERO {
            ray.terminate(RayEnd::Degenerate);
            return None;
        }

        let dir = ray.direction;
        let mut pos = ray.origin;
        // Obstacle found inside a crystal's clearance skip, resolved next step
        let mut blocked: Option<StepHit> = None;

        for _ in 0..self.config.max_steps {
            let step = match blocked.take() {
                Some(step) => step,
                None => {
                    let next = pos + dir * self.config.step_size;
                    if out_of_bounds(next) {
                        ray.points.push(exit_point(pos, dir));
                        ray.terminate(RayEnd::Boundary);
                        return None;
                    }
                    pos = next;

                    let Some(step) = self.closest_hit(index, pos, dir) else {
                        continue;
                    };
                    step
                }
            };

            ray.points.push(step.hit.point);
            match step.tag {
                EntityTag::Wall => {
                    ray.terminate(RayEnd::Wall);
                    return None;
                }
                EntityTag::Mirror => {
                    if ray.depth + 1 >= self.config.max_depth {
                        log::debug!("Reflection depth ceiling reached at {:?}", step.hit.point);
                        ray.terminate(RayEnd::DepthLimit);
                        return None;
                    }
                    ray.terminate(RayEnd::Mirror);
                    let reflected = reflect(dir, step.hit.normal);
                    let origin = step.hit.point + reflected * self.config.reflect_offset;
                    return Some(Ray::new(origin, reflected, ray.depth + 1));
                }
                EntityTag::Crystal => {
                    index.activate_crystal(step.id);
                    let clearance = self.config.crystal_clearance;
                    if let Some(blocker) = self.first_blocker(index, step.hit.point, dir, clearance) {
                        pos = blocker.hit.point;
                        blocked = Some(blocker);
                        continue;
                    }
                    pos = step.hit.point + dir * clearance;
                    ray.points.push(clamp_to_arena(pos));
                }
                EntityTag::Light => {}
            }
        }

        log::debug!("Step ceiling reached for ray at depth {}", ray.depth);
        ray.points.push(clamp_to_arena(pos));
        ray.terminate(RayEnd::StepLimit);
        None
    }

    /// Nearest hit within the lookahead window; ties keep the lower id
    fn closest_hit(&self, index: &SpatialIndex, pos: Vec2, dir: Vec2) -> Option<StepHit> {
        let window = self.config.lookahead();
        let mut best: Option<(f32, StepHit)> = None;

        for (id, entity) in index.iter() {
            let tag = entity.tag();
            if tag == EntityTag::Light {
                continue;
            }
            let Some(hit) = entity_hit(entity, pos, dir, self.config.crystal_capture_radius) else {
                continue;
            };
            let dist = hit.point.distance(pos);
            if dist < window && best.is_none_or(|(best_dist, _)| dist < best_dist) {
                best = Some((dist, StepHit { id, tag, hit }));
            }
        }

        best.map(|(_, step)| step)
    }

    /// Nearest wall or mirror within `max_dist` of `from` along `dir`
    ///
    /// Covers the stretch a ray skips after lighting a crystal.
    fn first_blocker(&self, index: &SpatialIndex, from: Vec2, dir: Vec2, max_dist: f32) -> Option<StepHit> {
        let mut best: Option<(f32, StepHit)> = None;

        for (id, entity) in index.iter() {
            let tag = entity.tag();
            if !matches!(tag, EntityTag::Wall | EntityTag::Mirror) {
                continue;
            }
            let Some(hit) = entity_hit(entity, from, dir, self.config.crystal_capture_radius) else {
                continue;
            };
            let dist = hit.point.distance(from);
            if dist <= max_dist && best.is_none_or(|(best_dist, _)| dist < best_dist) {
                best = Some((dist, StepHit { id, tag, hit }));
            }
        }

        best.map(|(_, step)| step)
    }
}

#[inline]
fn out_of_bounds(p: Vec2) -> bool {
    p.x < 0.0 || p.x > ARENA_WIDTH || p.y < 0.0 || p.y > ARENA_HEIGHT
}

#[inline]
fn clamp_to_arena(p: Vec2) -> Vec2 {
    p.clamp(Vec2::ZERO, Vec2::new(ARENA_WIDTH, ARENA_HEIGHT))
}

/// Point where a ray from `pos` along `dir` crosses the arena boundary
fn exit_point(pos: Vec2, dir: Vec2) -> Vec2 {
    let axis_t = |p: f32, d: f32, max: f32| {
        if d > 0.0 {
            (max - p) / d
        } else if d < 0.0 {
            -p / d
        } else {
            f32::INFINITY
        }
    };
    let t = axis_t(pos.x, dir.x, ARENA_WIDTH)
        .min(axis_t(pos.y, dir.y, ARENA_HEIGHT))
        .max(0.0);
    clamp_to_arena(pos + dir * t)
}
