//! Ray intersection primitives
//!
//! Each obstacle kind has its own test. All of them take the ray's current
//! working position and unit direction and report the hit point plus the
//! surface normal (oriented against the incoming ray). Degenerate cases are a
//! miss, never a fault.

use glam::Vec2;

use super::entity::{Entity, EntityKind};
use super::vector::{direction, perpendicular};
use crate::consts::PARALLEL_EPSILON;

/// A ray/obstacle intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Intersection point in world space
    pub point: Vec2,
    /// Surface normal facing the incoming ray (zero for crystals)
    pub normal: Vec2,
}

/// Intersect a ray with a finite two-sided mirror
///
/// The mirror is the segment through `center` along `angle`, extending
/// `half_length` either side.
pub fn mirror_hit(center: Vec2, angle: f32, half_length: f32, pos: Vec2, dir: Vec2) -> Option<Hit> {
    let axis = direction(angle);
    let normal = perpendicular(axis);

    let denominator = dir.dot(normal);
    if denominator.abs() < PARALLEL_EPSILON {
        return None;
    }

    let t = (center - pos).dot(normal) / denominator;
    if t < 0.0 {
        return None;
    }

    let point = pos + dir * t;
    if (point - center).dot(axis).abs() > half_length {
        return None;
    }

    // Face the incoming ray
    let normal = if denominator > 0.0 { -normal } else { normal };
    Some(Hit { point, normal })
}

/// Intersect a ray with an axis-aligned box given by its world bounds
///
/// Only the edges facing the ray are tested; the nearest crossing that lands
/// within its edge's span wins.
pub fn wall_hit(min: Vec2, max: Vec2, pos: Vec2, dir: Vec2) -> Option<Hit> {
    let mut best: Option<(f32, Hit)> = None;

    let mut consider = |t: f32, point: Vec2, normal: Vec2| {
        if t >= 0.0 && best.is_none_or(|(best_t, _)| t < best_t) {
            best = Some((t, Hit { point, normal }));
        }
    };

    // Left / right edges
    if dir.x != 0.0 {
        let (edge_x, normal) = if dir.x > 0.0 {
            (min.x, Vec2::NEG_X)
        } else {
            (max.x, Vec2::X)
        };
        let t = (edge_x - pos.x) / dir.x;
        let y = pos.y + t * dir.y;
        if y >= min.y && y <= max.y {
            consider(t, Vec2::new(edge_x, y), normal);
        }
    }

    // Top / bottom edges
    if dir.y != 0.0 {
        let (edge_y, normal) = if dir.y > 0.0 {
            (min.y, Vec2::NEG_Y)
        } else {
            (max.y, Vec2::Y)
        };
        let t = (edge_y - pos.y) / dir.y;
        let x = pos.x + t * dir.x;
        if x >= min.x && x <= max.x {
            consider(t, Vec2::new(x, edge_y), normal);
        }
    }

    best.map(|(_, hit)| hit)
}

/// Proximity capture for a crystal
///
/// The hit point is the crystal center; no normal since the ray passes through.
pub fn crystal_hit(center: Vec2, capture_radius: f32, pos: Vec2) -> Option<Hit> {
    if pos.distance(center) < capture_radius {
        Some(Hit {
            point: center,
            normal: Vec2::ZERO,
        })
    } else {
        None
    }
}

/// Dispatch to the primitive matching the entity's kind
///
/// Light sources never block a ray.
pub fn entity_hit(entity: &Entity, pos: Vec2, dir: Vec2, crystal_radius: f32) -> Option<Hit> {
    match entity.kind {
        EntityKind::Light { .. } => None,
        EntityKind::Mirror { angle, half_length } => {
            mirror_hit(entity.center(), angle, half_length, pos, dir)
        }
        EntityKind::Wall { .. } => {
            let (min, max) = entity.wall_bounds()?;
            wall_hit(min, max, pos, dir)
        }
        EntityKind::Crystal { .. } => crystal_hit(entity.center(), crystal_radius, pos),
    }
}
