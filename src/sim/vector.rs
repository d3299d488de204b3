//! 2D vector helpers on top of `glam::Vec2`
//!
//! `add`, `subtract`, `scale`, `dot` and `length` are the glam operators and
//! methods. This module adds the pieces the ray caster needs that glam either
//! lacks or spells differently.

use glam::Vec2;

/// Unit vector, or the zero vector when `v` has zero length
#[inline]
pub fn normalize(v: Vec2) -> Vec2 {
    v.normalize_or_zero()
}

/// Reflect `v` off a surface with unit normal `normal`
///
/// v' = v - 2(v·n)n
#[inline]
pub fn reflect(v: Vec2, normal: Vec2) -> Vec2 {
    v - 2.0 * v.dot(normal) * normal
}

/// Rotate `v` counter-clockwise (in y-up terms) by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Unit direction for an angle in radians
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(cos, sin)
}

/// Left-hand perpendicular, (x, y) -> (-y, x)
#[inline]
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
