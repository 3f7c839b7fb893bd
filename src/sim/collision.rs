//! Collision detection and response for circular bodies
//!
//! Every entity collides as a circle. Detection is a symmetric distance
//! test; response helpers turn a contact into a separation impulse or a
//! reflected velocity.

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the second circle's rim (if hit)
    pub point: Vec2,
    /// Unit normal pointing from the second circle toward the first
    pub normal: Vec2,
    /// Overlap depth
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Strict overlap test: touching circles do not collide
#[inline]
pub fn circles_overlap(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a_pos.distance_squared(b_pos) < reach * reach
}

/// Full contact between circle `a` and circle `b`
///
/// Concentric circles get an arbitrary +x normal so callers can still push
/// them apart.
pub fn circle_circle(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    if !circles_overlap(a_pos, a_radius, b_pos, b_radius) {
        return CollisionResult::miss();
    }
    let offset = a_pos - b_pos;
    let dist = offset.length();
    let normal = if dist > 0.0001 { offset / dist } else { Vec2::X };
    CollisionResult {
        hit: true,
        point: b_pos + normal * b_radius,
        normal,
        penetration: a_radius + b_radius - dist,
    }
}

/// Velocity change that pushes the first circle out of an overlap
///
/// Proportional to penetration so resting contacts settle instead of
/// jittering.
#[inline]
pub fn separation_impulse(contact: &CollisionResult, stiffness: f32, dt: f32) -> Vec2 {
    if !contact.hit {
        return Vec2::ZERO;
    }
    contact.normal * contact.penetration * stiffness * dt
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}
