//! Per-bubble forces and constraints
//!
//! Each stage is a small pure function so the integrator can chain them in a
//! fixed order.

use super::state::Vector2;
use crate::config::PhysicsConfig;
use crate::direction;

/// Downward pull, scaled by elapsed seconds
#[inline]
pub fn apply_gravity(velocity: Vector2, config: &PhysicsConfig, dt: f64) -> Vector2 {
    Vector2::new(velocity.x, velocity.y + config.gravity * dt)
}

/// Flat per-tick damping on both axes
#[inline]
pub fn apply_friction(velocity: Vector2, config: &PhysicsConfig) -> Vector2 {
    velocity * config.friction
}

/// Velocity change pulling a far-away bubble back toward the canvas center.
///
/// Zero when magnetism is disabled or the bubble is within
/// `magnetism_radius` of the center.
pub fn centering_force(pos: Vector2, config: &PhysicsConfig, dt: f64) -> Vector2 {
    if config.magnetism <= 0.0 {
        return Vector2::ZERO;
    }
    match direction(pos, config.center) {
        Some((to_center, distance)) if distance > config.magnetism_radius => {
            to_center * config.magnetism * dt
        }
        _ => Vector2::ZERO,
    }
}

/// Keep a bubble inside the margins, reflecting (and damping) the velocity
/// component that hit the wall. Returns true if any wall was touched.
pub fn clamp_to_bounds(pos: &mut Vector2, velocity: &mut Vector2, config: &PhysicsConfig) -> bool {
    let x_hit = clamp_axis(&mut pos.x, &mut velocity.x, config);
    let y_hit = clamp_axis(&mut pos.y, &mut velocity.y, config);
    x_hit || y_hit
}

fn clamp_axis(pos: &mut f64, vel: &mut f64, config: &PhysicsConfig) -> bool {
    let (lo, hi) = (config.min_bound(), config.max_bound());
    if *pos < lo {
        *pos = lo;
        *vel = vel.abs() * config.restitution;
        true
    } else if *pos > hi {
        *pos = hi;
        *vel = -vel.abs() * config.restitution;
        true
    } else {
        false
    }
}

/// Rescale to `max_velocity` if faster, keeping direction
#[inline]
pub fn clamp_speed(velocity: Vector2, max_velocity: f64) -> Vector2 {
    let speed = velocity.length();
    if speed > max_velocity {
        velocity * (max_velocity / speed)
    } else {
        velocity
    }
}
