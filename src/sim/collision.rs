//! Collision detection and response between bubbles
//!
//! Bubbles are equal-mass points that collide when their centers come within
//! `collision_threshold`. Response is a half-overlap push plus a damped
//! impulse along the contact normal, and only ever touches the bubble being
//! resolved (sequential) or both members of a pair at once (symmetric).

use super::state::{BubbleState, Vector2};
use crate::config::PhysicsConfig;
use crate::direction;

/// Result of a pairwise check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether the pair overlaps
    pub hit: bool,
    /// Unit normal pointing from the other bubble toward this one
    /// (zero when the centers coincide)
    pub normal: Vector2,
    /// How far inside the threshold the pair is
    pub overlap: f64,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vector2::ZERO,
            overlap: 0.0,
        }
    }
}

/// Check whether a bubble at `pos` overlaps one at `other`
pub fn bubble_collision(pos: Vector2, other: Vector2, threshold: f64) -> CollisionResult {
    let distance = pos.distance(other);
    if distance >= threshold {
        return CollisionResult::miss();
    }
    CollisionResult {
        hit: true,
        normal: direction(other, pos).map(|(n, _)| n).unwrap_or(Vector2::ZERO),
        overlap: threshold - distance,
    }
}

/// Impulse magnitude for an approaching pair, `None` if separating
#[inline]
pub fn approach_impulse(
    velocity: Vector2,
    other_velocity: Vector2,
    normal: Vector2,
    restitution: f64,
) -> Option<f64> {
    let along_normal = (velocity - other_velocity).dot(normal);
    (along_normal < 0.0).then(|| -(1.0 + restitution) * along_normal)
}

/// Resolve one bubble against every other bubble in `all`.
///
/// `all` holds the current state of the whole store; entries before
/// `self_index` have already been advanced this tick. Only `pos` and
/// `velocity` are changed. Returns whether anything overlapped.
pub fn resolve_sequential(
    pos: &mut Vector2,
    velocity: &mut Vector2,
    self_index: usize,
    all: &[BubbleState],
    config: &PhysicsConfig,
) -> bool {
    let mut colliding = false;

    for (i, other) in all.iter().enumerate() {
        if i == self_index {
            continue;
        }

        let result = bubble_collision(*pos, other.pos, config.collision_threshold);
        if !result.hit {
            continue;
        }
        colliding = true;

        // Coincident centers have no usable normal
        if !config.collision || result.normal == Vector2::ZERO {
            continue;
        }

        *pos += result.normal * result.overlap * 0.5;

        if let Some(impulse) = approach_impulse(
            *velocity,
            other.velocity(),
            result.normal,
            config.restitution,
        ) {
            *velocity += result.normal * impulse * 0.5;
        }
    }

    colliding
}

/// Accumulated adjustment for one bubble from the symmetric pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Correction {
    pub position: Vector2,
    pub velocity: Vector2,
    pub colliding: bool,
}

/// Detect every overlapping pair against one frozen snapshot and produce
/// equal and opposite corrections for both members.
///
/// Pinned bubbles take part as obstacles; callers discard their entries.
pub fn resolve_symmetric(states: &[BubbleState], config: &PhysicsConfig) -> Vec<Correction> {
    let mut corrections = vec![Correction::default(); states.len()];

    for i in 0..states.len() {
        for j in (i + 1)..states.len() {
            let (a, b) = (&states[i], &states[j]);
            let result = bubble_collision(a.pos, b.pos, config.collision_threshold);
            if !result.hit {
                continue;
            }
            corrections[i].colliding = true;
            corrections[j].colliding = true;

            if !config.collision || result.normal == Vector2::ZERO {
                continue;
            }

            let push = result.normal * result.overlap * 0.5;
            corrections[i].position += push;
            corrections[j].position -= push;

            if let Some(impulse) =
                approach_impulse(a.velocity(), b.velocity(), result.normal, config.restitution)
            {
                let kick = result.normal * impulse * 0.5;
                corrections[i].velocity += kick;
                corrections[j].velocity -= kick;
            }
        }
    }

    corrections
}
