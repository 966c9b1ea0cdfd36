//! Simulation tick
//!
//! Advances every bubble in the store by one step. Stage order within a
//! bubble's update is fixed: gravity, friction, collisions, centering,
//! integration, walls, speed cap.

use super::collision::{resolve_sequential, resolve_symmetric};
use super::forces::{
    apply_friction, apply_gravity, centering_force, clamp_speed, clamp_to_bounds,
};
use super::state::{BubbleMode, BubbleState, Millis, Vector2};
use super::store::BubbleStore;
use crate::config::{CollisionMode, PhysicsConfig};

/// Per-pass counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub simulated: usize,
    pub pinned: usize,
    pub colliding: usize,
}

/// Advance one bubble by `dt` seconds.
///
/// `all` is the whole store including this bubble at `index`. Pinned
/// bubbles are returned untouched.
pub fn integrate(
    state: &BubbleState,
    index: usize,
    all: &[BubbleState],
    config: &PhysicsConfig,
    dt: f64,
    now: Millis,
) -> BubbleState {
    let mut next = *state;
    let BubbleMode::Simulated { velocity } = next.mode else {
        return next;
    };

    let mut pos = next.pos;
    let mut velocity = apply_friction(apply_gravity(velocity, config, dt), config);

    next.is_colliding = resolve_sequential(&mut pos, &mut velocity, index, all, config);

    finish(&mut next, pos, velocity, config, dt, now);
    next
}

/// Centering, integration, walls and speed cap, then commit
fn finish(
    state: &mut BubbleState,
    mut pos: Vector2,
    mut velocity: Vector2,
    config: &PhysicsConfig,
    dt: f64,
    now: Millis,
) {
    velocity += centering_force(pos, config, dt);

    pos += velocity * dt * config.position_scale;

    clamp_to_bounds(&mut pos, &mut velocity, config);
    velocity = clamp_speed(velocity, config.max_velocity);

    state.pos = pos;
    if let Some(v) = state.simulated_velocity_mut() {
        *v = velocity;
    }
    state.last_update = now;
}

/// Run one full pass over the store
pub fn step(store: &mut BubbleStore, config: &PhysicsConfig, dt: f64, now: Millis) -> TickStats {
    match config.collision_mode {
        CollisionMode::Sequential => step_sequential(store.states_mut(), config, dt, now),
        CollisionMode::Symmetric => step_symmetric(store.states_mut(), config, dt, now),
    }
}

/// Bubbles are updated in store order and each one sees the already-updated
/// state of the bubbles before it.
fn step_sequential(
    states: &mut [BubbleState],
    config: &PhysicsConfig,
    dt: f64,
    now: Millis,
) -> TickStats {
    let mut stats = TickStats::default();
    for i in 0..states.len() {
        let next = integrate(&states[i], i, states, config, dt, now);
        states[i] = next;
        stats.record(&next);
    }
    stats
}

/// Two-phase variant: all contacts are found on the post-damping snapshot
/// and applied to both members before anything integrates.
fn step_symmetric(
    states: &mut [BubbleState],
    config: &PhysicsConfig,
    dt: f64,
    now: Millis,
) -> TickStats {
    for state in states.iter_mut() {
        if let Some(v) = state.simulated_velocity_mut() {
            *v = apply_friction(apply_gravity(*v, config, dt), config);
        }
    }

    let corrections = resolve_symmetric(states, config);

    let mut stats = TickStats::default();
    for (state, correction) in states.iter_mut().zip(corrections) {
        if !state.is_dragging() {
            let pos = state.pos + correction.position;
            let velocity = state.velocity() + correction.velocity;
            state.is_colliding = correction.colliding;
            finish(state, pos, velocity, config, dt, now);
        }
        stats.record(state);
    }
    stats
}

impl TickStats {
    fn record(&mut self, state: &BubbleState) {
        if state.is_dragging() {
            self.pinned += 1;
        } else {
            self.simulated += 1;
        }
        if state.is_colliding {
            self.colliding += 1;
        }
    }
}
