//! Seed placement for content that arrives without a stored position

use rand::Rng;

use super::state::{BubblePosition, Vector2};

/// Placement band on both axes; keeps new bubbles away from the walls
pub const SPAWN_MIN: f64 = 20.0;
pub const SPAWN_MAX: f64 = 80.0;
/// Depth layers
pub const SPAWN_MAX_Z: f64 = 10.0;
/// Each velocity component is drawn from [-SPAWN_DRIFT, SPAWN_DRIFT)
pub const SPAWN_DRIFT: f64 = 0.5;

/// Random, fairly centered seed with a gentle initial drift
pub fn random_seed_position(rng: &mut impl Rng) -> BubblePosition {
    BubblePosition {
        x: rng.random_range(SPAWN_MIN..SPAWN_MAX),
        y: rng.random_range(SPAWN_MIN..SPAWN_MAX),
        z: rng.random_range(0.0..SPAWN_MAX_Z),
        velocity: Vector2::new(
            rng.random_range(-SPAWN_DRIFT..SPAWN_DRIFT),
            rng.random_range(-SPAWN_DRIFT..SPAWN_DRIFT),
        ),
        scale: rng.random_range(0.9..1.1),
    }
}
