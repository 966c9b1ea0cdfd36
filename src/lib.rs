//! Story Bubbles - floating content markers with a tiny 2D physics core
//!
//! Core modules:
//! - `sim`: Simulation state, store reconciliation, forces, collisions, tick
//! - `engine`: Engine owning the store plus the external mutation API
//! - `scheduler`: Start/stop-able frame driver over a host scheduling primitive
//! - `config`: Data-driven physics tuning
//! - `web`: Browser host (requestAnimationFrame + JS bindings)

pub mod config;
pub mod engine;
pub mod scheduler;
pub mod sim;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{CollisionMode, ConfigError, PhysicsConfig};
pub use engine::{BubbleEngine, BubbleSnapshot};
pub use scheduler::{FrameScheduler, LoopPhase, ManualScheduler, SimulationLoop};

use glam::DVec2;

/// Physics defaults (canvas is normalized to 0..100 on both axes)
pub mod consts {
    /// Per-second downward acceleration (very subtle)
    pub const GRAVITY: f64 = 0.05;
    /// Velocity multiplier applied every tick on both axes
    pub const FRICTION: f64 = 0.99;
    /// Fraction of velocity kept after a bounce
    pub const RESTITUTION: f64 = 0.5;
    /// Centering pull strength (0 disables)
    pub const MAGNETISM: f64 = 0.01;
    /// Bubbles closer than this to the center feel no pull
    pub const MAGNETISM_RADIUS: f64 = 30.0;

    /// Canvas extent per axis
    pub const CANVAS_SIZE: f64 = 100.0;
    pub const CANVAS_CENTER: f64 = CANVAS_SIZE / 2.0;
    /// Distance from the edge at which bubbles are clamped
    pub const MARGIN: f64 = 5.0;

    /// Center distance below which two bubbles collide
    pub const COLLISION_THRESHOLD: f64 = 15.0;
    /// Hard speed cap
    pub const MAX_VELOCITY: f64 = 50.0;
    /// Converts per-tick velocity units into canvas movement
    pub const POSITION_SCALE: f64 = 10.0;
    /// Magnitude of a random "poke"
    pub const IMPULSE_STRENGTH: f64 = 20.0;

    /// Minimum spacing between processed ticks (~60 Hz)
    pub const TICK_INTERVAL_MS: f64 = 16.0;
    /// Reconciliation cap (collision pass is O(n^2))
    pub const MAX_BUBBLES: usize = 256;
}

/// Unit vector from `from` toward `to`, or `None` when they coincide
#[inline]
pub fn direction(from: DVec2, to: DVec2) -> Option<(DVec2, f64)> {
    let delta = to - from;
    let distance = delta.length();
    if distance > 0.0 {
        Some((delta / distance, distance))
    } else {
        None
    }
}

/// Unit vector at `angle` radians
#[inline]
pub fn from_angle(angle: f64) -> DVec2 {
    DVec2::new(angle.cos(), angle.sin())
}

/// Serde helper: `DVec2` as `{ "x": .., "y": .. }`, the shape the feed API uses
pub mod vec2_xy {
    use glam::DVec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Xy {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    }

    pub fn serialize<S: Serializer>(v: &DVec2, s: S) -> Result<S::Ok, S::Error> {
        Xy { x: v.x, y: v.y }.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DVec2, D::Error> {
        let xy = Xy::deserialize(d)?;
        Ok(DVec2::new(xy.x, xy.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction() {
        let (dir, dist) = direction(DVec2::new(0.0, 0.0), DVec2::new(3.0, 4.0)).unwrap();
        assert!((dist - 5.0).abs() < 1e-12);
        assert!((dir.length() - 1.0).abs() < 1e-12);
        assert!(direction(DVec2::ONE, DVec2::ONE).is_none());
    }

    #[test]
    fn test_from_angle() {
        let v = from_angle(std::f64::consts::FRAC_PI_2);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 1.0).abs() < 1e-12);
    }
}
