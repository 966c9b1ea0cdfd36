//! Bubble state and core simulation types

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Position or velocity on the normalized canvas
pub type Vector2 = DVec2;

/// Host timestamp in milliseconds (`performance.now()` on the web)
pub type Millis = f64;

/// Identifier of the content item a bubble represents
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BubbleId(pub String);

impl fmt::Display for BubbleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BubbleId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for BubbleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Placement of a bubble as exchanged with the rest of the app.
///
/// Only `x`, `y` and `velocity` are touched by physics; `z` and `scale` pass
/// through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BubblePosition {
    pub x: f64,
    pub y: f64,
    /// Depth layer (0-10), render only
    #[serde(default)]
    pub z: f64,
    #[serde(default, with = "crate::vec2_xy")]
    pub velocity: Vector2,
    /// Visual scale, render only
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl BubblePosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            velocity: Vector2::ZERO,
            scale: 1.0,
        }
    }

    pub fn with_velocity(mut self, velocity: Vector2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn xy(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }
}

/// One entry of the host-supplied entity list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeed {
    pub id: BubbleId,
    #[serde(alias = "position")]
    pub seed_position: BubblePosition,
}

impl EntitySeed {
    pub fn new(id: impl Into<BubbleId>, seed_position: BubblePosition) -> Self {
        Self {
            id: id.into(),
            seed_position,
        }
    }
}

/// Per-bubble mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BubbleMode {
    /// Driven by the integrator
    Simulated { velocity: Vector2 },
    /// Held by a gesture; physics never runs. `release_velocity` is whatever
    /// the controller last wrote and becomes the velocity on release.
    Pinned { release_velocity: Vector2 },
}

/// Simulation state of a single bubble
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BubbleState {
    pub pos: Vector2,
    /// Pass-through render data
    pub z: f64,
    pub scale: f64,
    pub mode: BubbleMode,
    pub is_colliding: bool,
    pub last_update: Millis,
}

impl BubbleState {
    /// Fresh simulated state from a seed position
    pub fn from_seed(seed: &BubblePosition, now: Millis) -> Self {
        Self {
            pos: seed.xy(),
            z: seed.z,
            scale: seed.scale,
            mode: BubbleMode::Simulated {
                velocity: seed.velocity,
            },
            is_colliding: false,
            last_update: now,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.mode, BubbleMode::Pinned { .. })
    }

    /// Current velocity (the held release velocity while pinned)
    pub fn velocity(&self) -> Vector2 {
        match self.mode {
            BubbleMode::Simulated { velocity } => velocity,
            BubbleMode::Pinned { release_velocity } => release_velocity,
        }
    }

    pub fn set_velocity(&mut self, v: Vector2) {
        match &mut self.mode {
            BubbleMode::Simulated { velocity } => *velocity = v,
            BubbleMode::Pinned { release_velocity } => *release_velocity = v,
        }
    }

    /// Pin for dragging; stored momentum is discarded
    pub fn pin(&mut self) {
        self.mode = BubbleMode::Pinned {
            release_velocity: Vector2::ZERO,
        };
    }

    /// Return to simulation with whatever release velocity was held
    pub fn release(&mut self) {
        if let BubbleMode::Pinned { release_velocity } = self.mode {
            self.mode = BubbleMode::Simulated {
                velocity: release_velocity,
            };
        }
    }

    /// Mutable velocity for the integrator; `None` while pinned
    pub fn simulated_velocity_mut(&mut self) -> Option<&mut Vector2> {
        match &mut self.mode {
            BubbleMode::Simulated { velocity } => Some(velocity),
            BubbleMode::Pinned { .. } => None,
        }
    }

    /// Position in the shape the renderer and feed API use
    pub fn position(&self) -> BubblePosition {
        BubblePosition {
            x: self.pos.x,
            y: self.pos.y,
            z: self.z,
            velocity: self.velocity(),
            scale: self.scale,
        }
    }

    /// Overwrite position and velocity from an authoritative source
    pub fn apply_position(&mut self, position: &BubblePosition, now: Millis) {
        self.pos = position.xy();
        self.z = position.z;
        self.scale = position.scale;
        self.set_velocity(position.velocity);
        self.last_update = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_seed_passes_render_fields() {
        let seed = BubblePosition {
            x: 30.0,
            y: 40.0,
            z: 7.0,
            velocity: Vector2::new(0.2, -0.3),
            scale: 1.1,
        };
        let state = BubbleState::from_seed(&seed, 12.0);
        assert_eq!(state.position(), seed);
        assert!(!state.is_dragging());
        assert!(!state.is_colliding);
        assert_eq!(state.last_update, 12.0);
    }

    #[test]
    fn test_pin_release_cycle() {
        let mut state = BubbleState::from_seed(
            &BubblePosition::new(50.0, 50.0).with_velocity(Vector2::new(4.0, 1.0)),
            0.0,
        );
        state.pin();
        assert!(state.is_dragging());
        assert_eq!(state.velocity(), Vector2::ZERO);
        assert!(state.simulated_velocity_mut().is_none());

        state.set_velocity(Vector2::new(2.0, 0.0));
        state.release();
        assert!(!state.is_dragging());
        assert_eq!(state.velocity(), Vector2::new(2.0, 0.0));
    }

    #[test]
    fn test_seed_json_shape() {
        let seed: EntitySeed = serde_json::from_str(
            r#"{ "id": "abc", "position": { "x": 20, "y": 80, "velocity": { "x": 0.5, "y": -0.5 } } }"#,
        )
        .unwrap();
        assert_eq!(seed.id, BubbleId::from("abc"));
        assert_eq!(seed.seed_position.velocity, Vector2::new(0.5, -0.5));
        assert_eq!(seed.seed_position.scale, 1.0);
        assert_eq!(seed.seed_position.z, 0.0);
    }
}
