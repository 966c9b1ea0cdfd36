//! Physics tuning
//!
//! Defaults mirror `crate::consts`. On the web an override can be persisted in
//! LocalStorage so tuning survives reloads.

use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// How overlapping pairs are resolved within one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionMode {
    /// Each bubble reacts on its own turn against the already-updated
    /// positions of bubbles earlier in store order. Order dependent.
    #[default]
    Sequential,
    /// Pairs are detected against one frozen snapshot and both members get
    /// equal and opposite corrections before any integration.
    Symmetric,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Physics parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f64,
    pub friction: f64,
    /// Bounce factor shared by collisions and walls
    pub restitution: f64,
    /// Collision response (detection and `is_colliding` always run)
    pub collision: bool,
    pub collision_mode: CollisionMode,
    pub collision_threshold: f64,
    pub magnetism: f64,
    pub magnetism_radius: f64,
    #[serde(with = "crate::vec2_xy")]
    pub center: DVec2,
    pub margin: f64,
    pub canvas_size: f64,
    pub max_velocity: f64,
    pub position_scale: f64,
    pub impulse_strength: f64,
    pub tick_interval_ms: f64,
    /// Optional upper bound on one tick's `dt`; `None` integrates the raw
    /// elapsed time
    pub max_tick_secs: Option<f64>,
    pub max_bubbles: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            friction: FRICTION,
            restitution: RESTITUTION,
            collision: true,
            collision_mode: CollisionMode::Sequential,
            collision_threshold: COLLISION_THRESHOLD,
            magnetism: MAGNETISM,
            magnetism_radius: MAGNETISM_RADIUS,
            center: DVec2::splat(CANVAS_CENTER),
            margin: MARGIN,
            canvas_size: CANVAS_SIZE,
            max_velocity: MAX_VELOCITY,
            position_scale: POSITION_SCALE,
            impulse_strength: IMPULSE_STRENGTH,
            tick_interval_ms: TICK_INTERVAL_MS,
            max_tick_secs: None,
            max_bubbles: MAX_BUBBLES,
        }
    }
}

impl PhysicsConfig {
    /// Lowest coordinate a simulated bubble may occupy
    pub fn min_bound(&self) -> f64 {
        self.margin
    }

    /// Highest coordinate a simulated bubble may occupy
    pub fn max_bound(&self) -> f64 {
        self.canvas_size - self.margin
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject values that would break the tick invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scalars = [
            ("gravity", self.gravity),
            ("friction", self.friction),
            ("restitution", self.restitution),
            ("collision_threshold", self.collision_threshold),
            ("magnetism", self.magnetism),
            ("magnetism_radius", self.magnetism_radius),
            ("center.x", self.center.x),
            ("center.y", self.center.y),
            ("margin", self.margin),
            ("canvas_size", self.canvas_size),
            ("max_velocity", self.max_velocity),
            ("position_scale", self.position_scale),
            ("impulse_strength", self.impulse_strength),
            ("tick_interval_ms", self.tick_interval_ms),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!("{name} must be finite")));
        }

        if !(0.0..=1.0).contains(&self.friction) {
            return Err(ConfigError::Invalid("friction must be within 0..=1".into()));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Invalid("restitution must be within 0..=1".into()));
        }
        if self.magnetism < 0.0 {
            return Err(ConfigError::Invalid("magnetism must not be negative".into()));
        }
        if self.collision_threshold <= 0.0 {
            return Err(ConfigError::Invalid("collision_threshold must be positive".into()));
        }
        if self.max_velocity <= 0.0 {
            return Err(ConfigError::Invalid("max_velocity must be positive".into()));
        }
        if self.tick_interval_ms <= 0.0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if let Some(cap) = self.max_tick_secs {
            if !cap.is_finite() || cap <= 0.0 {
                return Err(ConfigError::Invalid("max_tick_secs must be positive".into()));
            }
        }
        if self.margin < 0.0 || self.min_bound() >= self.max_bound() {
            return Err(ConfigError::Invalid(format!(
                "margin {} leaves no room in a canvas of {}",
                self.margin, self.canvas_size
            )));
        }
        if self.max_bubbles == 0 {
            return Err(ConfigError::Invalid("max_bubbles must be at least 1".into()));
        }
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "story_bubbles_physics";

    /// Load tuning from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded physics config from LocalStorage");
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring stored physics config: {e}"),
                }
            }
        }

        log::info!("Using default physics config");
        Self::default()
    }

    /// Save tuning to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                match storage.set_item(Self::STORAGE_KEY, &json) {
                    Ok(()) => log::info!("Physics config saved"),
                    Err(e) => log::warn!("LocalStorage rejected physics config: {e:?}"),
                }
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
