//! Bubble engine
//!
//! Owns the store, the tuning and the RNG. Everything that changes bubble
//! state goes through here: the per-tick pass from the simulation loop and
//! the direct writes a gesture controller makes (drag, pokes, reset).

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::PhysicsConfig;
use crate::from_angle;
use crate::sim::{
    self, BubbleId, BubblePosition, BubbleState, BubbleStore, EntitySeed, Millis,
    ReconcileReport, TickStats, Vector2, replace_non_finite,
};

/// What the renderer reads for one bubble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleSnapshot {
    pub id: BubbleId,
    pub position: BubblePosition,
    pub is_colliding: bool,
    pub is_dragging: bool,
}

#[derive(Debug, Clone)]
pub struct BubbleEngine {
    config: PhysicsConfig,
    store: BubbleStore,
    rng: Pcg32,
    /// Timestamp of the last mutation or tick, stamped on writes
    clock: Millis,
}

impl BubbleEngine {
    pub fn new(config: PhysicsConfig, seed: u64) -> Self {
        Self {
            config,
            store: BubbleStore::new(),
            rng: Pcg32::seed_from_u64(seed),
            clock: 0.0,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Swap tuning at runtime; bubble state is kept
    pub fn set_config(&mut self, config: PhysicsConfig) {
        self.config = config;
    }

    pub fn store(&self) -> &BubbleStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get(&self, id: &BubbleId) -> Option<BubbleState> {
        self.store.get(id)
    }

    pub fn set(&mut self, id: &BubbleId, state: BubbleState) {
        if !self.store.set(id, state) {
            log::debug!("set: unknown bubble {id}");
        }
    }

    /// Advance the host clock used to stamp direct writes
    pub fn set_clock(&mut self, now: Millis) {
        self.clock = now;
    }

    /// Match tracked bubbles to the current entity list
    pub fn reconcile(&mut self, entities: &[EntitySeed]) -> ReconcileReport {
        self.store.reconcile(entities, &self.config, self.clock)
    }

    /// One integrator pass over every bubble. `dt` is in seconds, capped at
    /// `max_tick_secs` only when one is configured.
    pub fn step(&mut self, dt: f64, now: Millis) -> TickStats {
        self.clock = now;
        let dt = match self.config.max_tick_secs {
            Some(cap) => dt.clamp(0.0, cap),
            None => dt.max(0.0),
        };
        let stats = sim::step(&mut self.store, &self.config, dt, now);
        log::trace!(
            "tick dt={dt:.4}s simulated={} pinned={} colliding={}",
            stats.simulated,
            stats.pinned,
            stats.colliding
        );
        stats
    }

    /// Overwrite position and velocity with no physics applied. Finite
    /// values are stored as given. While a bubble is pinned the velocity is
    /// held and used on release.
    pub fn update_position(&mut self, id: &BubbleId, position: BubblePosition) {
        let position = replace_non_finite(&position, &self.config);
        let now = self.clock;
        match self.store.get_mut(id) {
            Some(state) => state.apply_position(&position, now),
            None => log::debug!("update_position: unknown bubble {id}"),
        }
    }

    /// Follow a pointer: clamp into the margins and write with zero velocity
    pub fn drag_to(&mut self, id: &BubbleId, x: f64, y: f64) {
        let Some(state) = self.store.get(id) else {
            log::debug!("drag_to: unknown bubble {id}");
            return;
        };
        let (lo, hi) = (self.config.min_bound(), self.config.max_bound());
        let mut position = state.position();
        position.x = x.clamp(lo, hi);
        position.y = y.clamp(lo, hi);
        position.velocity = Vector2::ZERO;
        self.update_position(id, position);
    }

    /// Pin or release a bubble. Pinning discards its momentum; releasing
    /// keeps whatever velocity the controller left (none by default).
    pub fn set_dragging(&mut self, id: &BubbleId, dragging: bool) {
        let Some(state) = self.store.get_mut(id) else {
            log::debug!("set_dragging: unknown bubble {id}");
            return;
        };
        if dragging {
            state.pin();
        } else {
            state.release();
        }
    }

    /// Kick one bubble, or every free bubble, in a random direction.
    /// Pinned bubbles are never kicked.
    pub fn add_random_impulse(&mut self, id: Option<&BubbleId>) {
        let strength = self.config.impulse_strength;
        let targets: Vec<usize> = match id {
            Some(id) => match self.store.index_of(id) {
                Some(i) => vec![i],
                None => {
                    log::debug!("add_random_impulse: unknown bubble {id}");
                    Vec::new()
                }
            },
            None => (0..self.store.len()).collect(),
        };

        for i in targets {
            let state = &mut self.store.states_mut()[i];
            if let Some(velocity) = state.simulated_velocity_mut() {
                let angle = self.rng.random_range(0.0..std::f64::consts::TAU);
                *velocity += from_angle(angle) * strength;
            }
        }
    }

    /// Stop everything: zero velocities, clear collision flags and release
    /// pins. Positions stay where they are.
    pub fn reset(&mut self) {
        let now = self.clock;
        for state in self.store.states_mut() {
            state.release();
            state.set_velocity(Vector2::ZERO);
            state.is_colliding = false;
            state.last_update = now;
        }
        log::debug!("Reset {} bubbles", self.store.len());
    }

    /// Placement for new content that arrives without a position
    pub fn random_seed_position(&mut self) -> BubblePosition {
        sim::random_seed_position(&mut self.rng)
    }

    /// Read-only view for the renderer, in store order
    pub fn snapshot(&self) -> Vec<BubbleSnapshot> {
        self.store
            .iter()
            .map(|(id, state)| BubbleSnapshot {
                id: id.clone(),
                position: state.position(),
                is_colliding: state.is_colliding,
                is_dragging: state.is_dragging(),
            })
            .collect()
    }

    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(bubbles: &[(&str, f64, f64)]) -> BubbleEngine {
        let mut engine = BubbleEngine::new(PhysicsConfig::default(), 1234);
        let seeds: Vec<_> = bubbles
            .iter()
            .map(|&(id, x, y)| EntitySeed::new(id, BubblePosition::new(x, y)))
            .collect();
        engine.reconcile(&seeds);
        engine
    }

    fn id(s: &str) -> BubbleId {
        BubbleId::from(s)
    }

    fn velocity(engine: &BubbleEngine, s: &str) -> Vector2 {
        engine.get(&id(s)).unwrap().velocity()
    }

    #[test]
    fn test_set_dragging_zeroes_velocity() {
        let mut engine = engine_with(&[("a", 50.0, 50.0)]);
        engine.update_position(
            &id("a"),
            BubblePosition::new(50.0, 50.0).with_velocity(Vector2::new(4.0, -4.0)),
        );
        engine.set_dragging(&id("a"), true);
        let a = engine.get(&id("a")).unwrap();
        assert!(a.is_dragging());
        assert_eq!(a.velocity(), Vector2::ZERO);

        engine.set_dragging(&id("a"), false);
        assert!(!engine.get(&id("a")).unwrap().is_dragging());
        assert_eq!(velocity(&engine, "a"), Vector2::ZERO);
    }

    #[test]
    fn test_drag_freezes_physics() {
        let mut engine = engine_with(&[("a", 30.0, 30.0), ("b", 35.0, 30.0)]);
        engine.update_position(
            &id("a"),
            BubblePosition::new(30.0, 30.0).with_velocity(Vector2::new(6.0, 2.0)),
        );
        engine.set_dragging(&id("a"), true);
        let before = engine.get(&id("a")).unwrap();

        engine.step(0.016, 16.0);
        let after = engine.get(&id("a")).unwrap();
        assert_eq!(after.pos, before.pos);
        assert_eq!(after.velocity(), before.velocity());
    }

    #[test]
    fn test_release_velocity_flings() {
        let mut engine = engine_with(&[("a", 50.0, 50.0)]);
        engine.set_dragging(&id("a"), true);
        engine.update_position(
            &id("a"),
            BubblePosition::new(60.0, 40.0).with_velocity(Vector2::new(8.0, 0.0)),
        );
        engine.set_dragging(&id("a"), false);
        assert_eq!(velocity(&engine, "a"), Vector2::new(8.0, 0.0));
        assert_eq!(engine.get(&id("a")).unwrap().pos, Vector2::new(60.0, 40.0));
    }

    #[test]
    fn test_drag_to_clamps_and_stops() {
        let mut engine = engine_with(&[("a", 50.0, 50.0)]);
        engine.set_dragging(&id("a"), true);
        engine.drag_to(&id("a"), -20.0, 120.0);
        let a = engine.get(&id("a")).unwrap();
        assert_eq!(a.pos, Vector2::new(5.0, 95.0));
        assert_eq!(a.velocity(), Vector2::ZERO);
        assert!(a.is_dragging());
    }

    #[test]
    fn test_update_position_keeps_render_fields() {
        let mut engine = engine_with(&[("a", 50.0, 50.0)]);
        let position = BubblePosition {
            x: 10.0,
            y: 90.0,
            z: 3.0,
            velocity: Vector2::new(1.0, 2.0),
            scale: 1.05,
        };
        engine.set_clock(500.0);
        engine.update_position(&id("a"), position);
        let a = engine.get(&id("a")).unwrap();
        assert_eq!(a.position(), position);
        assert_eq!(a.last_update, 500.0);
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut engine = engine_with(&[("a", 50.0, 50.0)]);
        let before = engine.snapshot();
        engine.update_position(&id("x"), BubblePosition::new(1.0, 1.0));
        engine.set_dragging(&id("x"), true);
        engine.add_random_impulse(Some(&id("x")));
        engine.drag_to(&id("x"), 1.0, 1.0);
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_impulse_is_local() {
        let mut engine = engine_with(&[("a", 20.0, 20.0), ("b", 50.0, 50.0), ("c", 80.0, 80.0)]);
        engine.update_position(
            &id("c"),
            BubblePosition::new(80.0, 80.0).with_velocity(Vector2::new(1.0, 1.0)),
        );

        engine.add_random_impulse(Some(&id("b")));
        assert!((velocity(&engine, "b").length() - 20.0).abs() < 1e-9);
        assert_eq!(velocity(&engine, "a"), Vector2::ZERO);
        assert_eq!(velocity(&engine, "c"), Vector2::new(1.0, 1.0));
    }

    #[test]
    fn test_impulse_all_skips_pinned() {
        let mut engine = engine_with(&[("a", 20.0, 20.0), ("b", 50.0, 50.0)]);
        engine.set_dragging(&id("a"), true);
        engine.add_random_impulse(None);
        assert_eq!(velocity(&engine, "a"), Vector2::ZERO);
        assert!((velocity(&engine, "b").length() - 20.0).abs() < 1e-9);

        engine.add_random_impulse(Some(&id("a")));
        assert_eq!(velocity(&engine, "a"), Vector2::ZERO);
    }

    #[test]
    fn test_reset_zeroes_motion_only() {
        let mut engine = engine_with(&[("a", 45.0, 50.0), ("b", 52.0, 50.0), ("c", 80.0, 20.0)]);
        engine.add_random_impulse(None);
        engine.step(0.016, 16.0);
        engine.set_dragging(&id("c"), true);

        let mut states: Vec<_> = engine.store().states().to_vec();
        for state in &mut states {
            state.is_colliding = true;
        }
        for (i, state) in states.iter().enumerate() {
            let key = engine.store().ids()[i].clone();
            engine.set(&key, *state);
        }
        let positions: Vec<_> = engine.store().states().iter().map(|s| s.pos).collect();

        engine.reset();
        for (state, pos) in engine.store().states().iter().zip(positions) {
            assert_eq!(state.velocity(), Vector2::ZERO);
            assert!(!state.is_colliding);
            assert!(!state.is_dragging());
            assert_eq!(state.pos, pos);
        }
    }

    #[test]
    fn test_step_scales_linearly_with_dt() {
        let mut engine = engine_with(&[("a", 50.0, 50.0)]);
        engine.update_position(
            &id("a"),
            BubblePosition::new(50.0, 50.0).with_velocity(Vector2::new(1.0, 0.0)),
        );
        engine.step(0.25, 250.0);
        let a = engine.get(&id("a")).unwrap();
        // Uncapped by default: 0.99 * 0.25 * 10
        assert!((a.pos.x - 52.475).abs() < 1e-9);
        assert_eq!(a.last_update, 250.0);
    }

    #[test]
    fn test_step_caps_dt() {
        let config = PhysicsConfig {
            max_tick_secs: Some(0.1),
            ..Default::default()
        };
        let mut engine = BubbleEngine::new(config, 1234);
        engine.reconcile(&[EntitySeed::new(
            "a",
            BubblePosition::new(50.0, 50.0).with_velocity(Vector2::new(1.0, 0.0)),
        )]);
        engine.step(5.0, 5000.0);
        let a = engine.get(&id("a")).unwrap();
        // Capped at 0.1s: moved 0.99 * 0.1 * 10, not 0.99 * 5 * 10
        assert!((a.pos.x - (50.0 + 0.99)).abs() < 1e-9);
        assert_eq!(a.last_update, 5000.0);
    }

    #[test]
    fn test_update_position_stores_finite_values_verbatim() {
        let mut engine = engine_with(&[("a", 50.0, 50.0)]);
        engine.update_position(&id("a"), BubblePosition::new(-12.0, 140.0));
        let a = engine.get(&id("a")).unwrap();
        assert_eq!(a.pos, Vector2::new(-12.0, 140.0));

        engine.update_position(&id("a"), BubblePosition::new(f64::NAN, 140.0));
        let a = engine.get(&id("a")).unwrap();
        assert_eq!(a.pos, Vector2::new(50.0, 140.0));

        // The next tick's margin clamp contains it
        engine.step(0.016, 16.0);
        let a = engine.get(&id("a")).unwrap();
        assert_eq!(a.pos.y, 95.0);
    }

    #[test]
    fn test_snapshot_order_and_json() {
        let mut engine = engine_with(&[("a", 20.0, 20.0), ("b", 70.0, 70.0)]);
        engine.set_dragging(&id("b"), true);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, id("a"));
        assert!(snapshot[1].is_dragging);

        let json = engine.snapshot_json().unwrap();
        assert!(json.contains("\"id\":\"a\""));
        assert!(json.contains("\"velocity\":{\"x\":0.0,\"y\":0.0}"));
    }
}
