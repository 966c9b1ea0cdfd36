//! Bubble state store
//!
//! Dense storage in a fixed order plus an id -> index table. Iteration order
//! is insertion order and survives removals, so every tick walks bubbles in
//! the same sequence.

use std::collections::{HashMap, HashSet};

use super::state::{BubbleId, BubblePosition, BubbleState, EntitySeed, Millis, Vector2};
use crate::config::PhysicsConfig;

#[derive(Debug, Clone, Default)]
pub struct BubbleStore {
    ids: Vec<BubbleId>,
    states: Vec<BubbleState>,
    index: HashMap<BubbleId, usize>,
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
    pub kept: usize,
    /// Entities beyond the configured cap that were not tracked
    pub dropped: usize,
}

impl BubbleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn contains(&self, id: &BubbleId) -> bool {
        self.index.contains_key(id)
    }

    /// Position of a bubble in iteration order
    pub fn index_of(&self, id: &BubbleId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &BubbleId) -> Option<BubbleState> {
        self.index.get(id).map(|&i| self.states[i])
    }

    pub fn get_mut(&mut self, id: &BubbleId) -> Option<&mut BubbleState> {
        let i = *self.index.get(id)?;
        Some(&mut self.states[i])
    }

    /// Replace the state of a tracked bubble. Untracked ids are ignored;
    /// only reconciliation decides which bubbles exist.
    pub fn set(&mut self, id: &BubbleId, state: BubbleState) -> bool {
        match self.get_mut(id) {
            Some(slot) => {
                *slot = state;
                true
            }
            None => false,
        }
    }

    pub fn ids(&self) -> &[BubbleId] {
        &self.ids
    }

    pub fn states(&self) -> &[BubbleState] {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut [BubbleState] {
        &mut self.states
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BubbleId, &BubbleState)> {
        self.ids.iter().zip(self.states.iter())
    }

    /// Match the tracked set to `entities`.
    ///
    /// New ids get a sanitized seed state, missing ids are dropped, and
    /// survivors keep their state verbatim. At most `config.max_bubbles`
    /// bubbles are tracked; survivors always keep their slot.
    pub fn reconcile(
        &mut self,
        entities: &[EntitySeed],
        config: &PhysicsConfig,
        now: Millis,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let wanted: HashSet<&BubbleId> = entities.iter().map(|e| &e.id).collect();

        let before = self.states.len();
        let mut kept_ids = Vec::with_capacity(before);
        let mut kept_states = Vec::with_capacity(before);
        for (id, state) in self.ids.drain(..).zip(self.states.drain(..)) {
            if wanted.contains(&id) {
                kept_ids.push(id);
                kept_states.push(state);
            }
        }
        report.kept = kept_ids.len();
        report.removed = before - report.kept;
        self.ids = kept_ids;
        self.states = kept_states;
        self.rebuild_index();

        for entity in entities {
            if self.index.contains_key(&entity.id) {
                continue;
            }
            if self.states.len() >= config.max_bubbles {
                report.dropped += 1;
                continue;
            }
            let seed = sanitize_position(&entity.seed_position, config);
            self.index.insert(entity.id.clone(), self.states.len());
            self.ids.push(entity.id.clone());
            self.states.push(BubbleState::from_seed(&seed, now));
            report.added += 1;
        }

        if report.dropped > 0 {
            log::warn!(
                "Bubble cap of {} reached, {} entities not simulated",
                config.max_bubbles,
                report.dropped
            );
        }
        if report.added > 0 || report.removed > 0 {
            log::debug!(
                "Reconciled bubbles: +{} -{} ({} kept)",
                report.added,
                report.removed,
                report.kept
            );
        }

        report
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        self.index.extend(
            self.ids
                .iter()
                .enumerate()
                .map(|(i, id)| (id.clone(), i)),
        );
    }
}

/// Replace non-finite fields so NaN/inf never enters the arithmetic.
///
/// Non-finite coordinates fall back to the canvas center and non-finite
/// velocity to rest. Finite values pass through untouched.
pub fn replace_non_finite(position: &BubblePosition, config: &PhysicsConfig) -> BubblePosition {
    let mut clean = *position;
    let mut fixed = false;

    if !clean.x.is_finite() {
        clean.x = config.center.x;
        fixed = true;
    }
    if !clean.y.is_finite() {
        clean.y = config.center.y;
        fixed = true;
    }
    if !clean.velocity.is_finite() {
        clean.velocity = Vector2::ZERO;
        fixed = true;
    }
    if !clean.z.is_finite() {
        clean.z = 0.0;
        fixed = true;
    }
    if !clean.scale.is_finite() {
        clean.scale = 1.0;
        fixed = true;
    }
    if fixed {
        log::warn!("Replaced non-finite bubble position {position:?}");
    }
    clean
}

/// Make a seed position safe to simulate: finite and inside the canvas
pub fn sanitize_position(position: &BubblePosition, config: &PhysicsConfig) -> BubblePosition {
    let mut clean = replace_non_finite(position, config);
    clean.x = clean.x.clamp(0.0, config.canvas_size);
    clean.y = clean.y.clamp(0.0, config.canvas_size);
    clean
}
