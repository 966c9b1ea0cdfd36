//! Bubble simulation module
//!
//! Pure, host-independent physics:
//! - No clocks: timestamps and `dt` come from the caller
//! - Seeded RNG only
//! - Stable iteration order (store insertion order)
//! - No rendering or platform dependencies

pub mod collision;
pub mod forces;
pub mod spawn;
pub mod state;
pub mod store;
pub mod tick;

pub use collision::{CollisionResult, Correction, bubble_collision, resolve_sequential, resolve_symmetric};
pub use spawn::random_seed_position;
pub use state::{BubbleId, BubbleMode, BubblePosition, BubbleState, EntitySeed, Millis, Vector2};
pub use store::{BubbleStore, ReconcileReport, replace_non_finite, sanitize_position};
pub use tick::{TickStats, integrate, step};
