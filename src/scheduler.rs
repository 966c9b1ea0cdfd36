//! Simulation loop driver
//!
//! The loop never owns a clock or a thread. A host scheduling primitive
//! (requestAnimationFrame in the browser, a fixed-interval pump headless)
//! calls `on_frame` with its timestamp; the loop gates ticks to
//! `tick_interval_ms` and asks for the next frame while running.

use crate::engine::BubbleEngine;
use crate::sim::{Millis, TickStats};

/// Host capability: "call me back on the next frame", cancellable
pub trait FrameScheduler {
    type Handle: Copy;

    /// Schedule one callback. `None` if the host refused.
    fn request_frame(&mut self) -> Option<Self::Handle>;

    fn cancel_frame(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    #[default]
    Stopped,
    Running,
}

pub struct SimulationLoop<S: FrameScheduler> {
    scheduler: S,
    phase: LoopPhase,
    pending: Option<S::Handle>,
    last_tick: Millis,
    last_stats: TickStats,
}

impl<S: FrameScheduler> SimulationLoop<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            phase: LoopPhase::Stopped,
            pending: None,
            last_tick: 0.0,
            last_stats: TickStats::default(),
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == LoopPhase::Running
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Counters from the most recent processed tick
    pub fn last_stats(&self) -> TickStats {
        self.last_stats
    }

    /// Begin ticking. No-op while already running.
    pub fn start(&mut self, now: Millis) {
        if self.is_running() {
            return;
        }
        self.phase = LoopPhase::Running;
        self.last_tick = now;
        self.schedule_next();
        log::info!("Bubble simulation started");
    }

    /// Stop ticking and cancel the pending frame. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        if self.is_running() {
            self.phase = LoopPhase::Stopped;
            log::info!("Bubble simulation stopped");
        }
    }

    /// Host frame callback. Returns true when a tick was processed.
    pub fn on_frame(&mut self, now: Millis, engine: &mut BubbleEngine) -> bool {
        // The frame that invoked us is spent
        self.pending = None;
        if !self.is_running() {
            return false;
        }

        let elapsed = now - self.last_tick;
        let ticked = elapsed >= engine.config().tick_interval_ms;
        if ticked {
            self.last_stats = engine.step(elapsed / 1000.0, now);
            self.last_tick = now;
        }

        self.schedule_next();
        ticked
    }

    fn schedule_next(&mut self) {
        match self.scheduler.request_frame() {
            Some(handle) => self.pending = Some(handle),
            None => {
                log::warn!("Host refused a frame request, stopping simulation");
                self.phase = LoopPhase::Stopped;
            }
        }
    }
}

impl<S: FrameScheduler> Drop for SimulationLoop<S> {
    fn drop(&mut self) {
        // A callback must never outlive the loop
        self.stop();
    }
}

/// Headless scheduler pumped by the caller (tests, native runner).
///
/// At most one frame can be outstanding; `take_frame` hands it to the pump.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_handle: u32,
    pending: Option<u32>,
    pub requested: usize,
    pub cancelled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consume the outstanding frame, if any
    pub fn take_frame(&mut self) -> Option<u32> {
        self.pending.take()
    }
}

impl FrameScheduler for ManualScheduler {
    type Handle = u32;

    fn request_frame(&mut self) -> Option<u32> {
        self.next_handle += 1;
        self.requested += 1;
        self.pending = Some(self.next_handle);
        Some(self.next_handle)
    }

    fn cancel_frame(&mut self, handle: u32) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}

impl SimulationLoop<ManualScheduler> {
    /// Fire the outstanding frame at `now`. Returns `None` when nothing was
    /// scheduled, otherwise whether a tick ran.
    pub fn pump(&mut self, now: Millis, engine: &mut BubbleEngine) -> Option<bool> {
        self.scheduler.take_frame()?;
        Some(self.on_frame(now, engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::sim::{BubbleId, BubblePosition, EntitySeed, Vector2};

    fn engine() -> BubbleEngine {
        let mut engine = BubbleEngine::new(PhysicsConfig::default(), 9);
        engine.reconcile(&[EntitySeed::new(
            "a",
            BubblePosition::new(50.0, 50.0).with_velocity(Vector2::new(1.0, 0.0)),
        )]);
        engine
    }

    #[test]
    fn test_start_schedules_once() {
        let mut sim_loop = SimulationLoop::new(ManualScheduler::new());
        assert_eq!(sim_loop.phase(), LoopPhase::Stopped);

        sim_loop.start(0.0);
        sim_loop.start(5.0);
        assert!(sim_loop.is_running());
        assert_eq!(sim_loop.scheduler().requested, 1);
    }

    #[test]
    fn test_frames_gated_to_interval() {
        let mut engine = engine();
        let mut sim_loop = SimulationLoop::new(ManualScheduler::new());
        sim_loop.start(0.0);

        // Too early: skipped but rescheduled
        assert_eq!(sim_loop.pump(10.0, &mut engine), Some(false));
        assert!(sim_loop.scheduler().has_pending());
        assert_eq!(engine.get(&BubbleId::from("a")).unwrap().pos.x, 50.0);

        assert_eq!(sim_loop.pump(16.0, &mut engine), Some(true));
        let a = engine.get(&BubbleId::from("a")).unwrap();
        assert!(a.pos.x > 50.0);
        assert_eq!(a.last_update, 16.0);

        // Gate measures from the last processed tick
        assert_eq!(sim_loop.pump(30.0, &mut engine), Some(false));
        assert_eq!(sim_loop.pump(32.0, &mut engine), Some(true));
        assert_eq!(sim_loop.scheduler().requested, 5);
    }

    #[test]
    fn test_stop_is_idempotent_and_cancels() {
        let mut engine = engine();
        let mut sim_loop = SimulationLoop::new(ManualScheduler::new());
        sim_loop.start(0.0);

        sim_loop.stop();
        sim_loop.stop();
        assert_eq!(sim_loop.phase(), LoopPhase::Stopped);
        assert_eq!(sim_loop.scheduler().cancelled, 1);
        assert!(!sim_loop.scheduler().has_pending());
        assert_eq!(sim_loop.pump(100.0, &mut engine), None);

        // A stale frame delivered after stop does nothing and schedules nothing
        assert!(!sim_loop.on_frame(200.0, &mut engine));
        assert_eq!(sim_loop.scheduler().requested, 1);
    }

    #[test]
    fn test_restart_after_stop() {
        let mut engine = engine();
        let mut sim_loop = SimulationLoop::new(ManualScheduler::new());
        sim_loop.start(0.0);
        sim_loop.stop();
        sim_loop.start(1000.0);

        // Restart resets the gate, so no giant catch-up step
        assert_eq!(sim_loop.pump(1010.0, &mut engine), Some(false));
        assert_eq!(sim_loop.pump(1016.0, &mut engine), Some(true));
    }

    #[test]
    fn test_one_frame_outstanding_per_interval() {
        let mut engine = engine();
        let mut sim_loop = SimulationLoop::new(ManualScheduler::new());
        sim_loop.start(0.0);
        let mut ticks = 0;
        let mut now = 0.0;
        for _ in 0..60 {
            now += 1000.0 / 60.0;
            if sim_loop.pump(now, &mut engine) == Some(true) {
                ticks += 1;
            }
        }
        assert_eq!(sim_loop.scheduler().requested, 61);
        assert!(ticks >= 58 && ticks <= 60);
    }

    /// Host that refuses frames
    struct Refusing;

    impl FrameScheduler for Refusing {
        type Handle = ();
        fn request_frame(&mut self) -> Option<()> {
            None
        }
        fn cancel_frame(&mut self, _handle: ()) {}
    }

    #[test]
    fn test_refused_frame_stops_loop() {
        let mut sim_loop = SimulationLoop::new(Refusing);
        sim_loop.start(0.0);
        assert!(!sim_loop.is_running());
    }
}
