//! Story Bubbles entry point
//!
//! Native: headless runner that drives the simulation loop from a fixed
//! 60 Hz virtual clock and prints the final layout as JSON. The browser build
//! is driven from `story_bubbles::web`.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;

    use clap::Parser;
    use story_bubbles::sim::EntitySeed;
    use story_bubbles::{BubbleEngine, ConfigError, ManualScheduler, PhysicsConfig, SimulationLoop};

    /// Host frame period for the virtual clock (60 Hz display)
    const FRAME_MS: f64 = 1000.0 / 60.0;

    #[derive(Parser, Debug)]
    #[command(name = "story-bubbles", version, about = "Run the bubble simulation headless")]
    struct Opts {
        /// Physics config JSON (defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of bubbles to seed
        #[arg(long, default_value_t = 12)]
        bubbles: usize,

        /// Simulated seconds to run
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,

        /// RNG seed for placement and impulses
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Pretty-print the final snapshot
        #[arg(long)]
        pretty: bool,
    }

    pub fn run() -> Result<(), ConfigError> {
        let opts = Opts::parse();

        let config = match &opts.config {
            Some(path) => PhysicsConfig::from_path(path)?,
            None => PhysicsConfig::default(),
        };
        log::info!(
            "Running {} bubbles for {}s (seed {}, {:?} collisions)",
            opts.bubbles,
            opts.seconds,
            opts.seed,
            config.collision_mode
        );

        let mut engine = BubbleEngine::new(config, opts.seed);
        let entities: Vec<EntitySeed> = (0..opts.bubbles)
            .map(|i| EntitySeed::new(format!("bubble-{i}"), engine.random_seed_position()))
            .collect();
        let report = engine.reconcile(&entities);
        log::info!("Tracking {} bubbles ({} dropped)", report.added, report.dropped);

        let mut sim_loop = SimulationLoop::new(ManualScheduler::new());
        let end = opts.seconds * 1000.0;
        let mut now = 0.0;
        let mut next_report = 1000.0;
        let mut ticks = 0u64;

        sim_loop.start(now);
        while now < end {
            now += FRAME_MS;
            if sim_loop.pump(now, &mut engine) == Some(true) {
                ticks += 1;
            }
            if now >= next_report {
                let stats = sim_loop.last_stats();
                log::info!(
                    "t={:.1}s ticks={} simulated={} colliding={}",
                    now / 1000.0,
                    ticks,
                    stats.simulated,
                    stats.colliding
                );
                next_report += 1000.0;
            }
        }
        sim_loop.stop();

        let snapshot = engine.snapshot();
        let json = if opts.pretty {
            serde_json::to_string_pretty(&snapshot)?
        } else {
            serde_json::to_string(&snapshot)?
        };
        println!("{json}");
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(e) = headless::run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is story_bubbles::web::init, this is just to satisfy the compiler
}
