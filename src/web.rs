//! Browser host
//!
//! Drives the simulation from `requestAnimationFrame` and exposes the engine
//! to the page as `BubbleField`. Data crosses the boundary as JSON in the
//! same shapes the feed API uses.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::config::PhysicsConfig;
use crate::engine::BubbleEngine;
use crate::scheduler::{FrameScheduler, SimulationLoop};
use crate::sim::{BubbleId, BubblePosition, EntitySeed};

type FrameCallback = Closure<dyn FnMut(f64)>;

/// `FrameScheduler` over `window.requestAnimationFrame`
pub struct AnimationFrameScheduler {
    callback: Rc<RefCell<Option<FrameCallback>>>,
}

impl FrameScheduler for AnimationFrameScheduler {
    type Handle = i32;

    fn request_frame(&mut self) -> Option<i32> {
        let window = web_sys::window()?;
        let callback = self.callback.borrow();
        let closure = callback.as_ref()?;
        window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .ok()
    }

    fn cancel_frame(&mut self, handle: i32) {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle);
        }
    }
}

struct Field {
    engine: BubbleEngine,
    sim_loop: SimulationLoop<AnimationFrameScheduler>,
}

fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Bubble simulation handle for the page
#[wasm_bindgen]
pub struct BubbleField {
    field: Rc<RefCell<Field>>,
    callback: Rc<RefCell<Option<FrameCallback>>>,
}

#[wasm_bindgen]
impl BubbleField {
    /// Create a field. `config_json` overrides the stored tuning.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<BubbleField, JsError> {
        let config = match config_json {
            Some(json) => PhysicsConfig::from_json(&json)?,
            None => PhysicsConfig::load(),
        };
        let seed = js_sys::Date::now() as u64;
        log::info!("Bubble field created with seed: {}", seed);

        let callback: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
        let field = Rc::new(RefCell::new(Field {
            engine: BubbleEngine::new(config, seed),
            sim_loop: SimulationLoop::new(AnimationFrameScheduler {
                callback: callback.clone(),
            }),
        }));

        let weak: Weak<RefCell<Field>> = Rc::downgrade(&field);
        *callback.borrow_mut() = Some(Closure::new(move |time: f64| {
            if let Some(field) = weak.upgrade() {
                let mut field = field.borrow_mut();
                let Field { engine, sim_loop } = &mut *field;
                sim_loop.on_frame(time, engine);
            }
        }));

        Ok(BubbleField { field, callback })
    }

    /// Sync tracked bubbles with `[{ id, position }]`
    pub fn reconcile(&self, entities_json: &str) -> Result<(), JsError> {
        let entities: Vec<EntitySeed> = serde_json::from_str(entities_json)?;
        let mut field = self.field.borrow_mut();
        field.engine.set_clock(now());
        field.engine.reconcile(&entities);
        Ok(())
    }

    pub fn start(&self) {
        self.field.borrow_mut().sim_loop.start(now());
    }

    pub fn stop(&self) {
        self.field.borrow_mut().sim_loop.stop();
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.field.borrow().sim_loop.is_running()
    }

    #[wasm_bindgen(js_name = updatePosition)]
    pub fn update_position(&self, id: &str, position_json: &str) -> Result<(), JsError> {
        let position: BubblePosition = serde_json::from_str(position_json)?;
        let mut field = self.field.borrow_mut();
        field.engine.set_clock(now());
        field.engine.update_position(&BubbleId::from(id), position);
        Ok(())
    }

    /// Pointer-follow in canvas percent
    #[wasm_bindgen(js_name = dragTo)]
    pub fn drag_to(&self, id: &str, x: f64, y: f64) {
        let mut field = self.field.borrow_mut();
        field.engine.set_clock(now());
        field.engine.drag_to(&BubbleId::from(id), x, y);
    }

    #[wasm_bindgen(js_name = setDragging)]
    pub fn set_dragging(&self, id: &str, dragging: bool) {
        self.field
            .borrow_mut()
            .engine
            .set_dragging(&BubbleId::from(id), dragging);
    }

    #[wasm_bindgen(js_name = addRandomImpulse)]
    pub fn add_random_impulse(&self, id: Option<String>) {
        let id = id.map(BubbleId::from);
        self.field
            .borrow_mut()
            .engine
            .add_random_impulse(id.as_ref());
    }

    pub fn reset(&self) {
        let mut field = self.field.borrow_mut();
        field.engine.set_clock(now());
        field.engine.reset();
    }

    /// Random seed position for content that has none (JSON)
    #[wasm_bindgen(js_name = spawnPosition)]
    pub fn spawn_position(&self) -> Result<String, JsError> {
        let position = self.field.borrow_mut().engine.random_seed_position();
        Ok(serde_json::to_string(&position)?)
    }

    /// `[{ id, position, is_colliding, is_dragging }]` for the renderer
    pub fn snapshot(&self) -> Result<String, JsError> {
        Ok(self.field.borrow().engine.snapshot_json()?)
    }

    /// Replace tuning and persist it
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&self, config_json: &str) -> Result<(), JsError> {
        let config = PhysicsConfig::from_json(config_json)?;
        config.save();
        self.field.borrow_mut().engine.set_config(config);
        Ok(())
    }
}

impl Drop for BubbleField {
    fn drop(&mut self) {
        if let Ok(mut field) = self.field.try_borrow_mut() {
            field.sim_loop.stop();
        }
        // Release the closure so nothing can call back into freed state
        *self.callback.borrow_mut() = None;
        log::info!("Bubble field dropped");
    }
}

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("Story bubbles wasm module loaded");
}
