//! Arcade Runtime entry point
//!
//! On the web this boots the page runtime and a gap-runner session driven by
//! requestAnimationFrame. Natively it runs the same game headless with a
//! seeded autopilot and a simulated tab switch.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Minimal flap-through-the-gaps game used to exercise the runtime
mod runner {
    use arcade_runtime::consts::BASE_TIMESTEP_MS;
    use arcade_runtime::{Body, Event, EventBus, GapObstacle, PhysicsKernel, Rect};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use serde_json::json;

    pub const ARENA_WIDTH: f32 = 400.0;
    pub const ARENA_HEIGHT: f32 = 600.0;
    const PLAYER_X: f32 = 80.0;
    const PLAYER_SIZE: f32 = 30.0;
    const FLAP_VELOCITY: f32 = -8.0;
    /// Pixels per 60 Hz frame
    const SCROLL_SPEED: f32 = 3.0;
    const SPAWN_INTERVAL_MS: f64 = 1500.0;
    const OBSTACLE_WIDTH: f32 = 60.0;
    const GAP_HEIGHT: f32 = 160.0;
    const GAP_MARGIN: f32 = 60.0;

    pub const CRASH_EVENT: &str = "runner:crash";
    pub const SCORE_EVENT: &str = "runner:score";

    pub struct GapRunner {
        kernel: PhysicsKernel,
        bus: EventBus,
        rng: Pcg32,
        arena: Rect,
        player: Body,
        obstacles: Vec<GapObstacle>,
        /// Obstacles already counted, by position in spawn order
        passed: usize,
        spawned: usize,
        spawn_timer: f64,
        score: u32,
        crashed: bool,
    }

    impl GapRunner {
        pub fn new(kernel: PhysicsKernel, bus: EventBus, seed: u64) -> Self {
            Self {
                kernel,
                bus,
                rng: Pcg32::seed_from_u64(seed),
                arena: Rect::new(0.0, 0.0, ARENA_WIDTH, ARENA_HEIGHT),
                player: Body::new(PLAYER_X, ARENA_HEIGHT / 2.0, PLAYER_SIZE, PLAYER_SIZE),
                obstacles: Vec::new(),
                passed: 0,
                spawned: 0,
                spawn_timer: 0.0,
                score: 0,
                crashed: false,
            }
        }

        pub fn score(&self) -> u32 {
            self.score
        }

        pub fn crashed(&self) -> bool {
            self.crashed
        }

        pub fn player(&self) -> &Body {
            &self.player
        }

        pub fn flap(&mut self) {
            if !self.crashed {
                let vx = self.player.velocity_x;
                self.kernel.set_velocity(&mut self.player, vx, FLAP_VELOCITY);
            }
        }

        /// Flap when sinking below the middle of the next opening
        pub fn autopilot(&mut self) {
            let target = self
                .obstacles
                .iter()
                .find(|o| o.right() >= self.player.x)
                .map_or(ARENA_HEIGHT / 2.0, |o| o.gap_y + o.gap_height * 0.6);
            if self.player.bounds().bottom() > target && self.player.velocity_y >= 0.0 {
                self.flap();
            }
        }

        pub fn fixed_update(&mut self, dt: f64) {
            if self.crashed {
                return;
            }

            let hits = self.kernel.step_within(&mut self.player, dt, &self.arena);
            if hits.grounded() {
                self.crash();
                return;
            }

            let scroll = SCROLL_SPEED * (dt / BASE_TIMESTEP_MS) as f32;
            for obstacle in &mut self.obstacles {
                obstacle.x -= scroll;
            }

            self.spawn_timer += dt;
            if self.spawn_timer >= SPAWN_INTERVAL_MS {
                self.spawn_timer -= SPAWN_INTERVAL_MS;
                self.spawn();
            }

            if self
                .obstacles
                .iter()
                .any(|o| self.kernel.player_hits_gap(&self.player, o))
            {
                self.crash();
                return;
            }

            // Count obstacles the player has fully cleared
            let cleared = self.spawned - self.obstacles.len()
                + self
                    .obstacles
                    .iter()
                    .take_while(|o| o.right() < self.player.x)
                    .count();
            while self.passed < cleared {
                self.passed += 1;
                self.score += 1;
                self.bus
                    .emit(Event::custom(SCORE_EVENT, json!({ "score": self.score })));
            }

            let before = self.obstacles.len();
            self.obstacles.retain(|o| o.right() > 0.0);
            if self.obstacles.len() != before {
                log::debug!("Despawned {} obstacles", before - self.obstacles.len());
            }
        }

        fn spawn(&mut self) {
            let gap_y = self
                .rng
                .random_range(GAP_MARGIN..ARENA_HEIGHT - GAP_MARGIN - GAP_HEIGHT);
            self.obstacles.push(GapObstacle::new(
                ARENA_WIDTH,
                OBSTACLE_WIDTH,
                gap_y,
                GAP_HEIGHT,
                0.0,
                ARENA_HEIGHT,
            ));
            self.spawned += 1;
        }

        fn crash(&mut self) {
            self.crashed = true;
            log::info!("Crashed with score {}", self.score);
            self.bus
                .emit(Event::custom(CRASH_EVENT, json!({ "score": self.score })));
        }
    }

    #[cfg(test)]
    mod tests {
        use std::cell::Cell;
        use std::rc::Rc;

        use arcade_runtime::platform::ManualClock;
        use arcade_runtime::{EventKind, PhysicsConfig};

        use super::*;

        fn runner(seed: u64) -> (GapRunner, EventBus) {
            let bus = EventBus::new(Rc::new(ManualClock::new(0.0)));
            let kernel = PhysicsKernel::new(PhysicsConfig::default());
            let runner = GapRunner::new(kernel, bus.clone(), seed);
            (runner, bus)
        }

        #[test]
        fn test_falls_to_floor_without_input() {
            let (mut runner, bus) = runner(1);
            let crashes = Rc::new(Cell::new(0));
            let c = crashes.clone();
            bus.on(EventKind::custom(CRASH_EVENT), move |_| c.set(c.get() + 1));

            for _ in 0..240 {
                runner.fixed_update(BASE_TIMESTEP_MS);
            }
            assert!(runner.crashed());
            assert_eq!(crashes.get(), 1);
        }

        #[test]
        fn test_same_seed_same_run() {
            let (mut a, _) = runner(7);
            let (mut b, _) = runner(7);
            for _ in 0..1200 {
                a.autopilot();
                b.autopilot();
                a.fixed_update(BASE_TIMESTEP_MS);
                b.fixed_update(BASE_TIMESTEP_MS);
            }
            assert_eq!(a.score(), b.score());
            assert_eq!(a.crashed(), b.crashed());
            assert_eq!(a.player(), b.player());
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;

    use arcade_runtime::{EventKind, FrameLoop, Runtime, RuntimeConfig};

    use crate::runner::{CRASH_EVENT, GapRunner};

    struct Page {
        _runtime: Runtime,
        _session: FrameLoop,
        _flap: Closure<dyn FnMut(web_sys::Event)>,
    }

    thread_local! {
        static PAGE: RefCell<Option<Page>> = const { RefCell::new(None) };
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Arcade runtime starting...");

        let runtime = match Runtime::for_page(RuntimeConfig::load()) {
            Ok(runtime) => runtime,
            Err(e) => {
                log::error!("Invalid runtime configuration: {}", e);
                return;
            }
        };
        let session = match runtime.new_session() {
            Ok(session) => session,
            Err(e) => {
                log::error!("Could not create session: {}", e);
                return;
            }
        };

        let seed = js_sys::Date::now() as u64;
        let runner = Rc::new(RefCell::new(GapRunner::new(
            runtime.physics(),
            runtime.bus().clone(),
            seed,
        )));
        log::info!("Started gap runner with seed: {}", seed);

        {
            let runner = runner.clone();
            session.try_on_fixed_update(move |dt| {
                runner.try_borrow_mut()?.fixed_update(dt);
                Ok(())
            });
        }
        {
            let session = session.clone();
            runtime.bus().once(EventKind::custom(CRASH_EVENT), move |_| session.stop());
        }

        let flap = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if let Ok(mut runner) = runner.try_borrow_mut() {
                runner.flap();
            }
        });
        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("pointerdown", flap.as_ref().unchecked_ref());
        }

        session.start();
        PAGE.with(|page| {
            *page.borrow_mut() = Some(Page {
                _runtime: runtime,
                _session: session,
                _flap: flap,
            });
        });
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::cell::RefCell;
    use std::rc::Rc;

    use arcade_runtime::platform::{ManualClock, ManualScheduler};
    use arcade_runtime::{Event, EventKind, Runtime, RuntimeConfig};

    use runner::{CRASH_EVENT, GapRunner, SCORE_EVENT};

    const SEED: u64 = 0x5EED;
    const FRAME_MS: f64 = 1000.0 / 60.0;
    const MAX_FRAMES: u32 = 60 * 60;
    const HIDE_AT_FRAME: u32 = 600;
    const SHOW_AT_FRAME: u32 = 720;

    env_logger::init();
    log::info!("Arcade runtime (native) starting...");

    let clock = ManualClock::new(0.0);
    let scheduler = ManualScheduler::new();
    let runtime = match Runtime::new(
        RuntimeConfig::load(),
        Rc::new(clock.clone()),
        Rc::new(scheduler.clone()),
    ) {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Invalid runtime configuration: {}", e);
            return;
        }
    };
    let session = match runtime.new_session() {
        Ok(session) => session,
        Err(e) => {
            log::error!("Could not create session: {}", e);
            return;
        }
    };

    let runner = Rc::new(RefCell::new(GapRunner::new(
        runtime.physics(),
        runtime.bus().clone(),
        SEED,
    )));
    {
        let runner = runner.clone();
        session.try_on_fixed_update(move |dt| {
            let mut runner = runner.try_borrow_mut()?;
            runner.autopilot();
            runner.fixed_update(dt);
            Ok(())
        });
    }
    runtime.bus().on(EventKind::custom(SCORE_EVENT), |event| {
        if let Event::Custom { payload, .. } = event {
            log::debug!("Score: {}", payload["score"]);
        }
    });
    runtime.bus().on(EventKind::custom(CRASH_EVENT), |event| {
        if let Event::Custom { payload, .. } = event {
            log::info!("Crash reported with score {}", payload["score"]);
        }
    });

    session.start();
    let mut now = 0.0;
    for frame in 1..=MAX_FRAMES {
        if runner.borrow().crashed() {
            session.stop();
            break;
        }
        match frame {
            HIDE_AT_FRAME => runtime.visibility().set_page_visible(false),
            SHOW_AT_FRAME => {
                runtime.visibility().set_page_visible(true);
                runtime.bus().emit(Event::ResumeRequest);
            }
            _ => {}
        }
        now += FRAME_MS;
        clock.set(now);
        scheduler.fire(now);
    }

    log::info!(
        "Run finished: score {}, {} frames, {:.0}ms simulated, {:.0}ms hidden",
        runner.borrow().score(),
        session.frame_count(),
        session.elapsed_time(),
        runtime.visibility().total_hidden_time()
    );
    session.destroy();
    runtime.shutdown();
}
