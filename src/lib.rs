//! Arcade Runtime - shared real-time substrate for browser mini-games
//!
//! Core modules:
//! - `events`: Typed publish/subscribe bus with diagnostic history
//! - `platform`: Clock, frame scheduling and page visibility
//! - `physics`: Stateless 2D integration and collision kernel
//! - `frame_loop`: Fixed/variable timestep game loop with auto-pause
//! - `config`: Data-driven timing and physics tuning

pub mod config;
pub mod events;
pub mod frame_loop;
mod isolate;
pub mod physics;
pub mod platform;

pub use config::{BusConfig, ConfigError, LoopConfig, PhysicsConfig, RuntimeConfig};
pub use events::{Event, EventBus, EventKind, ScopedBus, Subscription};
pub use frame_loop::{FrameLoop, Phase, Unsubscribe};
pub use isolate::{CallbackError, CallbackResult};
pub use physics::{Body, Circle, GapObstacle, PhysicsKernel, Rect};
pub use platform::{Clock, FrameScheduler, VisibilityTracker};

use std::rc::Rc;

/// Tuned defaults (all overridable through [`config`])
pub mod consts {
    /// Physics baseline: velocities are expressed per frame at 60 Hz
    pub const BASE_TIMESTEP_MS: f64 = 1000.0 / 60.0;
    /// Default fixed simulation slice
    pub const DEFAULT_FIXED_TIMESTEP_MS: f64 = 1000.0 / 60.0;
    /// Largest delta handed to callbacks after a stall
    pub const DEFAULT_MAX_DELTA_MS: f64 = 100.0;

    /// FPS estimate: samples in the rolling window
    pub const FPS_WINDOW: usize = 60;
    /// FPS estimate: refresh period of the published value
    pub const FPS_REFRESH_INTERVAL_MS: f64 = 500.0;

    /// Event history ring size
    pub const EVENT_HISTORY_CAPACITY: usize = 50;

    pub const DEFAULT_GRAVITY: f32 = 0.5;
    pub const DEFAULT_MAX_VELOCITY_X: f32 = 10.0;
    pub const DEFAULT_MAX_VELOCITY_Y: f32 = 15.0;
    pub const DEFAULT_FRICTION: f32 = 0.8;
    pub const DEFAULT_AIR_RESISTANCE: f32 = 0.99;
    /// Player hitbox shrink (0.7 = collider is 70% of the drawn radius)
    pub const DEFAULT_FORGIVENESS: f32 = 0.7;
}

/// Page-lifetime owner of the shared services
///
/// Holds the one event bus and the one visibility tracker for the page, and
/// builds a [`FrameLoop`] per game session wired to both.
pub struct Runtime {
    config: RuntimeConfig,
    bus: EventBus,
    visibility: VisibilityTracker,
    clock: Rc<dyn Clock>,
    scheduler: Rc<dyn FrameScheduler>,
}

impl Runtime {
    pub fn new(
        config: RuntimeConfig,
        clock: Rc<dyn Clock>,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let bus = EventBus::with_config(&config.bus, clock.clone());
        let existing = VisibilityTracker::current();
        let visibility = VisibilityTracker::shared(bus.clone(), clock.clone());
        // An existing page tracker keeps the settings its creator chose
        if existing.is_none() {
            visibility.set_auto_pause(config.frame_loop.auto_pause_on_hidden);
        } else if visibility.auto_pause_enabled() != config.frame_loop.auto_pause_on_hidden {
            log::warn!(
                "Visibility tracker already exists; keeping auto-pause {}",
                visibility.auto_pause_enabled()
            );
        }
        Ok(Self {
            config,
            bus,
            visibility,
            clock,
            scheduler,
        })
    }

    /// Runtime backed by `performance.now()` and requestAnimationFrame,
    /// listening to the document's visibility and the window's focus
    #[cfg(target_arch = "wasm32")]
    pub fn for_page(config: RuntimeConfig) -> Result<Self, ConfigError> {
        let runtime = Self::new(
            config,
            Rc::new(platform::PerformanceClock),
            Rc::new(platform::AnimationFrameScheduler::default()),
        )?;
        runtime.visibility.attach_to_page();
        Ok(runtime)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn visibility(&self) -> &VisibilityTracker {
        &self.visibility
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Physics kernel tuned with this runtime's configuration
    pub fn physics(&self) -> PhysicsKernel {
        PhysicsKernel::new(self.config.physics.clone())
    }

    /// Create a frame loop for a new game session
    pub fn new_session(&self) -> Result<FrameLoop, ConfigError> {
        FrameLoop::new(
            self.config.frame_loop.clone(),
            self.bus.clone(),
            self.clock.clone(),
            self.scheduler.clone(),
        )
    }

    /// Tear down page-lifetime services
    pub fn shutdown(self) {
        self.visibility.destroy();
        self.bus.remove_all_listeners(None);
    }
}
