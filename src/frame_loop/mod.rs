//! Frame-rate independent game loop
//!
//! Each scheduled frame:
//! 1. reschedules itself before doing any work
//! 2. while paused, only moves the timing anchor
//! 3. clamps the frame delta to `max_delta_time`
//! 4. runs fixed-update callbacks once per whole `fixed_timestep` in the
//!    accumulator, carrying the remainder to the next frame
//! 5. runs update callbacks with the clamped delta, then render callbacks
//!    with the interpolation alpha
//!
//! States: stopped -> running <-> paused -> stopped. Pausing when paused,
//! resuming when running and stopping when stopped are silent no-ops.
//!
//! Scheduled frames only hold a weak reference to the loop, so the loop runs
//! for as long as some [`FrameLoop`] handle is alive.

pub mod callbacks;
pub mod fps;

use std::cell::RefCell;
use std::rc::Rc;

pub use callbacks::{Phase, Unsubscribe};
pub use fps::FpsCounter;

use callbacks::{CallbackRegistry, PhaseCallback, invoke, register};
use crate::config::{ConfigError, LoopConfig};
use crate::events::{Event, EventBus, EventKind, ScopedBus};
use crate::isolate::CallbackResult;
use crate::platform::{Clock, FrameHandle, FrameScheduler};

fn infallible(mut callback: impl FnMut(f64) + 'static) -> PhaseCallback {
    Box::new(move |arg: f64| -> CallbackResult {
        callback(arg);
        Ok(())
    })
}

#[derive(Debug)]
struct LoopState {
    is_running: bool,
    is_paused: bool,
    last_timestamp: f64,
    elapsed_time: f64,
    frame_count: u64,
    accumulator: f64,
    pending_frame: Option<FrameHandle>,
    fps: FpsCounter,
}

struct LoopInner {
    config: LoopConfig,
    state: RefCell<LoopState>,
    callbacks: Rc<RefCell<CallbackRegistry>>,
    bus: EventBus,
    clock: Rc<dyn Clock>,
    scheduler: Rc<dyn FrameScheduler>,
    /// Auto-pause subscriptions, released on destroy
    wiring: RefCell<Option<ScopedBus>>,
}

/// Handle to a game session's loop; clones control the same loop
#[derive(Clone)]
pub struct FrameLoop {
    inner: Rc<LoopInner>,
}

impl FrameLoop {
    pub fn new(
        config: LoopConfig,
        bus: EventBus,
        clock: Rc<dyn Clock>,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let fps = FpsCounter::new(config.fps_window, config.fps_refresh_interval);
        let auto_pause = config.auto_pause_on_hidden;
        let frame_loop = Self {
            inner: Rc::new(LoopInner {
                config,
                state: RefCell::new(LoopState {
                    is_running: false,
                    is_paused: false,
                    last_timestamp: 0.0,
                    elapsed_time: 0.0,
                    frame_count: 0,
                    accumulator: 0.0,
                    pending_frame: None,
                    fps,
                }),
                callbacks: Rc::new(RefCell::new(CallbackRegistry::default())),
                bus,
                clock,
                scheduler,
                wiring: RefCell::new(None),
            }),
        };
        if auto_pause {
            frame_loop.wire_auto_pause();
        }
        Ok(frame_loop)
    }

    /// Follow the bus's pause requests. Page visibility returning only
    /// refreshes the timing anchor; resuming waits for an explicit
    /// `ResumeRequest` or [`FrameLoop::resume`].
    fn wire_auto_pause(&self) {
        let scope = self.inner.bus.scoped();

        let weak = Rc::downgrade(&self.inner);
        scope.on(EventKind::PauseRequest, move |_| {
            if let Some(inner) = weak.upgrade() {
                FrameLoop { inner }.pause();
            }
        });

        let weak = Rc::downgrade(&self.inner);
        scope.on(EventKind::ResumeRequest, move |_| {
            if let Some(inner) = weak.upgrade() {
                FrameLoop { inner }.resume();
            }
        });

        let weak = Rc::downgrade(&self.inner);
        scope.on(EventKind::VisibilityVisible, move |_| {
            if let Some(inner) = weak.upgrade() {
                let mut state = inner.state.borrow_mut();
                if state.is_running && state.is_paused {
                    state.last_timestamp = inner.clock.now();
                    log::info!("Page visible; loop stays paused until resumed");
                }
            }
        });

        *self.inner.wiring.borrow_mut() = Some(scope);
    }

    pub fn on_update(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        self.add(Phase::Update, infallible(callback))
    }

    pub fn on_fixed_update(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        self.add(Phase::FixedUpdate, infallible(callback))
    }

    pub fn on_render(&self, callback: impl FnMut(f64) + 'static) -> Unsubscribe {
        self.add(Phase::Render, infallible(callback))
    }

    /// Fallible update callback; an `Err` is logged and the frame goes on
    pub fn try_on_update(
        &self,
        callback: impl FnMut(f64) -> CallbackResult + 'static,
    ) -> Unsubscribe {
        self.add(Phase::Update, Box::new(callback))
    }

    pub fn try_on_fixed_update(
        &self,
        callback: impl FnMut(f64) -> CallbackResult + 'static,
    ) -> Unsubscribe {
        self.add(Phase::FixedUpdate, Box::new(callback))
    }

    pub fn try_on_render(
        &self,
        callback: impl FnMut(f64) -> CallbackResult + 'static,
    ) -> Unsubscribe {
        self.add(Phase::Render, Box::new(callback))
    }

    fn add(&self, phase: Phase, callback: PhaseCallback) -> Unsubscribe {
        register(&self.inner.callbacks, phase, callback)
    }

    pub fn callback_count(&self, phase: Phase) -> usize {
        self.inner.callbacks.borrow().len(phase)
    }

    /// Stopped -> running. Counters, accumulator and FPS start from zero.
    pub fn start(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.is_running {
                return;
            }
            state.is_running = true;
            state.is_paused = false;
            state.last_timestamp = self.inner.clock.now();
            state.elapsed_time = 0.0;
            state.frame_count = 0;
            state.accumulator = 0.0;
            state.fps.reset();
        }
        self.schedule_next();
        log::info!("Frame loop started");
        self.inner.bus.emit(Event::LoopStart);
    }

    pub fn stop(&self) {
        let pending = {
            let mut state = self.inner.state.borrow_mut();
            if !state.is_running {
                return;
            }
            state.is_running = false;
            state.is_paused = false;
            state.pending_frame.take()
        };
        if let Some(handle) = pending {
            self.inner.scheduler.cancel_frame(handle);
        }
        log::info!("Frame loop stopped");
        self.inner.bus.emit(Event::LoopStop);
    }

    pub fn pause(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.is_running || state.is_paused {
                return;
            }
            state.is_paused = true;
        }
        log::info!("Frame loop paused");
        self.inner.bus.emit(Event::LoopPause);
    }

    /// Continue from now; time spent paused is discarded, not replayed
    pub fn resume(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.is_running || !state.is_paused {
                return;
            }
            state.is_paused = false;
            state.last_timestamp = self.inner.clock.now();
            state.accumulator = 0.0;
        }
        log::info!("Frame loop resumed");
        self.inner.bus.emit(Event::LoopResume);
    }

    pub fn toggle_pause(&self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Stop and release every callback and bus subscription
    pub fn destroy(&self) {
        self.stop();
        self.inner.callbacks.borrow_mut().clear();
        let wiring = self.inner.wiring.borrow_mut().take();
        if let Some(scope) = wiring {
            scope.destroy();
        }
    }

    fn schedule_next(&self) {
        let weak = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.request_frame(Box::new(move |timestamp: f64| {
            if let Some(inner) = weak.upgrade() {
                FrameLoop { inner }.frame(timestamp);
            }
        }));
        self.inner.state.borrow_mut().pending_frame = Some(handle);
    }

    /// One animation frame at host time `now` (ms)
    fn frame(&self, now: f64) {
        if !self.inner.state.borrow().is_running {
            return;
        }
        self.schedule_next();

        let config = &self.inner.config;
        let delta = {
            let mut state = self.inner.state.borrow_mut();
            if state.is_paused {
                state.last_timestamp = now;
                return;
            }

            let mut delta = now - state.last_timestamp;
            if !delta.is_finite() || delta < 0.0 {
                log::debug!("Non-monotonic frame timestamp ({} -> {})", state.last_timestamp, now);
                delta = 0.0;
            }
            if let Some(min_interval) = config.min_frame_interval() {
                if delta < min_interval {
                    return;
                }
            }
            state.last_timestamp = now;

            if delta > config.max_delta_time {
                log::warn!(
                    "Frame delta {:.1}ms clamped to {:.1}ms",
                    delta,
                    config.max_delta_time
                );
                delta = config.max_delta_time;
            }

            state.elapsed_time += delta;
            state.frame_count += 1;
            state.accumulator += delta;
            state.fps.record(delta, now);
            delta
        };

        let step = config.fixed_timestep;
        loop {
            {
                let mut state = self.inner.state.borrow_mut();
                if !state.is_running || state.is_paused || state.accumulator < step {
                    break;
                }
                state.accumulator -= step;
            }
            invoke(&self.inner.callbacks, Phase::FixedUpdate, step);
        }

        if !self.is_active() {
            return;
        }
        invoke(&self.inner.callbacks, Phase::Update, delta);

        if !self.is_active() {
            return;
        }
        invoke(&self.inner.callbacks, Phase::Render, self.alpha());
    }

    fn is_active(&self) -> bool {
        let state = self.inner.state.borrow();
        state.is_running && !state.is_paused
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().is_running
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state.borrow().is_paused
    }

    /// Frames processed since the last start
    pub fn frame_count(&self) -> u64 {
        self.inner.state.borrow().frame_count
    }

    /// Sum of clamped deltas since the last start (ms)
    pub fn elapsed_time(&self) -> f64 {
        self.inner.state.borrow().elapsed_time
    }

    /// Simulation time not yet consumed by fixed steps (ms)
    pub fn accumulator(&self) -> f64 {
        self.inner.state.borrow().accumulator
    }

    /// Fraction of a fixed step carried in the accumulator (0..1)
    pub fn alpha(&self) -> f64 {
        self.accumulator() / self.inner.config.fixed_timestep
    }

    pub fn fps(&self) -> f64 {
        self.inner.state.borrow().fps.fps()
    }

    pub fn fps_history(&self) -> Vec<f64> {
        self.inner.state.borrow().fps.history()
    }

    pub fn config(&self) -> &LoopConfig {
        &self.inner.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use proptest::prelude::*;

    use super::*;
    use crate::platform::{ManualClock, ManualScheduler, VisibilityTracker};

    struct Harness {
        frame_loop: FrameLoop,
        bus: EventBus,
        clock: ManualClock,
        scheduler: ManualScheduler,
    }

    impl Harness {
        fn new(config: LoopConfig) -> Self {
            let clock = ManualClock::new(0.0);
            let scheduler = ManualScheduler::new();
            let bus = EventBus::new(Rc::new(clock.clone()));
            let frame_loop = FrameLoop::new(
                config,
                bus.clone(),
                Rc::new(clock.clone()),
                Rc::new(scheduler.clone()),
            )
            .unwrap();
            Self {
                frame_loop,
                bus,
                clock,
                scheduler,
            }
        }

        /// Move the clock and fire the pending frame at that time
        fn frame_at(&self, t: f64) {
            self.clock.set(t);
            self.scheduler.fire(t);
        }

        fn events(&self) -> Vec<Event> {
            self.bus.history().into_iter().map(|h| h.event).collect()
        }
    }

    fn counter(frame_loop: &FrameLoop, phase: Phase) -> Rc<RefCell<Vec<f64>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let record = move |dt: f64| s.borrow_mut().push(dt);
        match phase {
            Phase::FixedUpdate => frame_loop.on_fixed_update(record),
            Phase::Update => frame_loop.on_update(record),
            Phase::Render => frame_loop.on_render(record),
        };
        seen
    }

    #[test]
    fn test_fixed_step_carries_remainder() {
        let h = Harness::new(LoopConfig {
            fixed_timestep: 16.67,
            ..Default::default()
        });
        let fixed = counter(&h.frame_loop, Phase::FixedUpdate);
        let update = counter(&h.frame_loop, Phase::Update);

        h.frame_loop.start();
        for t in [10.0, 20.0, 30.0] {
            h.frame_at(t);
        }

        assert_eq!(*fixed.borrow(), vec![16.67]);
        assert_eq!(*update.borrow(), vec![10.0, 10.0, 10.0]);
        assert!((h.frame_loop.accumulator() - 13.33).abs() < 1e-9);
        assert_eq!(h.frame_loop.frame_count(), 3);
        assert_eq!(h.frame_loop.elapsed_time(), 30.0);
    }

    #[test]
    fn test_phase_order_within_frame() {
        let h = Harness::new(LoopConfig {
            fixed_timestep: 10.0,
            ..Default::default()
        });
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = order.clone();
        h.frame_loop.on_render(move |_| o.borrow_mut().push("render"));
        let o = order.clone();
        h.frame_loop.on_update(move |_| o.borrow_mut().push("update"));
        let o = order.clone();
        h.frame_loop.on_fixed_update(move |_| o.borrow_mut().push("fixed"));

        h.frame_loop.start();
        h.frame_at(25.0);
        assert_eq!(*order.borrow(), vec!["fixed", "fixed", "update", "render"]);
    }

    #[test]
    fn test_render_receives_alpha() {
        let h = Harness::new(LoopConfig {
            fixed_timestep: 20.0,
            ..Default::default()
        });
        let render = counter(&h.frame_loop, Phase::Render);
        h.frame_loop.start();
        h.frame_at(30.0);
        assert_eq!(*render.borrow(), vec![0.5]);
    }

    #[test]
    fn test_long_stall_is_clamped() {
        let h = Harness::new(LoopConfig {
            fixed_timestep: 30.0,
            ..Default::default()
        });
        let update = counter(&h.frame_loop, Phase::Update);
        let fixed = counter(&h.frame_loop, Phase::FixedUpdate);
        h.frame_loop.start();
        h.frame_at(5000.0);
        assert_eq!(*update.borrow(), vec![100.0]);
        assert_eq!(fixed.borrow().len(), 3);
        assert_eq!(h.frame_loop.accumulator(), 10.0);
        assert_eq!(h.frame_loop.elapsed_time(), 100.0);
    }

    #[test]
    fn test_reschedules_every_frame() {
        let h = Harness::new(LoopConfig::default());
        h.frame_loop.start();
        assert_eq!(h.scheduler.pending_count(), 1);
        h.frame_at(16.0);
        assert_eq!(h.scheduler.pending_count(), 1);
    }

    #[test]
    fn test_paused_frames_do_nothing_and_resume_has_no_spike() {
        let h = Harness::new(LoopConfig::default());
        let update = counter(&h.frame_loop, Phase::Update);
        let fixed = counter(&h.frame_loop, Phase::FixedUpdate);
        h.frame_loop.start();
        h.frame_at(10.0);

        h.frame_loop.pause();
        h.frame_at(40.0);
        h.frame_at(70.0);
        assert_eq!(update.borrow().len(), 1);
        assert_eq!(h.frame_loop.accumulator(), 10.0);

        h.clock.set(2000.0);
        h.frame_loop.resume();
        assert_eq!(h.frame_loop.accumulator(), 0.0);
        h.frame_at(2008.0);
        assert_eq!(update.borrow().last(), Some(&8.0));
        assert!(fixed.borrow().is_empty());
    }

    #[test]
    fn test_pause_and_resume_are_idempotent() {
        let h = Harness::new(LoopConfig::default());
        h.frame_loop.start();
        h.frame_loop.pause();
        h.frame_loop.pause();
        assert!(h.frame_loop.is_paused());
        h.frame_loop.resume();
        h.frame_loop.resume();
        assert!(!h.frame_loop.is_paused());
        h.frame_loop.stop();
        h.frame_loop.stop();
        h.frame_loop.pause();
        assert!(!h.frame_loop.is_paused());

        assert_eq!(
            h.events(),
            vec![
                Event::LoopStart,
                Event::LoopPause,
                Event::LoopResume,
                Event::LoopStop
            ]
        );
    }

    #[test]
    fn test_toggle_pause() {
        let h = Harness::new(LoopConfig::default());
        h.frame_loop.start();
        h.frame_loop.toggle_pause();
        assert!(h.frame_loop.is_paused());
        h.frame_loop.toggle_pause();
        assert!(!h.frame_loop.is_paused());
    }

    #[test]
    fn test_stop_cancels_pending_frame() {
        let h = Harness::new(LoopConfig::default());
        let update = counter(&h.frame_loop, Phase::Update);
        h.frame_loop.start();
        h.frame_loop.stop();
        assert_eq!(h.scheduler.pending_count(), 0);
        h.frame_at(16.0);
        assert!(update.borrow().is_empty());
    }

    #[test]
    fn test_stop_from_update_skips_render_and_next_frame() {
        let h = Harness::new(LoopConfig::default());
        let handle = h.frame_loop.clone();
        h.frame_loop.on_update(move |_| handle.stop());
        let render = counter(&h.frame_loop, Phase::Render);

        h.frame_loop.start();
        h.frame_at(16.0);
        assert!(!h.frame_loop.is_running());
        assert!(render.borrow().is_empty());
        assert_eq!(h.scheduler.pending_count(), 0);
    }

    #[test]
    fn test_stale_frame_after_stop_is_noop() {
        // A scheduler that cannot cancel delivers the frame anyway
        struct NoCancel(ManualScheduler);
        impl FrameScheduler for NoCancel {
            fn request_frame(&self, callback: crate::platform::FrameCallback) -> FrameHandle {
                self.0.request_frame(callback)
            }
            fn cancel_frame(&self, _handle: FrameHandle) {}
        }

        let clock = ManualClock::new(0.0);
        let scheduler = ManualScheduler::new();
        let frame_loop = FrameLoop::new(
            LoopConfig::default(),
            EventBus::new(Rc::new(clock.clone())),
            Rc::new(clock.clone()),
            Rc::new(NoCancel(scheduler.clone())),
        )
        .unwrap();
        let update = counter(&frame_loop, Phase::Update);
        frame_loop.start();
        frame_loop.stop();
        assert_eq!(scheduler.fire(16.0), 1);
        assert!(update.borrow().is_empty());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_restart_resets_counters() {
        let h = Harness::new(LoopConfig::default());
        h.frame_loop.start();
        h.frame_at(10.0);
        h.frame_at(30.0);
        h.frame_loop.stop();
        assert_eq!(h.frame_loop.frame_count(), 2);

        h.clock.set(1000.0);
        h.frame_loop.start();
        assert_eq!(h.frame_loop.frame_count(), 0);
        assert_eq!(h.frame_loop.elapsed_time(), 0.0);
        assert_eq!(h.frame_loop.accumulator(), 0.0);
        h.frame_at(1010.0);
        assert_eq!(h.frame_loop.elapsed_time(), 10.0);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let h = Harness::new(LoopConfig::default());
        h.frame_loop.start();
        h.frame_loop.start();
        assert_eq!(h.scheduler.pending_count(), 1);
        assert_eq!(h.events(), vec![Event::LoopStart]);
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let h = Harness::new(LoopConfig {
            fixed_timestep: 10.0,
            ..Default::default()
        });
        h.frame_loop.on_fixed_update(|_| panic!("physics blew up"));
        let fixed = counter(&h.frame_loop, Phase::FixedUpdate);
        h.frame_loop.on_render(|_| panic!("draw failed"));
        let render = counter(&h.frame_loop, Phase::Render);

        h.frame_loop.start();
        h.frame_at(20.0);
        h.frame_at(30.0);
        assert_eq!(fixed.borrow().len(), 3);
        assert_eq!(render.borrow().len(), 2);
        assert!(h.frame_loop.is_running());
    }

    #[test]
    fn test_erroring_callbacks_keep_the_loop_alive() {
        let h = Harness::new(LoopConfig {
            fixed_timestep: 10.0,
            ..Default::default()
        });
        let failures = Rc::new(Cell::new(0));
        let f = failures.clone();
        h.frame_loop.try_on_render(move |_| {
            f.set(f.get() + 1);
            Err("canvas context lost".into())
        });
        h.frame_loop
            .try_on_fixed_update(|_| Err("body out of sync".into()));
        let fixed = counter(&h.frame_loop, Phase::FixedUpdate);
        let update = counter(&h.frame_loop, Phase::Update);

        h.frame_loop.start();
        h.frame_at(20.0);
        h.frame_at(30.0);
        assert_eq!(failures.get(), 2);
        assert_eq!(fixed.borrow().len(), 3);
        assert_eq!(*update.borrow(), vec![20.0, 10.0]);
        assert!(h.frame_loop.is_running());
        assert_eq!(h.scheduler.pending_count(), 1);
    }

    #[test]
    fn test_try_on_update_receives_delta() {
        let h = Harness::new(LoopConfig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        h.frame_loop.try_on_update(move |dt| {
            s.borrow_mut().push(dt);
            Ok(())
        });
        h.frame_loop.start();
        h.frame_at(12.0);
        assert_eq!(*seen.borrow(), vec![12.0]);
    }

    #[test]
    fn test_unsubscribed_callback_stops_running() {
        let h = Harness::new(LoopConfig::default());
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let handle = h.frame_loop.on_update(move |_| c.set(c.get() + 1));
        h.frame_loop.start();
        h.frame_at(10.0);
        assert!(handle.unsubscribe());
        h.frame_at(20.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_target_fps_skips_early_frames() {
        let h = Harness::new(LoopConfig {
            target_fps: 30,
            ..Default::default()
        });
        let update = counter(&h.frame_loop, Phase::Update);
        h.frame_loop.start();
        h.frame_at(16.0);
        assert!(update.borrow().is_empty());
        h.frame_at(34.0);
        assert_eq!(*update.borrow(), vec![34.0]);
        assert_eq!(h.frame_loop.frame_count(), 1);
    }

    #[test]
    fn test_fps_estimate_refreshes() {
        let h = Harness::new(LoopConfig {
            fps_refresh_interval: 100.0,
            ..Default::default()
        });
        h.frame_loop.start();
        let mut t = 0.0;
        for _ in 0..20 {
            t += 20.0;
            h.frame_at(t);
        }
        assert!((h.frame_loop.fps() - 50.0).abs() < 1e-9);
        assert_eq!(h.frame_loop.fps_history().len(), 20);
    }

    #[test]
    fn test_auto_pause_waits_for_explicit_resume() {
        let h = Harness::new(LoopConfig::default());
        let tracker = VisibilityTracker::new(h.bus.clone(), Rc::new(h.clock.clone()));
        let update = counter(&h.frame_loop, Phase::Update);
        h.frame_loop.start();
        h.frame_at(16.0);

        tracker.set_page_visible(false);
        assert!(h.frame_loop.is_paused());
        h.frame_at(5000.0);
        h.clock.set(9000.0);
        tracker.set_page_visible(true);
        assert!(h.frame_loop.is_paused());

        h.clock.set(9500.0);
        h.bus.emit(Event::ResumeRequest);
        assert!(!h.frame_loop.is_paused());
        h.frame_at(9510.0);
        assert_eq!(*update.borrow(), vec![16.0, 10.0]);
    }

    #[test]
    fn test_auto_pause_disabled() {
        let h = Harness::new(LoopConfig {
            auto_pause_on_hidden: false,
            ..Default::default()
        });
        h.frame_loop.start();
        h.bus.emit(Event::PauseRequest);
        assert!(!h.frame_loop.is_paused());
        assert!(!h.bus.has_listeners(&EventKind::PauseRequest));
    }

    #[test]
    fn test_destroy_releases_everything() {
        let h = Harness::new(LoopConfig::default());
        h.frame_loop.on_update(|_| {});
        h.frame_loop.on_render(|_| {});
        assert!(h.bus.has_listeners(&EventKind::PauseRequest));

        h.frame_loop.start();
        h.frame_loop.destroy();
        assert!(!h.frame_loop.is_running());
        assert_eq!(h.frame_loop.callback_count(Phase::Update), 0);
        assert_eq!(h.frame_loop.callback_count(Phase::Render), 0);
        assert!(!h.bus.has_listeners(&EventKind::PauseRequest));
        assert!(!h.bus.has_listeners(&EventKind::VisibilityVisible));
    }

    #[test]
    fn test_dropped_loop_ignores_scheduled_frame() {
        let h = Harness::new(LoopConfig::default());
        h.frame_loop.start();
        let Harness {
            frame_loop,
            scheduler,
            ..
        } = h;
        drop(frame_loop);
        assert_eq!(scheduler.fire(16.0), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let clock = ManualClock::new(0.0);
        let result = FrameLoop::new(
            LoopConfig {
                fixed_timestep: -1.0,
                ..Default::default()
            },
            EventBus::new(Rc::new(clock.clone())),
            Rc::new(clock),
            Rc::new(ManualScheduler::new()),
        );
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn prop_delta_never_exceeds_max(deltas in prop::collection::vec(0.0f64..1000.0, 1..30)) {
            let h = Harness::new(LoopConfig::default());
            let update = counter(&h.frame_loop, Phase::Update);
            h.frame_loop.start();
            let mut t = 0.0;
            for d in &deltas {
                t += d;
                h.frame_at(t);
            }
            let seen = update.borrow();
            prop_assert_eq!(seen.len(), deltas.len());
            for (passed, raw) in seen.iter().zip(&deltas) {
                prop_assert!(*passed <= 100.0);
                if *raw > 100.5 {
                    prop_assert_eq!(*passed, 100.0);
                }
            }
        }

        #[test]
        fn prop_accumulator_conserves_time(deltas in prop::collection::vec(0u32..=100, 1..50)) {
            let h = Harness::new(LoopConfig {
                fixed_timestep: 16.0,
                ..Default::default()
            });
            let fixed = counter(&h.frame_loop, Phase::FixedUpdate);
            h.frame_loop.start();
            let mut t = 0.0;
            for d in &deltas {
                t += *d as f64;
                h.frame_at(t);
            }
            let total: u32 = deltas.iter().sum();
            prop_assert_eq!(fixed.borrow().len() as u32, total / 16);
            prop_assert_eq!(h.frame_loop.accumulator(), (total % 16) as f64);
            prop_assert!(h.frame_loop.accumulator() >= 0.0);
        }
    }
}
