//! Page visibility tracking
//!
//! Turns the host's foreground/background signals (document visibility, with
//! window focus/blur as a fallback) into edge-triggered bus events:
//! - `VisibilityHidden`, followed by `PauseRequest` when auto-pause is on
//! - `VisibilityVisible { hidden_duration }`
//!
//! Becoming visible never resumes anything by itself. The tracker only reports
//! that the page is back; the game decides when play continues.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use super::clock::Clock;
use crate::events::{Event, EventBus};

/// Snapshot of the tracker's bookkeeping (times in ms)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisibilityState {
    pub is_visible: bool,
    pub last_visible_time: f64,
    pub last_hidden_time: Option<f64>,
    pub total_hidden_time: f64,
    pub auto_pause_enabled: bool,
}

#[derive(Debug)]
struct Signals {
    page_hidden: bool,
    focused: bool,
}

impl Signals {
    fn visible(&self) -> bool {
        !self.page_hidden && self.focused
    }
}

struct TrackerInner {
    state: RefCell<VisibilityState>,
    signals: RefCell<Signals>,
    bus: EventBus,
    clock: Rc<dyn Clock>,
    #[cfg(target_arch = "wasm32")]
    dom: RefCell<Option<dom::PageListeners>>,
}

thread_local! {
    static SHARED: RefCell<Option<VisibilityTracker>> = const { RefCell::new(None) };
}

/// Handle to a visibility tracker; clones share state
#[derive(Clone)]
pub struct VisibilityTracker {
    inner: Rc<TrackerInner>,
}

impl VisibilityTracker {
    /// Standalone tracker, initially visible with auto-pause enabled
    pub fn new(bus: EventBus, clock: Rc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            inner: Rc::new(TrackerInner {
                state: RefCell::new(VisibilityState {
                    is_visible: true,
                    last_visible_time: now,
                    last_hidden_time: None,
                    total_hidden_time: 0.0,
                    auto_pause_enabled: true,
                }),
                signals: RefCell::new(Signals {
                    page_hidden: false,
                    focused: true,
                }),
                bus,
                clock,
                #[cfg(target_arch = "wasm32")]
                dom: RefCell::new(None),
            }),
        }
    }

    /// The page's tracker, created on first call
    ///
    /// Later calls return the same instance (their arguments are ignored)
    /// until [`VisibilityTracker::destroy`] is called on it.
    pub fn shared(bus: EventBus, clock: Rc<dyn Clock>) -> Self {
        SHARED.with(|slot| {
            let mut slot = slot.borrow_mut();
            if let Some(tracker) = slot.as_ref() {
                if !tracker.inner.bus.ptr_eq(&bus) {
                    log::warn!("Visibility tracker already bound to another event bus");
                }
                return tracker.clone();
            }
            let tracker = Self::new(bus, clock);
            *slot = Some(tracker.clone());
            log::info!("Visibility tracker created");
            tracker
        })
    }

    /// The shared tracker, if one exists
    pub fn current() -> Option<Self> {
        SHARED.with(|slot| slot.borrow().clone())
    }

    pub fn ptr_eq(&self, other: &VisibilityTracker) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn state(&self) -> VisibilityState {
        *self.inner.state.borrow()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.state.borrow().is_visible
    }

    pub fn auto_pause_enabled(&self) -> bool {
        self.inner.state.borrow().auto_pause_enabled
    }

    pub fn set_auto_pause(&self, enabled: bool) {
        self.inner.state.borrow_mut().auto_pause_enabled = enabled;
    }

    /// Time spent hidden in the current hidden stretch (0 while visible)
    pub fn hidden_duration(&self) -> f64 {
        let state = self.inner.state.borrow();
        match (state.is_visible, state.last_hidden_time) {
            (false, Some(since)) => (self.inner.clock.now() - since).max(0.0),
            _ => 0.0,
        }
    }

    /// Accumulated time of all completed hidden stretches
    pub fn total_hidden_time(&self) -> f64 {
        self.inner.state.borrow().total_hidden_time
    }

    /// Feed the page visibility signal (document.hidden inverted)
    pub fn set_page_visible(&self, visible: bool) {
        self.inner.signals.borrow_mut().page_hidden = !visible;
        self.sync();
    }

    /// Feed the window focus signal
    ///
    /// Losing focus counts as hidden. Regaining focus only counts as visible
    /// if the page itself is not hidden.
    pub fn set_focused(&self, focused: bool) {
        self.inner.signals.borrow_mut().focused = focused;
        self.sync();
    }

    fn sync(&self) {
        let visible = self.inner.signals.borrow().visible();
        let was_visible = self.inner.state.borrow().is_visible;
        if visible == was_visible {
            return;
        }
        if visible {
            self.became_visible();
        } else {
            self.became_hidden();
        }
    }

    fn became_hidden(&self) {
        let now = self.inner.clock.now();
        let auto_pause = {
            let mut state = self.inner.state.borrow_mut();
            state.is_visible = false;
            state.last_hidden_time = Some(now);
            state.auto_pause_enabled
        };

        log::info!("Page hidden");
        self.inner.bus.emit(Event::VisibilityHidden);
        if auto_pause {
            self.inner.bus.emit(Event::PauseRequest);
        }
    }

    fn became_visible(&self) {
        let now = self.inner.clock.now();
        let hidden_duration = {
            let mut state = self.inner.state.borrow_mut();
            let hidden_for = state
                .last_hidden_time
                .map_or(0.0, |since| (now - since).max(0.0));
            state.is_visible = true;
            state.last_visible_time = now;
            state.total_hidden_time += hidden_for;
            hidden_for
        };

        log::info!("Page visible again after {:.0}ms", hidden_duration);
        self.inner
            .bus
            .emit(Event::VisibilityVisible { hidden_duration });
    }

    /// Listen to `visibilitychange`, `blur` and `focus` on the current page
    #[cfg(target_arch = "wasm32")]
    pub fn attach_to_page(&self) {
        if self.inner.dom.borrow().is_some() {
            return;
        }
        match dom::PageListeners::attach(Rc::downgrade(&self.inner)) {
            Some((listeners, page_visible)) => {
                *self.inner.dom.borrow_mut() = Some(listeners);
                self.set_page_visible(page_visible);
                log::info!("Visibility tracker attached to page");
            }
            None => log::warn!("No document available; visibility tracking disabled"),
        }
    }

    /// Stop listening to the page; state is kept
    #[cfg(target_arch = "wasm32")]
    pub fn detach_from_page(&self) {
        let listeners = self.inner.dom.borrow_mut().take();
        if let Some(listeners) = listeners {
            listeners.detach();
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn detach_from_page(&self) {}

    /// Detach from the page and release the shared slot if this is the
    /// shared tracker
    pub fn destroy(&self) {
        self.detach_from_page();

        SHARED.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|t| t.ptr_eq(self)) {
                *slot = None;
                log::info!("Visibility tracker destroyed");
            }
        });
    }
}

#[cfg(target_arch = "wasm32")]
mod dom {
    use std::rc::Weak;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::closure::Closure;
    use web_sys::{Document, FocusEvent, Window};

    use super::{TrackerInner, VisibilityTracker};

    pub(super) struct PageListeners {
        window: Window,
        document: Document,
        visibility: Closure<dyn FnMut(web_sys::Event)>,
        blur: Closure<dyn FnMut(FocusEvent)>,
        focus: Closure<dyn FnMut(FocusEvent)>,
    }

    fn with_tracker(weak: &Weak<TrackerInner>, f: impl FnOnce(VisibilityTracker)) {
        if let Some(inner) = weak.upgrade() {
            f(VisibilityTracker { inner });
        }
    }

    impl PageListeners {
        /// Returns the listeners and the page's current visibility
        pub(super) fn attach(weak: Weak<TrackerInner>) -> Option<(Self, bool)> {
            let window = web_sys::window()?;
            let document = window.document()?;

            let visibility = {
                let weak = weak.clone();
                let document = document.clone();
                Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                    let visible = document.visibility_state() != web_sys::VisibilityState::Hidden;
                    with_tracker(&weak, |t| t.set_page_visible(visible));
                })
            };
            let blur = {
                let weak = weak.clone();
                Closure::<dyn FnMut(_)>::new(move |_event: FocusEvent| {
                    with_tracker(&weak, |t| t.set_focused(false));
                })
            };
            let focus = Closure::<dyn FnMut(_)>::new(move |_event: FocusEvent| {
                with_tracker(&weak, |t| t.set_focused(true));
            });

            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                visibility.as_ref().unchecked_ref(),
            );
            let _ = window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref());
            let _ =
                window.add_event_listener_with_callback("focus", focus.as_ref().unchecked_ref());

            let page_visible = !document.hidden();
            Some((
                Self {
                    window,
                    document,
                    visibility,
                    blur,
                    focus,
                },
                page_visible,
            ))
        }

        pub(super) fn detach(self) {
            let _ = self.document.remove_event_listener_with_callback(
                "visibilitychange",
                self.visibility.as_ref().unchecked_ref(),
            );
            let _ = self
                .window
                .remove_event_listener_with_callback("blur", self.blur.as_ref().unchecked_ref());
            let _ = self
                .window
                .remove_event_listener_with_callback("focus", self.focus.as_ref().unchecked_ref());
        }
    }
}
