//! Per-frame callback scheduling
//!
//! In the browser this is requestAnimationFrame; headless runs and tests use
//! [`ManualScheduler`] and fire frames at chosen timestamps.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Callback invoked with the frame timestamp (ms)
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Opaque id of a scheduled frame, used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u32);

/// Host hook that runs one callback on the next display refresh
pub trait FrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Resources held for scheduled frames until they fire or are cancelled
///
/// A slot is marked fired once its callback has returned, and fired slots
/// are released on the next insert. A slot is never released while its own
/// callback is still running.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) struct FrameSlots<T> {
    slots: Vec<(FrameHandle, Rc<Cell<bool>>, T)>,
}

impl<T> Default for FrameSlots<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
impl<T> FrameSlots<T> {
    /// Release fired slots, then hold `resource` for `handle`. `fired` must
    /// be set after the frame's callback returns.
    pub(crate) fn insert(&mut self, handle: FrameHandle, fired: Rc<Cell<bool>>, resource: T) {
        self.slots.retain(|(_, fired, _)| !fired.get());
        self.slots.push((handle, fired, resource));
    }

    /// Release the slot of a cancelled frame
    pub(crate) fn cancel(&mut self, handle: FrameHandle) -> Option<T> {
        let pos = self.slots.iter().position(|(h, _, _)| *h == handle)?;
        Some(self.slots.remove(pos).2)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// requestAnimationFrame / cancelAnimationFrame
///
/// The JS closure of every pending frame is owned here, so a cancelled frame
/// frees its callback instead of leaking it.
#[cfg(target_arch = "wasm32")]
#[derive(Default, Clone)]
pub struct AnimationFrameScheduler {
    pending: Rc<RefCell<FrameSlots<wasm_bindgen::closure::Closure<dyn FnMut(f64)>>>>,
}

#[cfg(target_arch = "wasm32")]
impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        use wasm_bindgen::JsCast;
        use wasm_bindgen::closure::Closure;

        let Some(window) = web_sys::window() else {
            log::error!("No window available for requestAnimationFrame");
            return FrameHandle(0);
        };
        let fired = Rc::new(Cell::new(false));
        let done = fired.clone();
        let closure = Closure::once(move |time: f64| {
            callback(time);
            done.set(true);
        });
        let id = match window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            Ok(id) => id,
            Err(e) => {
                log::error!("requestAnimationFrame failed: {:?}", e);
                return FrameHandle(0);
            }
        };
        let handle = FrameHandle(id as u32);
        self.pending.borrow_mut().insert(handle, fired, closure);
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle.0 as i32);
        }
        let released = self.pending.borrow_mut().cancel(handle);
        drop(released);
    }
}

/// Frames that only run when [`ManualScheduler::fire`] is called
///
/// Clones share the same queue.
#[derive(Default, Clone)]
pub struct ManualScheduler {
    pending: Rc<RefCell<Vec<(FrameHandle, FrameCallback)>>>,
    next_id: Rc<Cell<u32>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback pending at call time with `timestamp`.
    /// Callbacks scheduled while firing wait for the next call.
    /// Returns how many callbacks ran.
    pub fn fire(&self, timestamp: f64) -> usize {
        let due = std::mem::take(&mut *self.pending.borrow_mut());
        let count = due.len();
        for (_, callback) in due {
            callback(timestamp);
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);
        let handle = FrameHandle(id);
        self.pending.borrow_mut().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.pending.borrow_mut().retain(|(h, _)| *h != handle);
    }
}
