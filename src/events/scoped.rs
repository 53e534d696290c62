//! Session-scoped view of the bus
//!
//! Games subscribe through a [`ScopedBus`] and call [`ScopedBus::destroy`]
//! (or drop it) when the session ends, so no listener outlives its game.

use std::cell::RefCell;

use super::bus::{EventBus, ListenerId, Subscription};
use super::event::{Event, EventKind};
use crate::isolate::CallbackResult;

pub struct ScopedBus {
    bus: EventBus,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl ScopedBus {
    pub(crate) fn new(bus: EventBus) -> Self {
        Self {
            bus,
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    pub fn on(&self, kind: EventKind, callback: impl FnMut(&Event) + 'static) -> ListenerId {
        self.track(self.bus.on(kind, callback))
    }

    pub fn once(&self, kind: EventKind, callback: impl FnMut(&Event) + 'static) -> ListenerId {
        self.track(self.bus.once(kind, callback))
    }

    pub fn try_on(
        &self,
        kind: EventKind,
        callback: impl FnMut(&Event) -> CallbackResult + 'static,
    ) -> ListenerId {
        self.track(self.bus.try_on(kind, callback))
    }

    pub fn try_once(
        &self,
        kind: EventKind,
        callback: impl FnMut(&Event) -> CallbackResult + 'static,
    ) -> ListenerId {
        self.track(self.bus.try_once(kind, callback))
    }

    fn track(&self, sub: Subscription) -> ListenerId {
        let id = sub.id();
        self.subscriptions.borrow_mut().push(sub);
        id
    }

    /// Remove one listener registered through this scope. Returns false if
    /// the id is not from this scope or the listener was already removed.
    pub fn off(&self, id: ListenerId) -> bool {
        let sub = {
            let mut subs = self.subscriptions.borrow_mut();
            match subs.iter().position(|s| s.id() == id) {
                Some(pos) => subs.remove(pos),
                None => return false,
            }
        };
        sub.unsubscribe()
    }

    pub fn emit(&self, event: Event) {
        self.bus.emit(event);
    }

    /// The underlying shared bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Registrations made through this scope (including spent `once` ones)
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Unsubscribe everything registered through this scope
    pub fn destroy(&self) {
        let subs = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for sub in &subs {
            sub.unsubscribe();
        }
    }
}

impl Drop for ScopedBus {
    fn drop(&mut self) {
        self.destroy();
    }
}
