//! Synchronous publish/subscribe bus
//!
//! Listeners run in registration order, at most once per emission. Dispatch
//! iterates a snapshot of the listener list taken before the first call, so
//! listeners may subscribe or unsubscribe (themselves included) freely.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use super::event::{Event, EventKind};
use super::scoped::ScopedBus;
use crate::config::BusConfig;
use crate::consts::EVENT_HISTORY_CAPACITY;
use crate::isolate::{CallbackResult, run_isolated};
use crate::platform::Clock;

/// Identifies one registration on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One emitted event kept for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub event: Event,
    /// Clock time of the emission (ms)
    pub timestamp: f64,
}

struct Listener {
    id: ListenerId,
    once: bool,
    /// Cleared on removal so an in-flight snapshot skips it
    active: Cell<bool>,
    callback: RefCell<Box<dyn FnMut(&Event) -> CallbackResult>>,
}

struct BusInner {
    listeners: HashMap<EventKind, Vec<Rc<Listener>>>,
    history: VecDeque<HistoryEntry>,
    history_capacity: usize,
    next_id: u64,
}

impl BusInner {
    fn remove(&mut self, kind: &EventKind, id: ListenerId) -> bool {
        self.take(kind, id).is_some()
    }

    /// Unregister a listener, returning where it sat in its list
    fn take(&mut self, kind: &EventKind, id: ListenerId) -> Option<usize> {
        let list = self.listeners.get_mut(kind)?;
        let pos = list.iter().position(|l| l.id == id)?;
        let listener = list.remove(pos);
        listener.active.set(false);
        if list.is_empty() {
            self.listeners.remove(kind);
        }
        Some(pos)
    }

    /// Put a taken listener back at its old position
    fn restore(&mut self, kind: &EventKind, pos: usize, listener: Rc<Listener>) {
        listener.active.set(true);
        let list = self.listeners.entry(kind.clone()).or_default();
        list.insert(pos.min(list.len()), listener);
    }
}

/// Shared handle to the bus; clones refer to the same registry
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
    clock: Rc<dyn Clock>,
}

impl EventBus {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self::with_config(
            &BusConfig {
                history_capacity: EVENT_HISTORY_CAPACITY,
            },
            clock,
        )
    }

    pub fn with_config(config: &BusConfig, clock: Rc<dyn Clock>) -> Self {
        let capacity = config.history_capacity.max(1);
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                listeners: HashMap::new(),
                history: VecDeque::with_capacity(capacity),
                history_capacity: capacity,
                next_id: 0,
            })),
            clock,
        }
    }

    /// Register a persistent listener
    pub fn on(&self, kind: EventKind, mut callback: impl FnMut(&Event) + 'static) -> Subscription {
        self.register(
            kind,
            false,
            Box::new(move |event: &Event| {
                callback(event);
                Ok(())
            }),
        )
    }

    /// Register a listener that removes itself after its first successful
    /// invocation
    pub fn once(&self, kind: EventKind, mut callback: impl FnMut(&Event) + 'static) -> Subscription {
        self.register(
            kind,
            true,
            Box::new(move |event: &Event| {
                callback(event);
                Ok(())
            }),
        )
    }

    /// Register a persistent listener that reports failure with `Err`
    pub fn try_on(
        &self,
        kind: EventKind,
        callback: impl FnMut(&Event) -> CallbackResult + 'static,
    ) -> Subscription {
        self.register(kind, false, Box::new(callback))
    }

    /// Fallible [`once`](Self::once): an `Err` keeps the listener registered
    pub fn try_once(
        &self,
        kind: EventKind,
        callback: impl FnMut(&Event) -> CallbackResult + 'static,
    ) -> Subscription {
        self.register(kind, true, Box::new(callback))
    }

    fn register(
        &self,
        kind: EventKind,
        once: bool,
        callback: Box<dyn FnMut(&Event) -> CallbackResult>,
    ) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = ListenerId(inner.next_id);
        inner
            .listeners
            .entry(kind.clone())
            .or_default()
            .push(Rc::new(Listener {
                id,
                once,
                active: Cell::new(true),
                callback: RefCell::new(callback),
            }));
        Subscription {
            bus: Rc::downgrade(&self.inner),
            kind,
            id,
        }
    }

    /// Remove one listener; no-op if it is not registered
    pub fn off(&self, kind: &EventKind, id: ListenerId) {
        self.inner.borrow_mut().remove(kind, id);
    }

    /// Record `event` in the history, then deliver it to a snapshot of the
    /// listeners for its kind
    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        let timestamp = self.clock.now();

        let snapshot: Vec<Rc<Listener>> = {
            let mut inner = self.inner.borrow_mut();
            if inner.history.len() >= inner.history_capacity {
                inner.history.pop_front();
            }
            inner.history.push_back(HistoryEntry {
                event: event.clone(),
                timestamp,
            });
            inner.listeners.get(&kind).cloned().unwrap_or_default()
        };

        log::debug!("emit '{}' to {} listener(s)", kind, snapshot.len());

        for listener in snapshot {
            if !listener.active.get() {
                continue;
            }
            let Ok(mut callback) = listener.callback.try_borrow_mut() else {
                log::warn!("Skipping re-entrant call of a '{}' listener", kind);
                continue;
            };

            // Unregister before the call so a nested emit cannot fire it again
            let taken = if listener.once {
                self.inner.borrow_mut().take(&kind, listener.id)
            } else {
                None
            };

            if let Err(msg) = run_isolated(|| (&mut **callback)(&event)) {
                log::error!("Listener for '{}' {}", kind, msg);
                if let Some(pos) = taken {
                    self.inner
                        .borrow_mut()
                        .restore(&kind, pos, listener.clone());
                }
            }
        }
    }

    /// Clear one kind's listeners, or every listener when `kind` is `None`
    pub fn remove_all_listeners(&self, kind: Option<&EventKind>) {
        let mut inner = self.inner.borrow_mut();
        let removed: Vec<Rc<Listener>> = match kind {
            Some(kind) => inner.listeners.remove(kind).unwrap_or_default(),
            None => inner.listeners.drain().flat_map(|(_, list)| list).collect(),
        };
        for listener in removed {
            listener.active.set(false);
        }
    }

    pub fn listener_count(&self, kind: &EventKind) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(kind)
            .map_or(0, |list| list.len())
    }

    pub fn has_listeners(&self, kind: &EventKind) -> bool {
        self.listener_count(kind) > 0
    }

    /// Oldest-first copy of the recent emissions
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.borrow().history.iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.inner.borrow_mut().history.clear();
    }

    /// A view that tracks its own subscriptions for bulk cleanup
    pub fn scoped(&self) -> ScopedBus {
        ScopedBus::new(self.clone())
    }

    pub fn ptr_eq(&self, other: &EventBus) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Handle to one registration
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<RefCell<BusInner>>,
    kind: EventKind,
    id: ListenerId,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Remove exactly this listener. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => inner.borrow_mut().remove(&self.kind, self.id),
            None => false,
        }
    }
}
