//! Phase callback registry
//!
//! Same dispatch rules as the event bus: insertion order, snapshot before
//! invoking, removed callbacks are skipped, failures are contained per callback.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::isolate::{CallbackResult, run_isolated};

/// Frame phase a callback belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Runs zero or more times per frame with the fixed timestep
    FixedUpdate,
    /// Runs once per frame with the clamped frame delta
    Update,
    /// Runs once per frame with the interpolation alpha
    Render,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::FixedUpdate => "fixed-update",
            Phase::Update => "update",
            Phase::Render => "render",
        })
    }
}

struct Entry {
    id: u64,
    active: Cell<bool>,
    callback: RefCell<PhaseCallback>,
}

/// Stored form of every phase callback
pub(crate) type PhaseCallback = Box<dyn FnMut(f64) -> CallbackResult>;

#[derive(Default)]
pub(crate) struct CallbackRegistry {
    fixed_update: Vec<Rc<Entry>>,
    update: Vec<Rc<Entry>>,
    render: Vec<Rc<Entry>>,
    next_id: u64,
}

impl CallbackRegistry {
    fn list(&self, phase: Phase) -> &Vec<Rc<Entry>> {
        match phase {
            Phase::FixedUpdate => &self.fixed_update,
            Phase::Update => &self.update,
            Phase::Render => &self.render,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut Vec<Rc<Entry>> {
        match phase {
            Phase::FixedUpdate => &mut self.fixed_update,
            Phase::Update => &mut self.update,
            Phase::Render => &mut self.render,
        }
    }

    fn remove(&mut self, phase: Phase, id: u64) -> bool {
        let list = self.list_mut(phase);
        match list.iter().position(|e| e.id == id) {
            Some(pos) => {
                list.remove(pos).active.set(false);
                true
            }
            None => false,
        }
    }

    pub(crate) fn len(&self, phase: Phase) -> usize {
        self.list(phase).len()
    }

    pub(crate) fn clear(&mut self) {
        for phase in [Phase::FixedUpdate, Phase::Update, Phase::Render] {
            for entry in self.list_mut(phase).drain(..) {
                entry.active.set(false);
            }
        }
    }
}

/// Register `callback` in `phase`
pub(crate) fn register(
    registry: &Rc<RefCell<CallbackRegistry>>,
    phase: Phase,
    callback: PhaseCallback,
) -> Unsubscribe {
    let mut reg = registry.borrow_mut();
    reg.next_id += 1;
    let id = reg.next_id;
    reg.list_mut(phase).push(Rc::new(Entry {
        id,
        active: Cell::new(true),
        callback: RefCell::new(callback),
    }));
    Unsubscribe {
        registry: Rc::downgrade(registry),
        phase,
        id,
    }
}

/// Run every callback of `phase` with `arg`
pub(crate) fn invoke(registry: &RefCell<CallbackRegistry>, phase: Phase, arg: f64) {
    let snapshot = registry.borrow().list(phase).clone();
    for entry in snapshot {
        if !entry.active.get() {
            continue;
        }
        let Ok(mut callback) = entry.callback.try_borrow_mut() else {
            log::warn!("Skipping re-entrant {} callback", phase);
            continue;
        };
        if let Err(msg) = run_isolated(|| (&mut **callback)(arg)) {
            log::error!("{} callback {}", phase, msg);
        }
    }
}

/// Handle returned by the loop's `on_*` registration methods
#[derive(Debug)]
pub struct Unsubscribe {
    registry: Weak<RefCell<CallbackRegistry>>,
    phase: Phase,
    id: u64,
}

impl Unsubscribe {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Remove the callback. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.borrow_mut().remove(self.phase, self.id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Rc<RefCell<CallbackRegistry>> {
        Rc::new(RefCell::new(CallbackRegistry::default()))
    }

    fn infallible(mut f: impl FnMut(f64) + 'static) -> PhaseCallback {
        Box::new(move |arg: f64| -> CallbackResult {
            f(arg);
            Ok(())
        })
    }

    #[test]
    fn test_invoke_in_insertion_order_per_phase() {
        let reg = registry();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (phase, tag) in [(Phase::Update, "u1"), (Phase::Render, "r"), (Phase::Update, "u2")] {
            let log = log.clone();
            register(&reg, phase, infallible(move |_| log.borrow_mut().push(tag)));
        }
        invoke(&reg, Phase::Update, 16.0);
        assert_eq!(*log.borrow(), vec!["u1", "u2"]);
    }

    #[test]
    fn test_unsubscribe_and_clear() {
        let reg = registry();
        let handle = register(&reg, Phase::FixedUpdate, infallible(|_| {}));
        register(&reg, Phase::Render, infallible(|_| {}));
        assert_eq!(handle.phase(), Phase::FixedUpdate);
        assert!(handle.unsubscribe());
        assert!(!handle.unsubscribe());
        assert_eq!(reg.borrow().len(Phase::FixedUpdate), 0);

        reg.borrow_mut().clear();
        assert_eq!(reg.borrow().len(Phase::Render), 0);
    }

    #[test]
    fn test_panicking_callback_does_not_stop_phase() {
        let reg = registry();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        register(&reg, Phase::Render, infallible(|_| panic!("render failed")));
        register(&reg, Phase::Render, infallible(move |_| r.set(true)));
        invoke(&reg, Phase::Render, 0.5);
        assert!(ran.get());
    }

    #[test]
    fn test_erroring_callback_does_not_stop_phase() {
        let reg = registry();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        register(
            &reg,
            Phase::Update,
            Box::new(|_: f64| -> CallbackResult { Err("texture not loaded".into()) }),
        );
        register(&reg, Phase::Update, infallible(move |_| c.set(c.get() + 1)));
        invoke(&reg, Phase::Update, 16.0);
        invoke(&reg, Phase::Update, 16.0);
        assert_eq!(count.get(), 2);
        assert_eq!(reg.borrow().len(Phase::Update), 2);
    }
}
