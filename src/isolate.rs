//! Fault isolation for user callbacks
//!
//! A failing listener or phase callback must not take the bus or the frame
//! loop down with it. Callbacks report failure by returning `Err`, which works
//! on every target. Panics are also caught where the target unwinds (native);
//! wasm32 builds abort on panic, so browser code should prefer the fallible
//! `try_*` registrations. Callers log the returned message with their own
//! context.

use std::any::Any;
use std::error::Error;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Error returned by a fallible callback
pub type CallbackError = Box<dyn Error>;

/// Result of a fallible callback
pub type CallbackResult = Result<(), CallbackError>;

/// Run `f`, turning an `Err` or a panic into its message
pub(crate) fn run_isolated(f: impl FnOnce() -> CallbackResult) -> Result<(), String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("returned error: {}", e)),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
