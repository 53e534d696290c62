//! Event bus module
//!
//! Page-wide publish/subscribe used to coordinate the frame loop, the
//! visibility tracker and game-side collaborators (overlays, audio).

pub mod bus;
pub mod event;
pub mod scoped;

pub use bus::{EventBus, HistoryEntry, ListenerId, Subscription};
pub use event::{Event, EventKind};
pub use scoped::ScopedBus;
