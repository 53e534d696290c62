//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time (`performance.now()` on web, `Instant` natively, manual in tests)
//! - Frame scheduling (requestAnimationFrame on web)
//! - Visibility/focus detection

pub mod clock;
pub mod scheduler;
pub mod visibility;

#[cfg(target_arch = "wasm32")]
pub use clock::PerformanceClock;
#[cfg(not(target_arch = "wasm32"))]
pub use clock::SystemClock;
pub use clock::{Clock, ManualClock};
#[cfg(target_arch = "wasm32")]
pub use scheduler::AnimationFrameScheduler;
pub use scheduler::{FrameCallback, FrameHandle, FrameScheduler, ManualScheduler};
pub use visibility::{VisibilityState, VisibilityTracker};
