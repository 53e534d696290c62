//! Event identifiers and payloads
//!
//! Publishers and subscribers share one closed enum, so a payload shape can
//! never drift between the two sides.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An event as published on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Frame loop started (or restarted)
    LoopStart,
    /// Frame loop stopped
    LoopStop,
    /// Frame loop paused
    LoopPause,
    /// Frame loop resumed
    LoopResume,
    /// Page went to the background
    VisibilityHidden,
    /// Page came back to the foreground
    VisibilityVisible {
        /// How long the page was hidden (ms)
        hidden_duration: f64,
    },
    /// Something asks running sessions to pause
    PauseRequest,
    /// Something asks paused sessions to resume
    ResumeRequest,
    /// Game-specific event (score changes, level ends, ...)
    Custom {
        name: Cow<'static, str>,
        payload: serde_json::Value,
    },
}

impl Event {
    pub fn custom(name: impl Into<Cow<'static, str>>, payload: serde_json::Value) -> Self {
        Event::Custom {
            name: name.into(),
            payload,
        }
    }

    /// The subscription key this event is delivered under
    pub fn kind(&self) -> EventKind {
        match self {
            Event::LoopStart => EventKind::LoopStart,
            Event::LoopStop => EventKind::LoopStop,
            Event::LoopPause => EventKind::LoopPause,
            Event::LoopResume => EventKind::LoopResume,
            Event::VisibilityHidden => EventKind::VisibilityHidden,
            Event::VisibilityVisible { .. } => EventKind::VisibilityVisible,
            Event::PauseRequest => EventKind::PauseRequest,
            Event::ResumeRequest => EventKind::ResumeRequest,
            Event::Custom { name, .. } => EventKind::Custom(name.clone()),
        }
    }
}

/// Subscription key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    LoopStart,
    LoopStop,
    LoopPause,
    LoopResume,
    VisibilityHidden,
    VisibilityVisible,
    PauseRequest,
    ResumeRequest,
    Custom(Cow<'static, str>),
}

impl EventKind {
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        EventKind::Custom(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::LoopStart => "loop:start",
            EventKind::LoopStop => "loop:stop",
            EventKind::LoopPause => "loop:pause",
            EventKind::LoopResume => "loop:resume",
            EventKind::VisibilityHidden => "visibility:hidden",
            EventKind::VisibilityVisible => "visibility:visible",
            EventKind::PauseRequest => "game:pause-request",
            EventKind::ResumeRequest => "game:resume-request",
            EventKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
