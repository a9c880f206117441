// src/session.rs
//! Session state and the reducer that drives it.
//!
//! All transitions go through [`reduce`], which is pure: it takes the
//! current state and one event and returns the next state. The caller owns
//! I/O, clocks and the generation call.

use log::debug;
use std::sync::Arc;

use crate::models::{AspectRatio, GeneratedImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Generating,
    Success,
    Error,
}

/// Identifies one submitted request, so a result can be matched to it.
pub type Ticket = u64;

#[derive(Debug, Clone)]
pub enum Event {
    Submit { ratio: AspectRatio },
    Completed { ticket: Ticket, image: GeneratedImage },
    Failed { ticket: Ticket, message: String },
    SelectHistory { timestamp: i64 },
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub current_image: Option<Arc<GeneratedImage>>,
    pub history: Vec<Arc<GeneratedImage>>,
    pub last_error: Option<String>,
    pub active_ratio: AspectRatio,
    /// Ticket of the request in flight. Browsing history does not clear it.
    pub pending: Option<Ticket>,
    next_ticket: Ticket,
    last_timestamp: i64,
}

impl SessionState {
    pub fn new(default_ratio: AspectRatio) -> Self {
        Self {
            active_ratio: default_ratio,
            ..Self::default()
        }
    }

    pub fn accepts_submit(&self) -> bool {
        self.pending.is_none()
    }

    pub fn is_generating(&self) -> bool {
        self.phase == Phase::Generating
    }

    /// A timestamp for a new image: `now_ms`, bumped past the last one
    /// handed out so identities stay unique within the session.
    pub fn next_timestamp(&self, now_ms: i64) -> i64 {
        now_ms.max(self.last_timestamp + 1)
    }

    pub fn find(&self, timestamp: i64) -> Option<&Arc<GeneratedImage>> {
        self.history.iter().find(|img| img.timestamp() == timestamp)
    }

    /// Ratio used to size the view: the requested one while generating,
    /// otherwise the shown image's own ratio.
    pub fn display_ratio(&self) -> AspectRatio {
        if self.is_generating() {
            return self.active_ratio;
        }
        self.current_image
            .as_ref()
            .map(|img| img.aspect_ratio())
            .unwrap_or(self.active_ratio)
    }
}

pub fn reduce(mut state: SessionState, event: Event) -> SessionState {
    match event {
        Event::Submit { ratio } => {
            if !state.accepts_submit() {
                debug!("Submit ignored: request {:?} still pending", state.pending);
                return state;
            }
            state.next_ticket += 1;
            state.pending = Some(state.next_ticket);
            state.phase = Phase::Generating;
            state.active_ratio = ratio;
            state.last_error = None;
        }
        Event::Completed { ticket, image } => {
            if state.pending != Some(ticket) {
                debug!("Dropping result for stale request {}", ticket);
                return state;
            }
            state.pending = None;
            state.last_timestamp = state.last_timestamp.max(image.timestamp());
            let image = Arc::new(image);
            state.history.push(Arc::clone(&image));
            state.current_image = Some(image);
            state.phase = Phase::Success;
        }
        Event::Failed { ticket, message } => {
            if state.pending != Some(ticket) {
                debug!("Dropping failure for stale request {}", ticket);
                return state;
            }
            state.pending = None;
            state.last_error = Some(message);
            state.phase = Phase::Error;
        }
        Event::SelectHistory { timestamp } => {
            let Some(image) = state.find(timestamp).cloned() else {
                debug!("No history entry with timestamp {}", timestamp);
                return state;
            };
            state.current_image = Some(image);
            state.last_error = None;
            state.phase = Phase::Success;
        }
    }
    state
}
