//! Core lifecycle and event types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// A close notification reported by a socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloseEvent {
    /// The close code. `1000` is the only normal closure code.
    pub code: i32,
    /// A human readable close reason, possibly empty.
    pub reason: String,
}

impl CloseEvent {
    /// The WebSocket "normal closure" code.
    pub const NORMAL_CLOSURE: i32 = 1000;

    /// Creates a new close event.
    pub fn new(code: i32, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a normal closure event with an empty reason.
    pub fn normal() -> Self {
        Self::new(Self::NORMAL_CLOSURE, "")
    }

    /// Returns `true` if this is a normal closure.
    pub const fn is_normal(&self) -> bool {
        self.code == Self::NORMAL_CLOSURE
    }
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code = {}", self.code)
        } else {
            write!(f, "code = {}, reason = {}", self.code, self.reason)
        }
    }
}

/// Lifecycle of a message reader.
///
/// `Initial` buffers every socket event, `Listening` forwards them live and
/// `Closed` is terminal. `Closed` is reachable from either of the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderState {
    /// No listener has been attached yet; events are buffered.
    Initial,
    /// A listener was attached; events are delivered as they arrive.
    Listening,
    /// The socket closed; no further events are accepted.
    Closed,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Listening => write!(f, "listening"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A failed write, as reported on a writer's error event.
#[derive(Debug, Clone)]
pub struct WriteError<M> {
    /// Why the write failed.
    pub error: TransportError,
    /// The message that could not be written.
    pub message: Option<M>,
    /// 1-based sequence number of this failure. Never reset.
    pub count: u64,
}
