//! Session lifecycle states.

use std::fmt;

/// Lifecycle of an update session.
///
/// ```text
/// Connecting ──▶ HeaderPending ──▶ Streaming ──▶ Finished
///     ▲                │               │
///     │                └───────────────┤
///     └────────── Redirecting ◀────────┘
/// ```
///
/// `Redirecting` is the detached gap between two connections of the same
/// session: the old connection is being torn down and its notifications no
/// longer apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the transport connect outcome.
    Connecting,
    /// Connected; accumulating bytes until a full response head parses.
    HeaderPending,
    /// Head accepted; body bytes stream into the firmware writer.
    Streaming,
    /// Detached from the current connection; a new attempt against the
    /// redirect target is about to start.
    Redirecting,
    /// Terminal; the outcome has been recorded.
    Finished,
}

impl SessionState {
    /// True when notifications from the bound connection no longer apply.
    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Redirecting)
    }

    /// True once the session has recorded its outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::HeaderPending => "header_pending",
            Self::Streaming => "streaming",
            Self::Redirecting => "redirecting",
            Self::Finished => "finished",
        };
        write!(f, "{name}")
    }
}
