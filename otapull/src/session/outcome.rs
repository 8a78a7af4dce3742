//! Terminal outcome of an update attempt.

use serde::Serialize;

/// Image already current (HTTP 304).
pub const RESULT_NOT_MODIFIED: i32 = 1;

/// Image fully streamed and committed.
pub const RESULT_APPLIED: i32 = 2;

/// Generic failure: premature close, writer failure, unusable response.
pub const RESULT_FAILED: i32 = -1;

/// The connection attempt could not even start.
pub const RESULT_CONNECT_FAILED: i32 = -10;

/// Status reasons recorded by the session; the first one observed wins.
pub const MSG_NOT_MODIFIED: &str = "Not Modified";
pub const MSG_UPDATE_APPLIED: &str = "Update applied";
pub const MSG_INVALID_STATUS: &str = "Invalid HTTP response code";
pub const MSG_UPDATE_FAILED: &str = "Update failed";
pub const MSG_CONNECT_FAILED: &str = "Failed to connect";
pub const MSG_LENGTH_REQUIRED: &str = "Invalid content length (chunked encoding is not supported)";
pub const MSG_TOO_MANY_REDIRECTS: &str = "Too many redirects";

/// Reported terminal state of one update attempt.
///
/// `code` is positive on success (`1` not modified, `2` applied) and negative
/// on failure; for a non-success HTTP status the magnitude is the status
/// itself (a 404 yields `-404`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    /// Result code.
    pub code: i32,
    /// First recorded success/failure reason, if any.
    pub message: Option<String>,
    /// True when the device must restart to run the new image.
    pub reboot: bool,
}

impl UpdateOutcome {
    /// True for any positive result code.
    pub fn is_success(&self) -> bool {
        self.code > 0
    }
}
