//! Device restart seam.
//!
//! A reboot-requiring update ends with one call to [`Restarter::restart_after`].
//! Firmware integrations wire this to their reset/watchdog primitive; on a
//! host the bundled implementation records the request and leaves the staged
//! image for the next deploy step.

use std::time::Duration;

use tracing::info;

/// Requests a device restart after a delay.
pub trait Restarter: Send + Sync {
    /// Schedule a restart `delay` from now; returns immediately.
    fn restart_after(&self, delay: Duration);
}

/// Host-side restarter that only logs the request.
#[derive(Debug, Clone, Default)]
pub struct LoggingRestarter;

impl Restarter for LoggingRestarter {
    fn restart_after(&self, delay: Duration) {
        info!(?delay, "device restart requested");
    }
}
