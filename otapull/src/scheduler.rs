//! Periodic update checks.
//!
//! [`AttemptScheduler`] fires one update attempt per interval tick against
//! the configured URL. Attempts are strictly serialized: a tick that lands
//! while the previous attempt is still running is skipped, never queued.
//! Scheduled attempts always set `ignore_same_version`, matching the manual
//! "check now" semantics of a polling device.

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use std::sync::Arc;

use crate::client::UpdateClient;
use crate::config::{ScheduleSettings, SessionOptions};
use crate::session::UpdateOutcome;

/// Runs periodic update attempts until shut down.
pub struct AttemptScheduler {
    client: Arc<UpdateClient>,
    settings: ScheduleSettings,
}

impl AttemptScheduler {
    /// Create a scheduler polling with `settings`.
    pub fn new(client: Arc<UpdateClient>, settings: ScheduleSettings) -> Self {
        Self { client, settings }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Returns immediately when scheduling is disabled (no URL or a zero
    /// interval). The first attempt fires one full interval after start, not
    /// at start. On shutdown an in-flight attempt is allowed to finish.
    pub async fn run(self, shutdown: CancellationToken) {
        let Some(url) = self.settings.url.clone() else {
            info!("no update URL configured; scheduled checks disabled");
            return;
        };
        if self.settings.interval.is_zero() {
            info!("update interval is zero; scheduled checks disabled");
            return;
        }

        let interval = self.settings.interval;
        info!(url = %url, interval_secs = interval.as_secs(), "scheduled update checks enabled");

        let mut ticks = time::interval_at(time::Instant::now() + interval, interval);
        let mut in_flight: Option<JoinHandle<UpdateOutcome>> = None;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("scheduler shutting down");
                    break;
                }

                _ = ticks.tick() => {
                    if in_flight.as_ref().is_some_and(|handle| !handle.is_finished()) {
                        warn!("previous update attempt still running; skipping this check");
                        continue;
                    }
                    let options = SessionOptions {
                        ignore_same_version: true,
                        commit_timeout: self.settings.commit_timeout,
                    };
                    match self.client.begin_attempt(&url, options) {
                        Ok(runner) => {
                            in_flight = Some(tokio::spawn(runner.run()));
                        }
                        Err(error) => {
                            error!(%error, "could not start scheduled update attempt");
                        }
                    }
                }
            }
        }

        if let Some(handle) = in_flight.take() {
            if !handle.is_finished() {
                debug!("waiting for in-flight update attempt");
            }
            // The attempt logs its own outcome.
            let _ = handle.await;
        }
        info!("scheduled update checks stopped");
    }
}
