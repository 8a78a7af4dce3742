//! Async driver for one update attempt.
//!
//! [`SessionRunner`] owns an [`UpdateSession`] and binds it to transport
//! connections one at a time: dial, pump events into the machine, obey the
//! returned directive. On a redirect it drops the connection and dials the
//! machine's new target with the same session value, so redirect chains
//! produce exactly one terminal outcome.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::machine::{EventDirective, UpdateSession};
use super::outcome::UpdateOutcome;
use crate::config::{DeviceIdentity, TlsConfig};
use crate::http::UpdateRequest;
use crate::restart::Restarter;
use crate::transport::{ConnectionEvent, Transport};

/// Delay granted to the outcome consumer before a reboot-requiring success
/// restarts the device.
pub const RESTART_DELAY: Duration = Duration::from_millis(100);

/// Drives one update attempt to its terminal outcome.
pub struct SessionRunner {
    machine: UpdateSession,
    transport: Arc<dyn Transport>,
    restarter: Arc<dyn Restarter>,
    identity: DeviceIdentity,
    tls: Option<TlsConfig>,
}

impl SessionRunner {
    pub(crate) fn new(
        machine: UpdateSession,
        transport: Arc<dyn Transport>,
        restarter: Arc<dyn Restarter>,
        identity: DeviceIdentity,
        tls: Option<TlsConfig>,
    ) -> Self {
        Self {
            machine,
            transport,
            restarter,
            identity,
            tls,
        }
    }

    /// Run the attempt to completion, following redirects.
    pub async fn run(mut self) -> UpdateOutcome {
        info!(
            url = %self.machine.target_url(),
            commit_timeout_secs = self.machine.options().commit_timeout.as_secs(),
            ignore_same_version = self.machine.options().ignore_same_version,
            "starting update attempt"
        );

        loop {
            let request =
                match UpdateRequest::new(self.machine.target_url(), &self.identity, self.tls.clone())
                {
                    Ok(request) => request,
                    Err(error) => {
                        error!(url = %self.machine.target_url(), %error, "invalid update URL");
                        return self.machine.fail_connect();
                    }
                };

            let mut connection = match self.transport.connect(&request).await {
                Ok(connection) => connection,
                Err(error) => {
                    error!(url = %self.machine.target_url(), %error, "connection could not start");
                    return self.machine.fail_connect();
                }
            };

            let outcome = loop {
                let event = match connection.next_event().await {
                    Some(event) => event,
                    // Stream exhausted without an explicit close notification.
                    None => break self.machine.on_close(),
                };
                match event {
                    ConnectionEvent::Connected(result) => self.machine.on_connect(result),
                    ConnectionEvent::Data(data) => match self.machine.on_receive(&data) {
                        EventDirective::Continue => {}
                        EventDirective::CloseNow => connection.close_now(),
                        EventDirective::Redirect => break None,
                    },
                    ConnectionEvent::Closed => break self.machine.on_close(),
                }
            };
            drop(connection);

            match outcome {
                Some(outcome) => {
                    if outcome.reboot {
                        info!(
                            delay_ms = RESTART_DELAY.as_millis() as u64,
                            "scheduling device restart"
                        );
                        self.restarter.restart_after(RESTART_DELAY);
                    }
                    return outcome;
                }
                // Redirect: same session, next connection.
                None => self.machine.rebind(),
            }
        }
    }
}
