//! Update client facade.
//!
//! [`UpdateClient`] bundles the injected seams (transport, writer factory,
//! restarter) with the device identity and hands out one [`SessionRunner`]
//! per attempt. It is cheap to share behind an [`Arc`]; the scheduler holds
//! it that way.

use std::sync::Arc;

use crate::config::{DeviceIdentity, ScheduleSettings, SessionOptions, TlsConfig};
use crate::restart::{LoggingRestarter, Restarter};
use crate::scheduler::AttemptScheduler;
use crate::session::{SessionRunner, UpdateOutcome, UpdateSession};
use crate::transport::Transport;
use crate::writer::{WriterError, WriterFactory};

/// Entry point for running update attempts.
pub struct UpdateClient {
    transport: Arc<dyn Transport>,
    writer_factory: Arc<dyn WriterFactory>,
    restarter: Arc<dyn Restarter>,
    identity: DeviceIdentity,
    tls: Option<TlsConfig>,
}

impl UpdateClient {
    /// Create a client for `identity`, downloading via `transport` and
    /// writing images through `writer_factory`.
    ///
    /// Restart requests are only logged until a real [`Restarter`] is
    /// supplied via [`with_restarter`](Self::with_restarter).
    pub fn new(
        transport: Arc<dyn Transport>,
        writer_factory: Arc<dyn WriterFactory>,
        identity: DeviceIdentity,
    ) -> Self {
        Self {
            transport,
            writer_factory,
            restarter: Arc::new(LoggingRestarter),
            identity,
            tls: None,
        }
    }

    /// Use `restarter` for reboot-requiring updates.
    pub fn with_restarter(mut self, restarter: Arc<dyn Restarter>) -> Self {
        self.restarter = restarter;
        self
    }

    /// Forward `tls` to the transport on every attempt.
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Prepare one update attempt against `url`.
    ///
    /// A fresh writer is created per attempt; the returned runner drives the
    /// attempt to its terminal outcome.
    pub fn begin_attempt(
        &self,
        url: &str,
        options: SessionOptions,
    ) -> Result<SessionRunner, WriterError> {
        let writer = self.writer_factory.create_writer(&options)?;
        let machine = UpdateSession::new(url, writer, options);
        Ok(SessionRunner::new(
            machine,
            Arc::clone(&self.transport),
            Arc::clone(&self.restarter),
            self.identity.clone(),
            self.tls.clone(),
        ))
    }

    /// Run a single update attempt to completion.
    pub async fn update_once(
        &self,
        url: &str,
        options: SessionOptions,
    ) -> Result<UpdateOutcome, WriterError> {
        Ok(self.begin_attempt(url, options)?.run().await)
    }

    /// Build a scheduler running periodic attempts with this client.
    pub fn scheduler(self: &Arc<Self>, settings: ScheduleSettings) -> AttemptScheduler {
        AttemptScheduler::new(Arc::clone(self), settings)
    }
}
