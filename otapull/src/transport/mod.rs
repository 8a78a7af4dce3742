//! Streaming transport for update downloads.
//!
//! A [`Transport`] opens one [`Connection`] per attempt. The connection
//! delivers ordered [`ConnectionEvent`]s over a bounded channel: `Connected`
//! exactly once, zero or more `Data` spans, then `Closed`. The session driver
//! pumps these into the state machine; the machine itself never touches the
//! network.
//!
//! Dropping a `Connection` (or calling [`Connection::close_now`]) cancels the
//! reader task, so a session can never be bound to two live links at once.

pub mod tcp;

pub use tcp::TcpTransport;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::http::UpdateRequest;

/// Events buffered per connection before the reader task backs off.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Boxed future, usable through `dyn Transport`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised by transports.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection attempt timed out")]
    Timeout,

    #[error("TLS is not supported by this transport")]
    TlsNotSupported,
}

/// Ordered notifications from one connection.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Outcome of the connection attempt. On `Err` the only further event is
    /// `Closed`.
    Connected(Result<(), TransportError>),
    /// A span of received bytes.
    Data(Bytes),
    /// The link is gone; no further events follow.
    Closed,
}

/// Handle to one open connection.
pub struct Connection {
    events: mpsc::Receiver<ConnectionEvent>,
    shutdown: CancellationToken,
}

impl Connection {
    /// Assemble a connection from its event stream and shutdown token.
    pub fn new(events: mpsc::Receiver<ConnectionEvent>, shutdown: CancellationToken) -> Self {
        Self { events, shutdown }
    }

    /// Next notification, or `None` once the stream is exhausted.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }

    /// Tear the link down without waiting for the peer.
    pub fn close_now(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Opens connections for update attempts.
pub trait Transport: Send + Sync {
    /// Open a connection for `request` and send its head; events follow on
    /// the returned handle.
    fn connect<'a>(
        &'a self,
        request: &'a UpdateRequest,
    ) -> BoxFuture<'a, Result<Connection, TransportError>>;
}
