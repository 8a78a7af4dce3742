//! Plaintext TCP transport.
//!
//! `connect` resolves and dials the request's host, writes the request head,
//! and spawns a reader task that forwards received spans until the peer
//! closes, a read fails, or the connection is cancelled. All outcomes after a
//! successful `connect` call are reported as events, mirroring how the
//! session expects failures to surface through the close path.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    BoxFuture, Connection, ConnectionEvent, Transport, TransportError, EVENT_CHANNEL_CAPACITY,
};
use crate::http::UpdateRequest;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read buffer size for the connection reader task.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Tokio TCP transport. Plaintext only; `https` URLs are rejected.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Transport with the default connect timeout.
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    fn connect<'a>(
        &'a self,
        request: &'a UpdateRequest,
    ) -> BoxFuture<'a, Result<Connection, TransportError>> {
        Box::pin(async move {
            if request.is_tls() {
                warn!(url = %request.url(), "https requires a TLS-capable transport");
                return Err(TransportError::TlsNotSupported);
            }

            let host = request.host().to_string();
            let port = request.port();
            let head = request.to_bytes();
            let connect_timeout = self.connect_timeout;

            let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let shutdown = CancellationToken::new();
            let task_shutdown = shutdown.clone();
            tokio::spawn(async move {
                run_connection(host, port, head, connect_timeout, sender, task_shutdown).await;
            });

            Ok(Connection::new(receiver, shutdown))
        })
    }
}

/// Dial, send the request, and pump received bytes until the link ends.
async fn run_connection(
    host: String,
    port: u16,
    head: Vec<u8>,
    connect_timeout: Duration,
    events: mpsc::Sender<ConnectionEvent>,
    shutdown: CancellationToken,
) {
    let mut stream = match dial(&host, port, connect_timeout, &shutdown).await {
        Ok(stream) => {
            if events
                .send(ConnectionEvent::Connected(Ok(())))
                .await
                .is_err()
            {
                return;
            }
            stream
        }
        Err(error) => {
            let _ = events.send(ConnectionEvent::Connected(Err(error))).await;
            let _ = events.send(ConnectionEvent::Closed).await;
            return;
        }
    };

    if let Err(error) = stream.write_all(&head).await {
        warn!(%error, "failed to send update request");
        let _ = events.send(ConnectionEvent::Closed).await;
        return;
    }

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("connection closed locally");
                break;
            }
            read = stream.read(&mut buf) => match read {
                Ok(0) => {
                    debug!("remote closed connection");
                    break;
                }
                Ok(n) => {
                    let span = Bytes::copy_from_slice(&buf[..n]);
                    if events.send(ConnectionEvent::Data(span)).await.is_err() {
                        break;
                    }
                }
                Err(error) => {
                    debug!(%error, "connection read failed");
                    break;
                }
            },
        }
    }
    let _ = events.send(ConnectionEvent::Closed).await;
}

async fn dial(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    shutdown: &CancellationToken,
) -> Result<TcpStream, TransportError> {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::Interrupted,
            "connection attempt cancelled",
        ))),
        result = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port))) => {
            match result {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(error)) => Err(TransportError::Io(error)),
                Err(_) => Err(TransportError::Timeout),
            }
        }
    }
}
