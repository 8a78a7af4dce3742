//! OTA firmware update client.
//!
//! `otapull` polls an update server over plain HTTP, streams the firmware
//! image into a pluggable writer, and reports one terminal outcome per
//! attempt. The moving parts:
//!
//! - [`session`]: the per-attempt state machine and its async driver.
//!   Handles header parsing, redirects, body streaming, and failure
//!   classification.
//! - [`transport`]: how bytes move. The bundled [`transport::TcpTransport`]
//!   speaks plaintext TCP; TLS-capable transports plug in behind the same
//!   trait.
//! - [`writer`]: where image bytes go. The bundled file writer stages the
//!   image on disk; embedded integrations substitute their flash writer.
//! - [`scheduler`]: periodic checks with strictly serialized attempts.
//! - [`client`]: the facade wiring the seams together.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use otapull::config::{DeviceIdentity, SessionOptions};
//! use otapull::transport::TcpTransport;
//! use otapull::writer::ImageFileWriterFactory;
//! use otapull::UpdateClient;
//!
//! # async fn check() -> Result<(), otapull::writer::WriterError> {
//! let client = UpdateClient::new(
//!     Arc::new(TcpTransport::new()),
//!     Arc::new(ImageFileWriterFactory::new("fw.bin")),
//!     DeviceIdentity::new("device-1", "aa:bb:cc:dd:ee:ff"),
//! );
//! let outcome = client
//!     .update_once("http://updates.example.com/fw.bin", SessionOptions::default())
//!     .await?;
//! println!("result {}", outcome.code);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod http;
pub mod restart;
pub mod scheduler;
pub mod session;
pub mod transport;
pub mod writer;

pub use client::UpdateClient;
pub use scheduler::AttemptScheduler;
pub use session::{UpdateOutcome, UpdateSession};

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
