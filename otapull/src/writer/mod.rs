//! Firmware writer interface.
//!
//! The update session streams body bytes into a [`FirmwareWriter`] and never
//! touches storage itself. A [`WriterFactory`] creates one writer per update
//! attempt, carrying the per-attempt [`SessionOptions`]. The bundled
//! [`ImageFileWriter`] stages the image to disk for a device-side flasher to
//! pick up; embedded integrations substitute their own flash-partition
//! writer behind the same trait.
//!
//! Lifecycle: `begin` once with the expected image size, `write` zero or more
//! times, `finalize` exactly once after the expected bytes have arrived.
//! Dropping an unfinalized writer discards the partial image; there is no
//! separate release operation.

pub mod file;

pub use file::{ImageFileWriter, ImageFileWriterFactory};

use thiserror::Error;

use crate::config::SessionOptions;

/// Errors reported by firmware writers.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("image write before begin")]
    NotStarted,

    #[error("image overruns expected size: {written} written, {expected} expected")]
    Overrun { written: u64, expected: u64 },

    #[error("image incomplete: {written} of {expected} bytes")]
    Incomplete { written: u64, expected: u64 },

    #[error("image I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Incremental consumer of firmware image bytes.
pub trait FirmwareWriter: Send {
    /// Start a new image of `expected_size` bytes.
    fn begin(&mut self, expected_size: u64) -> Result<(), WriterError>;

    /// Append a chunk of image bytes.
    fn write(&mut self, chunk: &[u8]) -> Result<(), WriterError>;

    /// Total bytes written so far.
    fn bytes_written(&self) -> u64;

    /// True once every expected byte has been written.
    fn is_write_complete(&self) -> bool;

    /// Validate and commit the fully written image.
    fn finalize(&mut self) -> Result<(), WriterError>;

    /// True once `finalize` has succeeded.
    fn is_update_finished(&self) -> bool;

    /// True if the committed image only takes effect after a restart.
    fn is_reboot_required(&self) -> bool;
}

/// Creates one [`FirmwareWriter`] per update attempt.
pub trait WriterFactory: Send + Sync {
    /// Build a fresh writer for a new attempt.
    fn create_writer(&self, options: &SessionOptions)
        -> Result<Box<dyn FirmwareWriter>, WriterError>;
}
