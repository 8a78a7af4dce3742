//! File-staging firmware writer.
//!
//! Streams the image into `<dest>.partial`, keeping a running SHA-256, and
//! commits by fsync + rename onto `<dest>`. A crashed or failed attempt never
//! leaves a half-written image at the destination path. Version comparison
//! and commit/rollback policy are left to whatever flashes the staged image;
//! the per-attempt options are recorded for it in the logs.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{FirmwareWriter, WriterError, WriterFactory};
use crate::config::SessionOptions;

/// Suffix appended to the destination path while streaming.
const STAGING_SUFFIX: &str = ".partial";

/// Firmware writer that stages the image to the local filesystem.
pub struct ImageFileWriter {
    dest: PathBuf,
    staging: PathBuf,
    file: Option<File>,
    hasher: Sha256,
    expected: Option<u64>,
    written: u64,
    finished: bool,
    digest: Option<String>,
    options: SessionOptions,
}

impl ImageFileWriter {
    /// Create a writer committing to `dest`.
    pub fn new(dest: impl Into<PathBuf>, options: SessionOptions) -> Self {
        let dest = dest.into();
        let staging = staging_path(&dest);
        Self {
            dest,
            staging,
            file: None,
            hasher: Sha256::new(),
            expected: None,
            written: 0,
            finished: false,
            digest: None,
            options,
        }
    }

    /// Destination path of the committed image.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Lowercase hex SHA-256 of the image, available once finalized.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

impl FirmwareWriter for ImageFileWriter {
    fn begin(&mut self, expected_size: u64) -> Result<(), WriterError> {
        if let Some(parent) = self.dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.staging)?;
        debug!(
            staging = %self.staging.display(),
            expected_size,
            ignore_same_version = self.options.ignore_same_version,
            commit_timeout = ?self.options.commit_timeout,
            "image staging started"
        );
        self.file = Some(file);
        self.expected = Some(expected_size);
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), WriterError> {
        let expected = self.expected.ok_or(WriterError::NotStarted)?;
        let file = self.file.as_mut().ok_or(WriterError::NotStarted)?;

        let new_total = self.written + chunk.len() as u64;
        if new_total > expected {
            return Err(WriterError::Overrun {
                written: new_total,
                expected,
            });
        }

        file.write_all(chunk)?;
        self.hasher.update(chunk);
        self.written = new_total;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.written
    }

    fn is_write_complete(&self) -> bool {
        self.expected.is_some_and(|expected| self.written >= expected)
    }

    fn finalize(&mut self) -> Result<(), WriterError> {
        let expected = self.expected.ok_or(WriterError::NotStarted)?;
        if self.written != expected {
            return Err(WriterError::Incomplete {
                written: self.written,
                expected,
            });
        }
        let file = self.file.take().ok_or(WriterError::NotStarted)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.staging, &self.dest)?;

        let digest = format!("{:x}", std::mem::take(&mut self.hasher).finalize());
        info!(
            path = %self.dest.display(),
            size = self.written,
            sha256 = %digest,
            "image staged"
        );
        self.digest = Some(digest);
        self.finished = true;
        Ok(())
    }

    fn is_update_finished(&self) -> bool {
        self.finished
    }

    fn is_reboot_required(&self) -> bool {
        true
    }
}

impl Drop for ImageFileWriter {
    fn drop(&mut self) {
        // An open file means the attempt never finalized; discard the partial.
        if self.file.take().is_some() {
            if let Err(error) = fs::remove_file(&self.staging) {
                debug!(staging = %self.staging.display(), %error, "failed to remove staging file");
            }
        }
    }
}

/// `<dest>.partial`, next to the destination.
fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(STAGING_SUFFIX);
    dest.with_file_name(name)
}

/// Factory producing [`ImageFileWriter`]s for a fixed destination path.
#[derive(Debug, Clone)]
pub struct ImageFileWriterFactory {
    dest: PathBuf,
}

impl ImageFileWriterFactory {
    /// Stage images at `dest` (one attempt at a time).
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }
}

impl WriterFactory for ImageFileWriterFactory {
    fn create_writer(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn FirmwareWriter>, WriterError> {
        Ok(Box::new(ImageFileWriter::new(
            self.dest.clone(),
            options.clone(),
        )))
    }
}
