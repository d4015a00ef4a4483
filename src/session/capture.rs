//! Background decode / rotate / save of a captured still.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use thiserror::Error;

use crate::config::{CameraConfig, CameraRotation, ImageFormat};
use crate::imaging::{self, ImagingError};

/// Why a capture job did not produce an image file.
#[derive(Debug, Error)]
pub enum CaptureFailure {
    /// Driver bytes were not an image.
    #[error("captured buffer could not be decoded: {0}")]
    Decode(#[source] ImagingError),
    /// Encoding or writing the file failed.
    #[error("image could not be written: {0}")]
    Write(#[source] ImagingError),
    /// Cancelled before the file was written.
    #[error("capture cancelled")]
    Cancelled,
}

/// Result of a capture job: the written file, or why there is none.
pub type CaptureOutcome = Result<PathBuf, CaptureFailure>;

/// Shared cancellation flag for one capture job.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One still capture's worth of post-processing.
///
/// Cancellation is checked between steps; a step already running is
/// allowed to finish.
pub struct CaptureJob {
    bytes: Vec<u8>,
    rotation: CameraRotation,
    path: PathBuf,
    format: ImageFormat,
    cancel: CancelToken,
}

impl CaptureJob {
    /// Prepares a job for the bytes delivered by the driver.
    pub fn new(bytes: Vec<u8>, config: &CameraConfig, cancel: CancelToken) -> Self {
        Self {
            bytes,
            rotation: config.image_rotation(),
            path: config.image_file().to_path_buf(),
            format: config.image_format(),
            cancel,
        }
    }

    /// Runs the job on the current thread.
    pub fn run(self) -> CaptureOutcome {
        let started = Instant::now();
        self.check_cancelled()?;

        let decoded = imaging::decode(&self.bytes).map_err(CaptureFailure::Decode)?;
        self.check_cancelled()?;

        // The unrotated image is dropped as soon as the rotated copy exists
        let image = imaging::rotate(decoded, self.rotation);
        self.check_cancelled()?;

        imaging::save(&image, &self.path, self.format).map_err(CaptureFailure::Write)?;

        tracing::debug!(
            path = %self.path.display(),
            bytes = self.bytes.len(),
            rotation = self.rotation.degrees(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Capture written"
        );
        Ok(self.path)
    }

    /// Runs the job on a dedicated worker thread and hands the outcome
    /// to `on_done` on that thread.
    pub fn spawn<F>(self, on_done: F) -> std::io::Result<JoinHandle<()>>
    where
        F: FnOnce(CaptureOutcome) + Send + 'static,
    {
        thread::Builder::new()
            .name("capture-worker".to_string())
            .spawn(move || on_done(self.run()))
    }

    fn check_cancelled(&self) -> Result<(), CaptureFailure> {
        if self.cancel.is_cancelled() {
            return Err(CaptureFailure::Cancelled);
        }
        Ok(())
    }
}
