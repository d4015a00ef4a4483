//! Outbound callback interface implemented by the application.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::config::CameraFacing;
use crate::device::Size;

/// Errors reported through [`CameraCallbacks::on_camera_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraError {
    /// Acquiring the device, binding the surface or starting the preview
    /// failed. Not retried; the caller must start the session again.
    CameraOpenFailed,
    /// Decoding or persisting a captured still failed. The session keeps
    /// previewing and stays usable.
    ImageWriteFailed,
    /// The driver never completed a still capture. Capture is re-armed.
    CaptureTimedOut,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::CameraOpenFailed => f.write_str("camera open failed"),
            CameraError::ImageWriteFailed => f.write_str("image write failed"),
            CameraError::CaptureTimedOut => f.write_str("still capture timed out"),
        }
    }
}

/// A live preview buffer, borrowed from the driver for one callback.
///
/// Copy `data` to keep it past the call.
#[derive(Debug, Clone, Copy)]
pub struct PreviewFrame<'a> {
    /// Raw frame bytes in the driver's preview format.
    pub data: &'a [u8],
    /// Camera the frame came from.
    pub facing: CameraFacing,
    /// Negotiated preview size.
    pub size: Size,
    /// Per-session tick counter, starting at 1.
    /// Tick number, starting at 1.
    pub sequence: u64,
}

/// Timing of one preview tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    /// Tick number, starting at 1.
    pub sequence: u64,
    /// Time since the previous tick; `None` for the first one.
    pub interval: Option<Duration>,
}

impl FrameTiming {
    /// Instantaneous frame rate derived from `interval`.
    pub fn fps(&self) -> Option<f64> {
        self.interval
            .filter(|d| !d.is_zero())
            .map(|d| 1.0 / d.as_secs_f64())
    }
}

/// Callbacks from a [`super::CameraSession`].
///
/// `on_camera_error` and `on_image_capture` always run on the UI-affinity
/// thread. `on_preview_frame` and `on_frame_timing` run on the driver's
/// preview thread at frame rate and must return quickly.
pub trait CameraCallbacks: Send + Sync {
    /// An error the application should know about.
    fn on_camera_error(&self, error: CameraError);

    /// A still was written to `image_file`.
    fn on_image_capture(&self, image_file: &Path);

    /// One preview tick.
    fn on_preview_frame(&self, frame: &PreviewFrame<'_>);

    /// Optional frame-timing hook.
    fn on_frame_timing(&self, _timing: FrameTiming) {}
}
