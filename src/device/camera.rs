//! Camera driver abstraction.
//!
//! The session never talks to hardware directly. A [`CameraDriver`]
//! hands out exclusively-owned [`CameraDevice`] handles, which lets tests
//! and the demo binary run against [`super::MockDriver`].

use super::{CameraParameters, PreviewSurface};
use crate::config::CameraFacing;
use thiserror::Error;

/// Errors reported by a camera driver or device handle.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No camera with the requested facing.
    #[error("no {0} camera available")]
    NotFound(CameraFacing),
    /// The camera exists but could not be acquired.
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    /// Parameters were rejected by the device.
    #[error("device rejected parameters: {0}")]
    InvalidParameters(String),
    /// Preview could not be started.
    #[error("preview failed: {0}")]
    PreviewFailed(String),
    /// Still capture could not be requested.
    #[error("still capture failed: {0}")]
    CaptureFailed(String),
    /// The handle was already released.
    #[error("camera handle already released")]
    Released,
}

/// Invoked by the driver on its own thread for every preview tick.
///
/// The buffer is only valid for the duration of the call.
pub type PreviewCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Invoked once by the driver with the encoded still image.
pub type PictureCallback = Box<dyn FnOnce(Vec<u8>) + Send>;

/// Opens camera devices.
pub trait CameraDriver {
    /// Acquires the camera with the given facing.
    fn open(&mut self, facing: CameraFacing) -> Result<Box<dyn CameraDevice>, DeviceError>;
}

/// An open camera handle.
///
/// Exclusively owned by one session. All methods are called from the
/// UI-affinity thread.
pub trait CameraDevice: Send {
    /// Reads the current parameters, including supported values.
    fn parameters(&self) -> CameraParameters;

    /// Applies parameters previously obtained from [`Self::parameters`].
    fn set_parameters(&mut self, params: &CameraParameters) -> Result<(), DeviceError>;

    /// Sets the clockwise rotation of the preview display.
    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), DeviceError>;

    /// Binds the preview output to a surface.
    fn set_preview_display(&mut self, surface: &PreviewSurface) -> Result<(), DeviceError>;

    /// Installs or clears the per-frame preview callback.
    fn set_preview_callback(&mut self, callback: Option<PreviewCallback>);

    /// Starts streaming preview frames to the bound surface.
    fn start_preview(&mut self) -> Result<(), DeviceError>;

    /// Stops the preview. Stopping an idle preview is not an error.
    fn stop_preview(&mut self) -> Result<(), DeviceError>;

    /// Requests a single still capture. `on_picture` runs at most once.
    fn take_picture(&mut self, on_picture: PictureCallback) -> Result<(), DeviceError>;

    /// Releases the hardware. Safe to call more than once.
    fn release(&mut self);
}
