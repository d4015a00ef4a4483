//! Camera device abstraction.
//!
//! The session drives a device through the [`CameraDriver`] and
//! [`CameraDevice`] traits. [`MockDriver`] implements them in-process.

mod camera;
mod mock;
mod params;

pub use camera::{CameraDevice, CameraDriver, DeviceError, PictureCallback, PreviewCallback};
pub use mock::{MockDevice, MockDriver, MockProbe};
pub use params::{CameraParameters, PreviewSurface, Size};
