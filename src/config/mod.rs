//! Camera and session configuration.
//!
//! [`CameraConfig`] is supplied by the application once per session.
//! [`SessionConfig`] tunes how the session negotiates with the device,
//! and [`FileConfig`] loads both from TOML.

mod camera;
mod session;

pub use camera::{
    default_image_file, CameraConfig, CameraConfigBuilder, CameraFacing, CameraResolution,
    CameraRotation, ImageFormat, DEFAULT_FOCUS_MODE,
};
pub use session::{FileConfig, SessionConfig};

use std::path::PathBuf;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Facing string not recognized.
    #[error("unrecognized camera facing: {0}")]
    InvalidFacing(String),
    /// Resolution tier string not recognized.
    #[error("unrecognized camera resolution: {0}")]
    InvalidResolution(String),
    /// Rotation is not 0, 90, 180 or 270.
    #[error("unrecognized image rotation: {0}")]
    InvalidRotation(String),
    /// Image format string not recognized.
    #[error("unrecognized image format: {0}")]
    InvalidFormat(String),
    /// Focus mode is blank.
    #[error("focus mode must not be empty")]
    InvalidFocusMode,
    /// Image file has no file name or is a directory.
    #[error("invalid image file: {0:?}")]
    InvalidImageFile(PathBuf),
    /// Capture timeout is zero.
    #[error("capture timeout must be non-zero")]
    InvalidTimeout,
    /// Preview target has a zero dimension.
    #[error("invalid preview dimensions")]
    InvalidDimensions,
    /// Display orientation is not a right angle.
    #[error("invalid display orientation {0} (must be 0, 90, 180 or 270)")]
    InvalidOrientation(u32),
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// Config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}
