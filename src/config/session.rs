//! Session tuning and the TOML file format.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{CameraConfig, ConfigError};
use crate::device::Size;

/// Tuning knobs for a [`crate::CameraSession`].
///
/// These are not part of the per-capture camera configuration; they
/// describe how the session negotiates with the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Watchdog timeout for a single still capture, in milliseconds.
    pub capture_timeout_ms: u64,
    /// Preferred preview width; the closest supported size is used.
    pub preview_width: u32,
    /// Preferred preview height.
    pub preview_height: u32,
    /// Display orientation passed to the device, in degrees.
    pub display_orientation: u32,
    /// Hint the driver that a higher preview frame rate is wanted.
    pub recording_hint: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_timeout_ms: 10_000,
            preview_width: 1280,
            preview_height: 720,
            display_orientation: 90,
            recording_hint: true,
        }
    }
}

impl SessionConfig {
    /// Watchdog timeout for one still capture.
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    /// Preview size the negotiation aims for.
    pub fn preview_target(&self) -> Size {
        Size::new(self.preview_width, self.preview_height)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.preview_width == 0 || self.preview_height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !matches!(self.display_orientation, 0 | 90 | 180 | 270) {
            return Err(ConfigError::InvalidOrientation(self.display_orientation));
        }
        Ok(())
    }
}

/// Full configuration file format.
///
/// ```toml
/// [camera]
/// facing = "back"
/// resolution = "medium"
/// focus_mode = "auto"
/// image_rotation = "90"
/// image_file = "/tmp/capture.jpg"
/// image_format = "jpeg"
///
/// [session]
/// capture_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// The `[camera]` table.
    pub camera: CameraConfig,
    /// The `[session]` table, defaulted when absent.
    #[serde(default)]
    pub session: SessionConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.camera.validate()?;
        config.session.validate()?;
        Ok(config)
    }
}
