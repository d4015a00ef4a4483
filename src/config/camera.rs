//! Per-session camera configuration.
//!
//! A [`CameraConfig`] is built once by the caller before a session starts
//! and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::ConfigError;

/// Which physical camera to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// Rear-facing camera.
    Back,
    /// User-facing camera.
    Front,
}

/// Coarse still-picture resolution bucket.
///
/// Mapped onto the device's supported picture sizes once they are sorted
/// by descending pixel area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraResolution {
    /// Largest supported size.
    High,
    /// Size at the middle of the sorted list.
    Medium,
    /// Smallest supported size.
    Low,
}

/// Rotation applied to the captured image before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraRotation {
    /// No rotation.
    #[serde(rename = "0")]
    Rotation0,
    /// 90 degrees clockwise.
    #[serde(rename = "90")]
    Rotation90,
    /// Upside down.
    #[serde(rename = "180")]
    Rotation180,
    /// 270 degrees clockwise.
    #[serde(rename = "270")]
    Rotation270,
}

/// Encoding of the persisted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG at quality 100.
    Jpeg,
    /// Lossless PNG.
    Png,
}

impl CameraRotation {
    /// Rotation in clockwise degrees.
    pub fn degrees(self) -> u32 {
        match self {
            CameraRotation::Rotation0 => 0,
            CameraRotation::Rotation90 => 90,
            CameraRotation::Rotation180 => 180,
            CameraRotation::Rotation270 => 270,
        }
    }

    /// Returns true if the image must be rotated at all.
    pub fn is_identity(self) -> bool {
        self == CameraRotation::Rotation0
    }
}

impl ImageFormat {
    /// File extension used for generated file names.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

impl FromStr for CameraFacing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "back" | "rear" => Ok(CameraFacing::Back),
            "front" => Ok(CameraFacing::Front),
            other => Err(ConfigError::InvalidFacing(other.to_string())),
        }
    }
}

impl FromStr for CameraResolution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(CameraResolution::High),
            "medium" => Ok(CameraResolution::Medium),
            "low" => Ok(CameraResolution::Low),
            other => Err(ConfigError::InvalidResolution(other.to_string())),
        }
    }
}

impl FromStr for CameraRotation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(CameraRotation::Rotation0),
            "90" => Ok(CameraRotation::Rotation90),
            "180" => Ok(CameraRotation::Rotation180),
            "270" => Ok(CameraRotation::Rotation270),
            other => Err(ConfigError::InvalidRotation(other.to_string())),
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            other => Err(ConfigError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraFacing::Back => f.write_str("back"),
            CameraFacing::Front => f.write_str("front"),
        }
    }
}

impl fmt::Display for CameraResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraResolution::High => f.write_str("high"),
            CameraResolution::Medium => f.write_str("medium"),
            CameraResolution::Low => f.write_str("low"),
        }
    }
}

/// Focus mode requested when the caller does not pick one.
pub const DEFAULT_FOCUS_MODE: &str = "continuous-picture";

/// Immutable configuration for one camera session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    facing: CameraFacing,
    resolution: CameraResolution,
    focus_mode: String,
    image_rotation: CameraRotation,
    image_file: PathBuf,
    image_format: ImageFormat,
}

impl CameraConfig {
    /// Starts building a configuration with library defaults.
    pub fn builder() -> CameraConfigBuilder {
        CameraConfigBuilder::default()
    }

    /// Starts a builder seeded with this configuration's values.
    pub fn to_builder(&self) -> CameraConfigBuilder {
        CameraConfigBuilder {
            facing: self.facing,
            resolution: self.resolution,
            focus_mode: self.focus_mode.clone(),
            image_rotation: self.image_rotation,
            image_file: Some(self.image_file.clone()),
            image_format: self.image_format,
        }
    }

    /// Camera to open.
    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    /// Still-picture resolution tier.
    pub fn resolution(&self) -> CameraResolution {
        self.resolution
    }

    /// Focus mode identifier. Applied only if the device advertises it.
    pub fn focus_mode(&self) -> &str {
        &self.focus_mode
    }

    /// Rotation applied before the still is written.
    pub fn image_rotation(&self) -> CameraRotation {
        self.image_rotation
    }

    /// File each successful capture is written to.
    pub fn image_file(&self) -> &Path {
        &self.image_file
    }

    /// Encoding of the written file.
    pub fn image_format(&self) -> ImageFormat {
        self.image_format
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_file.file_name().is_none() {
            return Err(ConfigError::InvalidImageFile(self.image_file.clone()));
        }
        if self.image_file.is_dir() {
            return Err(ConfigError::InvalidImageFile(self.image_file.clone()));
        }
        if self.focus_mode.trim().is_empty() {
            return Err(ConfigError::InvalidFocusMode);
        }
        Ok(())
    }
}

/// Builder for [`CameraConfig`].
#[derive(Debug, Clone)]
pub struct CameraConfigBuilder {
    facing: CameraFacing,
    resolution: CameraResolution,
    focus_mode: String,
    image_rotation: CameraRotation,
    image_file: Option<PathBuf>,
    image_format: ImageFormat,
}

impl Default for CameraConfigBuilder {
    fn default() -> Self {
        Self {
            facing: CameraFacing::Front,
            resolution: CameraResolution::Medium,
            focus_mode: DEFAULT_FOCUS_MODE.to_string(),
            image_rotation: CameraRotation::Rotation0,
            image_file: None,
            image_format: ImageFormat::Jpeg,
        }
    }
}

impl CameraConfigBuilder {
    /// Sets the camera to open.
    pub fn facing(mut self, facing: CameraFacing) -> Self {
        self.facing = facing;
        self
    }

    /// Sets the resolution tier.
    pub fn resolution(mut self, resolution: CameraResolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the requested focus mode.
    pub fn focus_mode(mut self, focus_mode: impl Into<String>) -> Self {
        self.focus_mode = focus_mode.into();
        self
    }

    /// Sets the rotation applied before saving.
    pub fn image_rotation(mut self, rotation: CameraRotation) -> Self {
        self.image_rotation = rotation;
        self
    }

    /// Sets the output file.
    pub fn image_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_file = Some(path.into());
        self
    }

    /// Sets the output encoding.
    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// Without an explicit image file, a timestamped `IMG_<millis>` file in
    /// the system temp directory is used.
    pub fn build(self) -> Result<CameraConfig, ConfigError> {
        let image_file = self
            .image_file
            .unwrap_or_else(|| default_image_file(&std::env::temp_dir(), self.image_format));

        let config = CameraConfig {
            facing: self.facing,
            resolution: self.resolution,
            focus_mode: self.focus_mode,
            image_rotation: self.image_rotation,
            image_file,
            image_format: self.image_format,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Generates `IMG_<unix-millis>.<ext>` inside `dir`.
pub fn default_image_file(dir: &Path, format: ImageFormat) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    dir.join(format!("IMG_{}.{}", millis, format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = CameraConfig::builder().build().unwrap();

        assert_eq!(config.facing(), CameraFacing::Front);
        assert_eq!(config.resolution(), CameraResolution::Medium);
        assert_eq!(config.focus_mode(), DEFAULT_FOCUS_MODE);
        assert_eq!(config.image_rotation(), CameraRotation::Rotation0);
        assert_eq!(config.image_format(), ImageFormat::Jpeg);

        let name = config.image_file().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("IMG_"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_generated_name_follows_format() {
        let path = default_image_file(Path::new("/tmp"), ImageFormat::Png);
        assert_eq!(path.extension().unwrap(), "png");
    }

    #[test]
    fn test_directory_image_file_rejected() {
        let result = CameraConfig::builder()
            .image_file(std::env::temp_dir())
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidImageFile(_))));
    }

    #[test]
    fn test_empty_focus_mode_rejected() {
        let result = CameraConfig::builder().focus_mode("  ").build();
        assert!(matches!(result, Err(ConfigError::InvalidFocusMode)));
    }

    #[test]
    fn test_unknown_resolution_is_an_error() {
        assert_eq!(
            "HIGH".parse::<CameraResolution>().unwrap(),
            CameraResolution::High
        );
        assert!(matches!(
            "ultra".parse::<CameraResolution>(),
            Err(ConfigError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_to_builder_keeps_values() {
        let original = CameraConfig::builder()
            .facing(CameraFacing::Back)
            .resolution(CameraResolution::Low)
            .image_file("/tmp/kept.png")
            .image_format(ImageFormat::Png)
            .build()
            .unwrap();

        let changed = original
            .to_builder()
            .resolution(CameraResolution::High)
            .build()
            .unwrap();
        assert_eq!(changed.facing(), CameraFacing::Back);
        assert_eq!(changed.resolution(), CameraResolution::High);
        assert_eq!(changed.image_file(), Path::new("/tmp/kept.png"));
        assert_eq!(original.to_builder().build().unwrap(), original);
    }

    #[test]
    fn test_rotation_parsing() {
        assert_eq!("270".parse::<CameraRotation>().unwrap().degrees(), 270);
        assert!("45".parse::<CameraRotation>().is_err());
        assert!(CameraRotation::Rotation0.is_identity());
        assert!(!CameraRotation::Rotation90.is_identity());
    }
}
