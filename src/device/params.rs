//! Device-reported capabilities and the parameters applied to them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A picture or preview size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Creates a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    #[inline]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Width over height. Zero-height sizes report 0.0.
    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Camera parameters as read from, and written back to, a device.
///
/// The `supported_*` lists are reported by the device and are not
/// guaranteed to be sorted. The remaining fields are the current choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraParameters {
    /// Still sizes the device can produce.
    pub supported_picture_sizes: Vec<Size>,
    /// Preview sizes the device can stream.
    pub supported_preview_sizes: Vec<Size>,
    /// Focus mode identifiers the device accepts.
    pub supported_focus_modes: Vec<String>,
    /// Chosen still size.
    pub picture_size: Option<Size>,
    /// Chosen preview size.
    pub preview_size: Option<Size>,
    /// Chosen focus mode, if any.
    pub focus_mode: Option<String>,
    /// Hints the driver to favour fast capture.
    pub recording_hint: bool,
}

impl CameraParameters {
    /// Returns true if the device advertises `mode`.
    pub fn supports_focus_mode(&self, mode: &str) -> bool {
        self.supported_focus_modes.iter().any(|m| m == mode)
    }
}

/// The output surface a preview is rendered into.
///
/// Owned by the view lifecycle; the session only borrows it while
/// binding the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSurface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PreviewSurface {
    /// Creates a surface description.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_area_and_aspect() {
        let size = Size::new(1920, 1080);
        assert_eq!(size.area(), 2_073_600);
        assert!((size.aspect_ratio() - 16.0 / 9.0).abs() < 1e-9);
        assert_eq!(Size::new(10, 0).aspect_ratio(), 0.0);
        assert_eq!(size.to_string(), "1920x1080");
    }

    #[test]
    fn test_focus_mode_support() {
        let params = CameraParameters {
            supported_focus_modes: vec!["auto".into(), "fixed".into()],
            ..Default::default()
        };
        assert!(params.supports_focus_mode("auto"));
        assert!(!params.supports_focus_mode("continuous-picture"));
    }
}
