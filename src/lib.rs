//! Hidden Camera Library
//!
//! Headless still capture: acquire a camera, run its preview into an
//! off-screen surface and save single stills to disk without showing
//! anything to the user.
//!
//! # Architecture
//!
//! ```text
//! config → session → device (driver thread)
//!             ↓          ↓
//!          executor ← capture worker → imaging
//! ```
//!
//! - [`config`]: what to capture and where to write it
//! - [`device`]: the driver seam, with an in-process mock
//! - [`session`]: lifecycle, parameter negotiation and the capture guard
//! - [`executor`]: delivers completion callbacks on the owning thread
//! - [`imaging`]: decode, rotate and encode stills
//! - [`metrics`]: Prometheus counters fed from the callbacks
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use hidden_camera::{
//!     CameraCallbacks, CameraConfig, CameraError, CameraFacing, CameraSession,
//!     MockDriver, PreviewFrame, PreviewSurface, SessionConfig, UiLoop,
//! };
//!
//! struct App;
//!
//! impl CameraCallbacks for App {
//!     fn on_camera_error(&self, error: CameraError) {
//!         eprintln!("camera error: {}", error);
//!     }
//!     fn on_image_capture(&self, image_file: &Path) {
//!         println!("saved {}", image_file.display());
//!     }
//!     fn on_preview_frame(&self, _frame: &PreviewFrame<'_>) {}
//! }
//!
//! let (mut ui, handle) = UiLoop::new();
//! let mut session = CameraSession::new(
//!     MockDriver::new(),
//!     Arc::new(App),
//!     handle,
//!     SessionConfig::default(),
//! )
//! .unwrap();
//!
//! let config = CameraConfig::builder()
//!     .facing(CameraFacing::Back)
//!     .build()
//!     .unwrap();
//! session.start(config);
//! session.on_surface_ready(Some(&PreviewSurface::new(1, 1)));
//!
//! if session.capture_picture().is_ok() {
//!     ui.run_until(|| session.is_capture_armed(), Duration::from_secs(5));
//! }
//! session.stop();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod device;
pub mod executor;
pub mod imaging;
pub mod metrics;
pub mod session;

// Re-export commonly used types at crate root
pub use config::{
    CameraConfig, CameraFacing, CameraResolution, CameraRotation, ConfigError, FileConfig,
    ImageFormat, SessionConfig,
};
pub use device::{CameraDevice, CameraDriver, DeviceError, MockDriver, PreviewSurface, Size};
pub use executor::{UiHandle, UiLoop};
pub use session::{
    CameraCallbacks, CameraError, CameraSession, CaptureRejected, FrameTiming, PreviewFrame,
    SessionState,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
