//! Prometheus metrics for camera sessions.
//!
//! [`MetricsCallbacks`] sits between a [`crate::CameraSession`] and the
//! application's callbacks and counts what passes through it.
//!
//! # Metrics Exposed
//!
//! - `hidden_camera_preview_frames_total` - Preview frames delivered
//! - `hidden_camera_preview_fps` - Frame rate from the latest preview interval
//! - `hidden_camera_captures_requested_total` - Still captures requested
//! - `hidden_camera_images_saved_total` - Stills written to disk
//! - `hidden_camera_image_write_failures_total` - Captures that could not be written
//! - `hidden_camera_open_failures_total` - Camera open or preview start failures
//! - `hidden_camera_capture_timeouts_total` - Captures abandoned by the watchdog
//!
//! With the `metrics` feature, [`MetricsServer`] serves the registry on
//! `/metrics` alongside a `/health` probe.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use hidden_camera::metrics::{MetricsCallbacks, SessionMetrics};
//! use hidden_camera::{CameraCallbacks, CameraError, PreviewFrame};
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
//! let metrics = Arc::new(SessionMetrics::new().expect("Failed to create registry"));
//! let callbacks = Arc::new(MetricsCallbacks::new(App, Arc::clone(&metrics)));
//! // Hand `callbacks` to CameraSession::new, then later:
//! println!("{}", metrics.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsCallbacks, MetricsError, MetricsSnapshot, SessionMetrics};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
