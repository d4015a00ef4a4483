//! Metrics collection and registry.

use std::path::Path;
use std::sync::Arc;

use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use thiserror::Error;

use crate::session::{CameraCallbacks, CameraError, FrameTiming, PreviewFrame};

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Point-in-time view of the session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Preview ticks forwarded to the application.
    pub preview_frames: u64,
    /// Frame rate derived from the latest preview interval.
    pub preview_fps: f64,
    /// Still captures requested by the caller.
    pub captures_requested: u64,
    /// Stills written to disk.
    pub images_saved: u64,
    /// `ImageWriteFailed` reports.
    pub image_write_failures: u64,
    /// `CameraOpenFailed` reports.
    pub camera_open_failures: u64,
    /// `CaptureTimedOut` reports.
    pub capture_timeouts: u64,
}

/// Prometheus registry for one camera session.
pub struct SessionMetrics {
    registry: Registry,

    preview_frames: IntCounter,
    preview_fps: Gauge,

    captures_requested: IntCounter,
    images_saved: IntCounter,

    image_write_failures: IntCounter,
    camera_open_failures: IntCounter,
    capture_timeouts: IntCounter,
}

impl SessionMetrics {
    /// Creates a registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let preview_frames = IntCounter::new(
            "hidden_camera_preview_frames_total",
            "Total preview frames delivered",
        )?;
        let preview_fps = Gauge::new(
            "hidden_camera_preview_fps",
            "Preview frame rate from the latest frame interval",
        )?;

        let captures_requested = IntCounter::new(
            "hidden_camera_captures_requested_total",
            "Total still captures requested",
        )?;
        let images_saved = IntCounter::new(
            "hidden_camera_images_saved_total",
            "Total still images written to disk",
        )?;

        let image_write_failures = IntCounter::new(
            "hidden_camera_image_write_failures_total",
            "Total captures that could not be decoded or written",
        )?;
        let camera_open_failures = IntCounter::new(
            "hidden_camera_open_failures_total",
            "Total camera open or preview start failures",
        )?;
        let capture_timeouts = IntCounter::new(
            "hidden_camera_capture_timeouts_total",
            "Total still captures abandoned by the watchdog",
        )?;

        registry.register(Box::new(preview_frames.clone()))?;
        registry.register(Box::new(preview_fps.clone()))?;
        registry.register(Box::new(captures_requested.clone()))?;
        registry.register(Box::new(images_saved.clone()))?;
        registry.register(Box::new(image_write_failures.clone()))?;
        registry.register(Box::new(camera_open_failures.clone()))?;
        registry.register(Box::new(capture_timeouts.clone()))?;

        Ok(Self {
            registry,
            preview_frames,
            preview_fps,
            captures_requested,
            images_saved,
            image_write_failures,
            camera_open_failures,
            capture_timeouts,
        })
    }

    /// Counts a capture request. Call when `capture_picture` returns `Ok`.
    pub fn record_capture_requested(&self) {
        self.captures_requested.inc();
    }

    fn record_error(&self, error: CameraError) {
        match error {
            CameraError::CameraOpenFailed => self.camera_open_failures.inc(),
            CameraError::ImageWriteFailed => self.image_write_failures.inc(),
            CameraError::CaptureTimedOut => self.capture_timeouts.inc(),
        }
    }

    fn record_timing(&self, timing: FrameTiming) {
        self.preview_frames.inc();
        if let Some(fps) = timing.fps() {
            self.preview_fps.set(fps);
        }
    }

    /// Reads the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            preview_frames: self.preview_frames.get(),
            preview_fps: self.preview_fps.get(),
            captures_requested: self.captures_requested.get(),
            images_saved: self.images_saved.get(),
            image_write_failures: self.image_write_failures.get(),
            camera_open_failures: self.camera_open_failures.get(),
            capture_timeouts: self.capture_timeouts.get(),
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Callback wrapper that records into [`SessionMetrics`] and forwards
/// every call to the application's callbacks.
pub struct MetricsCallbacks<C> {
    inner: C,
    metrics: Arc<SessionMetrics>,
}

impl<C: CameraCallbacks> MetricsCallbacks<C> {
    /// Wraps `inner`, recording into `metrics`.
    pub fn new(inner: C, metrics: Arc<SessionMetrics>) -> Self {
        Self { inner, metrics }
    }

    /// Registry being recorded into.
    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }

    /// The wrapped callbacks.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: CameraCallbacks> CameraCallbacks for MetricsCallbacks<C> {
    fn on_camera_error(&self, error: CameraError) {
        self.metrics.record_error(error);
        self.inner.on_camera_error(error);
    }

    fn on_image_capture(&self, image_file: &Path) {
        self.metrics.images_saved.inc();
        self.inner.on_image_capture(image_file);
    }

    fn on_preview_frame(&self, frame: &PreviewFrame<'_>) {
        self.inner.on_preview_frame(frame);
    }

    fn on_frame_timing(&self, timing: FrameTiming) {
        self.metrics.record_timing(timing);
        self.inner.on_frame_timing(timing);
    }
}
