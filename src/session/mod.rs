//! Camera session lifecycle.
//!
//! A [`CameraSession`] owns one camera handle and its preview binding:
//!
//! ```text
//! Closed --start--> Opened --on_surface_ready--> Previewing
//!                                                 |      ^
//!                                     capture_picture   completion / timeout
//!                                                 v      |
//!                                                Capturing
//! ```
//!
//! `stop` returns to `Closed` from any state. Every method is called on
//! the UI-affinity thread. Still captures are post-processed on a worker
//! thread and their outcome is posted back through the [`UiHandle`].

mod callbacks;
mod capture;
mod guard;
mod selection;

pub use callbacks::{CameraCallbacks, CameraError, FrameTiming, PreviewFrame};
pub use capture::{CancelToken, CaptureFailure, CaptureJob, CaptureOutcome};
pub use guard::{CaptureGuard, SessionState};
pub use selection::{select_picture_size, select_preview_size, sort_by_area_desc, tier_index};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::{CameraConfig, CameraFacing, ConfigError, SessionConfig};
use crate::device::{
    CameraDevice, CameraDriver, DeviceError, PictureCallback, PreviewCallback, PreviewSurface,
    Size,
};
use crate::executor::UiHandle;

/// Why [`CameraSession::capture_picture`] did not start a capture.
#[derive(Debug, Error)]
pub enum CaptureRejected {
    /// No camera handle; `CameraOpenFailed` was reported.
    #[error("no camera is open")]
    NoCamera,
    /// Preview is not ready or a capture is already in flight.
    #[error("capture is not armed")]
    NotArmed,
    /// The device refused the request; `ImageWriteFailed` was reported.
    #[error("device refused the capture: {0}")]
    Device(#[source] DeviceError),
}

/// Failure while configuring the device for preview.
#[derive(Debug, Error)]
enum SetupError {
    #[error("device reports no picture sizes")]
    NoPictureSizes,
    #[error("device reports no preview sizes")]
    NoPreviewSizes,
    #[error(transparent)]
    Device(#[from] DeviceError),
}

struct InFlight {
    generation: u64,
    cancel: CancelToken,
    started: Instant,
    // Dropping this wakes the watchdog without a timeout report
    _watchdog: Sender<()>,
}

/// State shared with worker, watchdog and posted UI tasks.
struct Shared {
    device: Mutex<Option<Box<dyn CameraDevice>>>,
    state: Mutex<SessionState>,
    guard: CaptureGuard,
    generation: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
}

impl Shared {
    fn set_state(&self, state: SessionState) {
        *lock(&self.state) = state;
    }

    fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    /// Claims the in-flight record if it still belongs to `generation`.
    fn finish(&self, generation: u64) -> Option<InFlight> {
        let mut slot = lock(&self.in_flight);
        match slot.as_ref() {
            Some(in_flight) if in_flight.generation == generation => slot.take(),
            _ => None,
        }
    }

    /// Restarts the preview after a capture and re-arms.
    fn resume_preview(&self, callbacks: &dyn CameraCallbacks) {
        let result = match lock(&self.device).as_mut() {
            Some(device) => device.start_preview(),
            // Stopped while the capture was in flight
            None => return,
        };

        match result {
            Ok(()) => {
                self.set_state(SessionState::Previewing);
                self.guard.arm();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to restart preview after capture");
                self.set_state(SessionState::Closed);
                callbacks.on_camera_error(CameraError::CameraOpenFailed);
            }
        }
    }
}

/// A single camera device and its preview surface binding.
pub struct CameraSession<D: CameraDriver> {
    driver: D,
    callbacks: Arc<dyn CameraCallbacks>,
    ui: UiHandle,
    settings: SessionConfig,
    config: Option<Arc<CameraConfig>>,
    surface: Option<PreviewSurface>,
    shared: Arc<Shared>,
}

impl<D: CameraDriver> CameraSession<D> {
    /// Creates a closed session.
    ///
    /// Fails if `settings` does not validate.
    pub fn new(
        driver: D,
        callbacks: Arc<dyn CameraCallbacks>,
        ui: UiHandle,
        settings: SessionConfig,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            driver,
            callbacks,
            ui,
            settings,
            config: None,
            surface: None,
            shared: Arc::new(Shared {
                device: Mutex::new(None),
                state: Mutex::new(SessionState::Closed),
                guard: CaptureGuard::new(),
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
            }),
        })
    }

    /// Acquires the configured camera, releasing any handle held before.
    ///
    /// Reports `CameraOpenFailed` if the camera cannot be acquired. If a
    /// surface is already attached the preview is configured right away.
    pub fn start(&mut self, config: CameraConfig) {
        let facing = config.facing();
        self.config = Some(Arc::new(config));

        if let Err(e) = self.open(facing) {
            tracing::error!(%facing, error = %e, "Failed to open camera");
            self.callbacks.on_camera_error(CameraError::CameraOpenFailed);
            return;
        }

        self.shared.set_state(SessionState::Opened);
        tracing::info!(%facing, "Camera opened");

        if let Some(surface) = self.surface {
            self.on_surface_ready(Some(&surface));
        }
    }

    /// Called by the view lifecycle once the output surface is attached.
    ///
    /// Negotiates picture size, preview size and focus mode with the
    /// device, binds the surface and starts the preview.
    pub fn on_surface_ready(&mut self, surface: Option<&PreviewSurface>) {
        let Some(surface) = surface else {
            tracing::warn!("Surface ready without a surface");
            self.callbacks.on_camera_error(CameraError::CameraOpenFailed);
            return;
        };
        self.surface = Some(*surface);

        let mut slot = lock(&self.shared.device);
        let result = match (slot.as_mut(), self.config.as_deref()) {
            (Some(device), Some(config)) => Some(configure_preview(
                &mut **device,
                config,
                &self.settings,
                surface,
                &self.callbacks,
            )),
            _ => None,
        };
        drop(slot);

        match result {
            None => {
                tracing::warn!("Surface ready before the camera was opened");
                self.callbacks.on_camera_error(CameraError::CameraOpenFailed);
            }
            Some(Ok(preview_size)) => {
                if lock(&self.shared.in_flight).is_some() {
                    // Completion or the watchdog re-arms
                    self.shared.set_state(SessionState::Capturing);
                } else {
                    self.shared.set_state(SessionState::Previewing);
                    self.shared.guard.arm();
                }
                tracing::info!(
                    preview = %preview_size,
                    surface_width = surface.width,
                    surface_height = surface.height,
                    "Preview started"
                );
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Failed to start preview");
                self.shared.guard.disarm();
                self.shared.set_state(SessionState::Closed);
                self.callbacks.on_camera_error(CameraError::CameraOpenFailed);
            }
        }
    }

    /// Called by the view lifecycle when the surface goes away.
    ///
    /// Stops the preview but keeps the camera handle.
    pub fn on_surface_destroyed(&mut self) {
        self.surface = None;

        if let Some(device) = lock(&self.shared.device).as_mut() {
            if let Err(e) = device.stop_preview() {
                tracing::debug!(error = %e, "Stop preview on surface teardown");
            }
            if self.shared.state() == SessionState::Previewing {
                self.shared.set_state(SessionState::Opened);
            }
        }
    }

    /// Stops the preview and releases the camera.
    ///
    /// Safe to call at any time. When it returns no handle is held and any
    /// in-flight capture has been cancelled without a callback.
    pub fn stop(&mut self) {
        self.shared.guard.disarm();

        if let Some(in_flight) = lock(&self.shared.in_flight).take() {
            in_flight.cancel.cancel();
            tracing::debug!(generation = in_flight.generation, "Cancelled in-flight capture");
        }
        self.shared.generation.fetch_add(1, Ordering::AcqRel);

        if let Some(mut device) = lock(&self.shared.device).take() {
            // Errors here only mean the device was already idle
            let _ = device.stop_preview();
            device.set_preview_callback(None);
            device.release();
            tracing::info!("Camera released");
        }
        self.shared.set_state(SessionState::Closed);
    }

    /// Whether a new capture may begin. Advisory only;
    /// [`Self::capture_picture`] is the authoritative check.
    pub fn is_capture_armed(&self) -> bool {
        self.shared.guard.is_armed()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Whether a camera handle is held.
    pub fn has_camera(&self) -> bool {
        lock(&self.shared.device).is_some()
    }

    /// Configuration passed to the most recent [`Self::start`].
    pub fn config(&self) -> Option<&CameraConfig> {
        self.config.as_deref()
    }

    /// Requests a single still capture.
    ///
    /// The outcome is delivered later, on the UI-affinity thread, as
    /// either `on_image_capture` or `on_camera_error(ImageWriteFailed)`.
    pub fn capture_picture(&mut self) -> Result<(), CaptureRejected> {
        let mut slot = lock(&self.shared.device);

        let (Some(device), Some(config)) = (slot.as_mut(), self.config.clone()) else {
            drop(slot);
            tracing::warn!("Capture requested without an open camera");
            self.callbacks.on_camera_error(CameraError::CameraOpenFailed);
            // Nothing was attempted
            self.shared.guard.arm();
            return Err(CaptureRejected::NoCamera);
        };

        if !self.shared.guard.try_begin() {
            tracing::debug!(state = %self.shared.state(), "Capture rejected, not armed");
            return Err(CaptureRejected::NotArmed);
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let cancel = CancelToken::new();
        let (watchdog_tx, watchdog_rx) = mpsc::channel::<()>();

        *lock(&self.shared.in_flight) = Some(InFlight {
            generation,
            cancel: cancel.clone(),
            started: Instant::now(),
            _watchdog: watchdog_tx,
        });
        self.shared.set_state(SessionState::Capturing);

        let on_picture = completion_handler(
            Arc::clone(&self.shared),
            Arc::clone(&self.callbacks),
            self.ui.clone(),
            config,
            generation,
            cancel,
        );

        if let Err(e) = device.take_picture(on_picture) {
            drop(slot);
            tracing::error!(error = %e, "Device refused still capture");
            if self.shared.finish(generation).is_some() {
                self.callbacks.on_camera_error(CameraError::ImageWriteFailed);
                self.shared.resume_preview(self.callbacks.as_ref());
            }
            return Err(CaptureRejected::Device(e));
        }
        drop(slot);

        spawn_watchdog(
            Arc::clone(&self.shared),
            Arc::clone(&self.callbacks),
            self.ui.clone(),
            generation,
            watchdog_rx,
            self.settings.capture_timeout(),
        );

        tracing::debug!(generation, "Still capture requested");
        Ok(())
    }

    /// Stops any existing session, then opens the camera.
    fn open(&mut self, facing: CameraFacing) -> Result<(), DeviceError> {
        self.stop();
        let device = self.driver.open(facing)?;
        *lock(&self.shared.device) = Some(device);
        Ok(())
    }
}

impl<D: CameraDriver> Drop for CameraSession<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Applies negotiated parameters, binds the surface and starts preview.
fn configure_preview(
    device: &mut dyn CameraDevice,
    config: &CameraConfig,
    settings: &SessionConfig,
    surface: &PreviewSurface,
    callbacks: &Arc<dyn CameraCallbacks>,
) -> Result<Size, SetupError> {
    // Stopping a preview that never ran is not a failure
    let _ = device.stop_preview();

    let mut params = device.parameters();

    let picture = select_picture_size(&params.supported_picture_sizes, config.resolution())
        .ok_or(SetupError::NoPictureSizes)?;
    let preview = select_preview_size(&params.supported_preview_sizes, settings.preview_target())
        .ok_or(SetupError::NoPreviewSizes)?;

    params.picture_size = Some(picture);
    params.preview_size = Some(preview);
    params.recording_hint = settings.recording_hint;

    if params.supports_focus_mode(config.focus_mode()) {
        params.focus_mode = Some(config.focus_mode().to_string());
    } else {
        tracing::debug!(focus_mode = config.focus_mode(), "Focus mode unsupported, skipped");
    }

    tracing::debug!(
        resolution = %config.resolution(),
        picture = %picture,
        preview = %preview,
        "Negotiated camera parameters"
    );

    device.set_parameters(&params)?;
    device.set_display_orientation(settings.display_orientation)?;
    device.set_preview_display(surface)?;
    device.set_preview_callback(Some(frame_forwarder(
        Arc::clone(callbacks),
        config.facing(),
        preview,
    )));
    device.start_preview()?;

    Ok(preview)
}

/// Builds the per-tick preview callback.
///
/// Frame counting lives in the closure, so it is scoped to one preview
/// binding rather than the process.
fn frame_forwarder(
    callbacks: Arc<dyn CameraCallbacks>,
    facing: CameraFacing,
    size: Size,
) -> PreviewCallback {
    let mut sequence = 0u64;
    let mut last_tick: Option<Instant> = None;

    Box::new(move |data: &[u8]| {
        sequence += 1;
        let now = Instant::now();
        let interval = last_tick.map(|t| now.duration_since(t));
        last_tick = Some(now);

        callbacks.on_preview_frame(&PreviewFrame {
            data,
            facing,
            size,
            sequence,
        });
        callbacks.on_frame_timing(FrameTiming { sequence, interval });

        tracing::trace!(sequence, bytes = data.len(), "Preview frame");
    })
}

/// Builds the driver's picture callback: spawn the capture job, then post
/// its outcome to the UI thread.
fn completion_handler(
    shared: Arc<Shared>,
    callbacks: Arc<dyn CameraCallbacks>,
    ui: UiHandle,
    config: Arc<CameraConfig>,
    generation: u64,
    cancel: CancelToken,
) -> PictureCallback {
    Box::new(move |bytes: Vec<u8>| {
        let job = CaptureJob::new(bytes, &config, cancel);

        let (job_shared, job_callbacks, job_ui) =
            (Arc::clone(&shared), Arc::clone(&callbacks), ui.clone());
        let spawned = job.spawn(move |outcome| {
            post_outcome(&job_ui, job_shared, job_callbacks, generation, outcome);
        });

        if let Err(e) = spawned {
            tracing::error!(error = %e, "Failed to spawn capture worker");
            let outcome = Err(CaptureFailure::Write(crate::imaging::ImagingError::Io {
                path: config.image_file().to_path_buf(),
                source: e,
            }));
            post_outcome(&ui, shared, callbacks, generation, outcome);
        }
    })
}

fn post_outcome(
    ui: &UiHandle,
    shared: Arc<Shared>,
    callbacks: Arc<dyn CameraCallbacks>,
    generation: u64,
    outcome: CaptureOutcome,
) {
    let posted = ui.post(move || complete_capture(&shared, callbacks.as_ref(), generation, outcome));
    if !posted {
        tracing::error!(generation, "UI loop gone, capture outcome dropped");
    }
}

/// Runs on the UI thread once a capture job finishes.
fn complete_capture(
    shared: &Shared,
    callbacks: &dyn CameraCallbacks,
    generation: u64,
    outcome: CaptureOutcome,
) {
    let Some(in_flight) = shared.finish(generation) else {
        tracing::debug!(generation, "Dropping outcome of superseded capture");
        return;
    };
    let elapsed_ms = in_flight.started.elapsed().as_millis() as u64;

    match outcome {
        Ok(path) => {
            tracing::info!(path = %path.display(), elapsed_ms, "Image captured");
            callbacks.on_image_capture(&path);
        }
        Err(CaptureFailure::Cancelled) => {
            tracing::debug!(generation, "Capture cancelled");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, elapsed_ms, "Image write failed");
            callbacks.on_camera_error(CameraError::ImageWriteFailed);
        }
    }

    shared.resume_preview(callbacks);
}

/// Waits for the capture to finish; on timeout posts a forced re-arm.
fn spawn_watchdog(
    shared: Arc<Shared>,
    callbacks: Arc<dyn CameraCallbacks>,
    ui: UiHandle,
    generation: u64,
    done: mpsc::Receiver<()>,
    timeout: Duration,
) {
    let spawned = thread::Builder::new()
        .name("capture-watchdog".to_string())
        .spawn(move || {
            if done.recv_timeout(timeout) != Err(RecvTimeoutError::Timeout) {
                return;
            }
            ui.post(move || {
                let Some(in_flight) = shared.finish(generation) else {
                    return;
                };
                in_flight.cancel.cancel();
                tracing::warn!(
                    generation,
                    timeout_ms = timeout.as_millis() as u64,
                    "Still capture timed out"
                );
                callbacks.on_camera_error(CameraError::CaptureTimedOut);
                shared.resume_preview(callbacks.as_ref());
            });
        });

    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Capture watchdog unavailable");
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraResolution, CameraRotation, ImageFormat};
    use crate::device::MockDriver;
    use crate::executor::UiLoop;
    use image::GenericImageView;
    use std::path::{Path, PathBuf};
    use std::thread::ThreadId;

    const WAIT: Duration = Duration::from_secs(10);

    #[derive(Default)]
    struct Recorder {
        errors: Mutex<Vec<(CameraError, ThreadId)>>,
        images: Mutex<Vec<(PathBuf, ThreadId)>>,
        frames: Mutex<Vec<(usize, u64, Size, ThreadId)>>,
        timings: Mutex<Vec<FrameTiming>>,
    }

    impl Recorder {
        fn errors(&self) -> Vec<CameraError> {
            self.errors.lock().unwrap().iter().map(|(e, _)| *e).collect()
        }

        fn images(&self) -> Vec<PathBuf> {
            self.images.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
        }
    }

    impl CameraCallbacks for Recorder {
        fn on_camera_error(&self, error: CameraError) {
            self.errors
                .lock()
                .unwrap()
                .push((error, thread::current().id()));
        }

        fn on_image_capture(&self, image_file: &Path) {
            self.images
                .lock()
                .unwrap()
                .push((image_file.to_path_buf(), thread::current().id()));
        }

        fn on_preview_frame(&self, frame: &PreviewFrame<'_>) {
            self.frames.lock().unwrap().push((
                frame.data.len(),
                frame.sequence,
                frame.size,
                thread::current().id(),
            ));
        }

        fn on_frame_timing(&self, timing: FrameTiming) {
            self.timings.lock().unwrap().push(timing);
        }
    }

    struct Harness {
        ui: UiLoop,
        session: CameraSession<MockDriver>,
        driver: MockDriver,
        recorder: Arc<Recorder>,
    }

    fn small_driver() -> MockDriver {
        MockDriver::new().with_picture_sizes(vec![
            Size::new(32, 24),
            Size::new(64, 48),
            Size::new(16, 12),
        ])
    }

    fn harness_with(driver: MockDriver, settings: SessionConfig) -> Harness {
        let (ui, handle) = UiLoop::new();
        let recorder = Arc::new(Recorder::default());
        let session =
            CameraSession::new(driver.clone(), recorder.clone(), handle, settings).unwrap();
        Harness {
            ui,
            session,
            driver,
            recorder,
        }
    }

    fn harness() -> Harness {
        harness_with(small_driver(), SessionConfig::default())
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "hidden-camera-session-{}-{}",
            std::process::id(),
            name
        ))
    }

    fn config(name: &str) -> CameraConfig {
        CameraConfig::builder()
            .facing(CameraFacing::Back)
            .resolution(CameraResolution::Medium)
            .focus_mode("auto")
            .image_file(temp_file(name))
            .build()
            .unwrap()
    }

    fn surface() -> PreviewSurface {
        PreviewSurface::new(1, 1)
    }

    fn previewing(name: &str) -> Harness {
        let mut h = harness();
        h.session.start(config(name));
        h.session.on_surface_ready(Some(&surface()));
        assert_eq!(h.session.state(), SessionState::Previewing);
        h
    }

    #[test]
    fn test_stop_without_camera_is_noop() {
        let mut h = harness();
        h.session.stop();
        h.session.stop();

        assert!(!h.session.has_camera());
        assert_eq!(h.session.state(), SessionState::Closed);
        assert_eq!(h.driver.probe().releases, 0);
        assert!(h.recorder.errors().is_empty());
    }

    #[test]
    fn test_stop_clears_handle_from_every_state() {
        let mut h = harness();

        h.session.start(config("stop-opened.jpg"));
        assert!(h.session.has_camera());
        h.session.stop();
        assert!(!h.session.has_camera());

        h.session.start(config("stop-previewing.jpg"));
        h.session.on_surface_ready(Some(&surface()));
        h.session.stop();
        assert!(!h.session.has_camera());
        assert!(!h.session.is_capture_armed());

        let probe = h.driver.probe();
        assert_eq!(probe.opens, 2);
        assert_eq!(probe.releases, 2);
        assert!(!probe.device_open);
    }

    #[test]
    fn test_start_releases_previous_handle() {
        let mut h = harness();
        h.session.start(config("restart-a.jpg"));
        h.session.start(config("restart-b.jpg"));

        let probe = h.driver.probe();
        assert_eq!(probe.opens, 2);
        assert_eq!(probe.releases, 1);
        assert_eq!(h.session.state(), SessionState::Opened);
        assert!(h.recorder.errors().is_empty());
    }

    #[test]
    fn test_start_failure_reports_open_failed() {
        let mut h = harness();
        h.driver.set_fail_open(true);

        h.session.start(config("open-fail.jpg"));

        assert_eq!(h.recorder.errors(), vec![CameraError::CameraOpenFailed]);
        assert!(!h.session.has_camera());
        assert_eq!(h.session.state(), SessionState::Closed);
    }

    #[test]
    fn test_surface_ready_without_camera() {
        let mut h = harness();
        h.session.on_surface_ready(Some(&surface()));

        assert_eq!(h.recorder.errors(), vec![CameraError::CameraOpenFailed]);
        assert_eq!(h.driver.probe().set_parameters_calls, 0);
    }

    #[test]
    fn test_surface_ready_without_surface() {
        let mut h = harness();
        h.session.start(config("no-surface.jpg"));
        h.session.on_surface_ready(None);

        assert_eq!(h.recorder.errors(), vec![CameraError::CameraOpenFailed]);
        let probe = h.driver.probe();
        assert_eq!(probe.set_parameters_calls, 0);
        assert!(!probe.preview_running);
    }

    #[test]
    fn test_surface_ready_negotiates_parameters() {
        let h = previewing("negotiate.jpg");

        let probe = h.driver.probe();
        let applied = probe.applied.unwrap();
        assert_eq!(applied.picture_size, Some(Size::new(32, 24)));
        assert_eq!(applied.preview_size, Some(Size::new(1280, 720)));
        assert_eq!(applied.focus_mode.as_deref(), Some("auto"));
        assert!(applied.recording_hint);
        assert_eq!(probe.display_orientation, Some(90));
        assert_eq!(probe.preview_surface, Some(surface()));
        assert!(probe.preview_running);
        assert!(h.session.is_capture_armed());
        assert!(h.recorder.errors().is_empty());
    }

    #[test]
    fn test_unsupported_focus_mode_is_skipped() {
        let mut h = harness();
        let config = CameraConfig::builder()
            .facing(CameraFacing::Back)
            .focus_mode("macro")
            .image_file(temp_file("focus.jpg"))
            .build()
            .unwrap();

        h.session.start(config);
        h.session.on_surface_ready(Some(&surface()));

        let applied = h.driver.probe().applied.unwrap();
        assert_eq!(applied.focus_mode, None);
        assert_eq!(h.session.state(), SessionState::Previewing);
        assert!(h.recorder.errors().is_empty());
    }

    #[test]
    fn test_short_preview_list_still_negotiates() {
        let driver = small_driver().with_preview_sizes(vec![Size::new(320, 240), Size::new(176, 144)]);
        let mut h = harness_with(driver, SessionConfig::default());

        h.session.start(config("short-list.jpg"));
        h.session.on_surface_ready(Some(&surface()));

        let applied = h.driver.probe().applied.unwrap();
        assert_eq!(applied.preview_size, Some(Size::new(320, 240)));
        assert!(h.session.is_capture_armed());
    }

    #[test]
    fn test_empty_size_list_reports_open_failed() {
        let driver = small_driver().with_preview_sizes(Vec::new());
        let mut h = harness_with(driver, SessionConfig::default());

        h.session.start(config("empty-list.jpg"));
        h.session.on_surface_ready(Some(&surface()));

        assert_eq!(h.recorder.errors(), vec![CameraError::CameraOpenFailed]);
        assert_eq!(h.driver.probe().set_parameters_calls, 0);
        assert!(!h.session.is_capture_armed());
    }

    #[test]
    fn test_preview_failure_leaves_capture_disarmed() {
        let mut h = harness();
        h.driver.set_fail_preview(true);

        h.session.start(config("preview-fail.jpg"));
        h.session.on_surface_ready(Some(&surface()));

        assert_eq!(h.recorder.errors(), vec![CameraError::CameraOpenFailed]);
        assert_eq!(h.session.state(), SessionState::Closed);
        assert!(!h.session.is_capture_armed());
        assert!(matches!(
            h.session.capture_picture(),
            Err(CaptureRejected::NotArmed)
        ));

        // The next successful surface cycle recovers
        h.driver.set_fail_preview(false);
        h.session.on_surface_ready(Some(&surface()));
        assert!(h.session.is_capture_armed());
        assert_eq!(h.recorder.errors().len(), 1);
    }

    #[test]
    fn test_surface_destroyed_keeps_handle() {
        let mut h = previewing("destroyed.jpg");
        h.session.on_surface_destroyed();

        let probe = h.driver.probe();
        assert!(!probe.preview_running);
        assert!(probe.device_open);
        assert_eq!(probe.releases, 0);
        assert_eq!(h.session.state(), SessionState::Opened);
    }

    #[test]
    fn test_restart_with_attached_surface_configures_immediately() {
        let mut h = previewing("refresh.jpg");
        h.session.stop();
        h.session.start(config("refresh.jpg"));

        assert_eq!(h.session.state(), SessionState::Previewing);
        assert!(h.session.is_capture_armed());
        assert_eq!(h.driver.probe().preview_starts, 2);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let (_ui, handle) = UiLoop::new();
        let settings = SessionConfig {
            capture_timeout_ms: 0,
            ..Default::default()
        };
        let result = CameraSession::new(
            small_driver(),
            Arc::new(Recorder::default()),
            handle.clone(),
            settings,
        );
        assert!(matches!(result, Err(ConfigError::InvalidTimeout)));

        let settings = SessionConfig {
            display_orientation: 45,
            ..Default::default()
        };
        let result = CameraSession::new(small_driver(), Arc::new(Recorder::default()), handle, settings);
        assert!(matches!(result, Err(ConfigError::InvalidOrientation(45))));
    }

    #[test]
    fn test_surface_cycle_during_capture_keeps_single_capture() {
        let mut h = previewing("surface-cycle.jpg");
        let recorder = Arc::clone(&h.recorder);
        h.driver.set_hang_captures(true);

        h.session.capture_picture().unwrap();
        h.session.on_surface_destroyed();
        h.session.on_surface_ready(Some(&surface()));

        assert!(!h.session.is_capture_armed());
        assert_eq!(h.session.state(), SessionState::Capturing);
        assert!(matches!(
            h.session.capture_picture(),
            Err(CaptureRejected::NotArmed)
        ));
        assert_eq!(h.driver.probe().pending_pictures, 1);

        assert_eq!(h.driver.complete_pending_pictures(), 1);
        assert!(h.ui.run_until(|| !recorder.images().is_empty(), WAIT));

        assert_eq!(h.recorder.images(), vec![temp_file("surface-cycle.jpg")]);
        assert!(h.recorder.errors().is_empty());
        assert!(h.session.is_capture_armed());
        assert_eq!(h.session.state(), SessionState::Previewing);
        std::fs::remove_file(temp_file("surface-cycle.jpg")).unwrap();
    }

    #[test]
    fn test_capture_without_camera_rearms() {
        let mut h = harness();

        assert!(matches!(
            h.session.capture_picture(),
            Err(CaptureRejected::NoCamera)
        ));
        assert_eq!(h.recorder.errors(), vec![CameraError::CameraOpenFailed]);
        assert!(h.session.is_capture_armed());
    }

    #[test]
    fn test_capture_delivers_on_ui_thread() {
        let mut h = previewing("capture.jpg");
        let recorder = Arc::clone(&h.recorder);

        h.session.capture_picture().unwrap();
        assert_eq!(h.session.state(), SessionState::Capturing);
        assert!(!h.session.is_capture_armed());

        assert!(h.ui.run_until(|| !recorder.images().is_empty(), WAIT));

        let images = h.recorder.images.lock().unwrap().clone();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].0, temp_file("capture.jpg"));
        assert_eq!(images[0].1, thread::current().id());

        assert!(h.recorder.errors().is_empty());
        assert!(h.session.is_capture_armed());
        assert_eq!(h.session.state(), SessionState::Previewing);
        assert!(h.driver.probe().preview_running);

        let written = crate::imaging::decode(&std::fs::read(&images[0].0).unwrap()).unwrap();
        assert_eq!(written.dimensions(), (32, 24));
        std::fs::remove_file(&images[0].0).unwrap();
    }

    #[test]
    fn test_second_capture_in_flight_is_rejected() {
        let mut h = previewing("busy.jpg");
        h.driver.set_hang_captures(true);

        h.session.capture_picture().unwrap();
        assert!(matches!(
            h.session.capture_picture(),
            Err(CaptureRejected::NotArmed)
        ));
        assert_eq!(h.driver.probe().pictures_requested, 1);
    }

    #[test]
    fn test_write_failure_reports_and_resumes_preview() {
        let mut h = harness();
        let recorder = Arc::clone(&h.recorder);
        let path = temp_file("no-such-dir").join("capture.jpg");
        let config = CameraConfig::builder()
            .facing(CameraFacing::Back)
            .image_file(&path)
            .build()
            .unwrap();

        h.session.start(config);
        h.session.on_surface_ready(Some(&surface()));
        h.session.capture_picture().unwrap();

        assert!(h.ui.run_until(|| !recorder.errors().is_empty(), WAIT));
        h.ui.run_pending();

        assert_eq!(h.recorder.errors(), vec![CameraError::ImageWriteFailed]);
        assert!(h.recorder.images().is_empty());
        assert!(h.driver.probe().preview_running);
        assert!(h.session.is_capture_armed());
        assert!(!path.exists());
    }

    #[test]
    fn test_undecodable_capture_reports_write_failure() {
        let mut h = previewing("corrupt.jpg");
        let recorder = Arc::clone(&h.recorder);
        h.driver.set_corrupt_captures(true);

        h.session.capture_picture().unwrap();
        assert!(h.ui.run_until(|| !recorder.errors().is_empty(), WAIT));

        assert_eq!(h.recorder.errors(), vec![CameraError::ImageWriteFailed]);
        assert!(h.session.is_capture_armed());
    }

    #[test]
    fn test_watchdog_rearms_and_drops_late_completion() {
        let settings = SessionConfig {
            capture_timeout_ms: 50,
            ..Default::default()
        };
        let mut h = harness_with(small_driver(), settings);
        let recorder = Arc::clone(&h.recorder);
        h.session.start(config("late.jpg"));
        h.session.on_surface_ready(Some(&surface()));
        h.driver.set_hang_captures(true);

        h.session.capture_picture().unwrap();
        assert!(h.ui.run_until(|| !recorder.errors().is_empty(), WAIT));

        assert_eq!(h.recorder.errors(), vec![CameraError::CaptureTimedOut]);
        assert!(h.session.is_capture_armed());
        assert_eq!(h.session.state(), SessionState::Previewing);
        assert!(h.driver.probe().preview_running);

        // The driver finally answers; nothing is delivered or written
        assert_eq!(h.driver.complete_pending_pictures(), 1);
        h.ui.run_for(Duration::from_millis(200));
        assert!(h.recorder.images().is_empty());
        assert_eq!(h.recorder.errors().len(), 1);
        assert!(!temp_file("late.jpg").exists());
    }

    #[test]
    fn test_stop_cancels_in_flight_capture() {
        let mut h = previewing("cancelled.jpg");
        h.driver.set_hang_captures(true);

        h.session.capture_picture().unwrap();
        h.session.stop();
        assert!(!h.session.has_camera());

        h.driver.complete_pending_pictures();
        h.ui.run_for(Duration::from_millis(200));

        assert!(h.recorder.images().is_empty());
        assert!(h.recorder.errors().is_empty());
        assert!(!temp_file("cancelled.jpg").exists());
    }

    #[test]
    fn test_preview_frames_forwarded_from_driver_thread() {
        let h = previewing("frames.jpg");
        let driver = h.driver.clone();

        thread::spawn(move || {
            assert!(driver.emit_preview_frame(&[1, 2, 3]));
            assert!(driver.emit_preview_frame(&[4, 5, 6, 7]));
        })
        .join()
        .unwrap();

        let frames = h.recorder.frames.lock().unwrap().clone();
        assert_eq!(frames.len(), 2);
        assert_eq!((frames[0].0, frames[0].1), (3, 1));
        assert_eq!((frames[1].0, frames[1].1), (4, 2));
        assert_eq!(frames[0].2, Size::new(1280, 720));
        assert_ne!(frames[0].3, thread::current().id());

        let timings = h.recorder.timings.lock().unwrap().clone();
        assert_eq!(timings.len(), 2);
        assert!(timings[0].interval.is_none());
        assert!(timings[1].interval.is_some());
    }

    #[test]
    fn test_end_to_end_medium_back_camera() {
        let mut h = harness();
        let recorder = Arc::clone(&h.recorder);
        let path = temp_file("e2e.jpg");
        let config = CameraConfig::builder()
            .facing(CameraFacing::Back)
            .resolution(CameraResolution::Medium)
            .image_rotation(CameraRotation::Rotation0)
            .image_format(ImageFormat::Jpeg)
            .focus_mode("continuous-picture")
            .image_file(&path)
            .build()
            .unwrap();

        h.session.start(config);
        assert_eq!(h.session.state(), SessionState::Opened);

        h.session.on_surface_ready(Some(&surface()));
        assert_eq!(h.driver.probe().applied.unwrap().focus_mode, None);
        assert!(h.recorder.errors().is_empty());

        h.session.capture_picture().unwrap();
        assert!(h.ui.run_until(|| !recorder.images().is_empty(), WAIT));

        assert_eq!(h.recorder.images(), vec![path.clone()]);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        std::fs::remove_file(&path).unwrap();
    }
}
