//! In-process camera driver for tests and demonstrations.
//!
//! The mock behaves like a well-mannered device: stills are real JPEG
//! buffers of the negotiated picture size, delivered from a separate
//! "shutter" thread the way a hardware driver calls back.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use image::{DynamicImage, Rgb, RgbImage};

use super::{
    CameraDevice, CameraDriver, CameraParameters, DeviceError, PictureCallback, PreviewCallback,
    PreviewSurface, Size,
};
use crate::config::{CameraFacing, ImageFormat};
use crate::imaging;

/// Observable state of a [`MockDriver`], for assertions.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    /// Successful opens.
    pub opens: u32,
    /// Calls to `release` on a live handle.
    pub releases: u32,
    /// Whether a handle is currently held.
    pub device_open: bool,
    /// Whether the preview is streaming.
    pub preview_running: bool,
    /// Successful `start_preview` calls.
    pub preview_starts: u32,
    /// Parameters most recently applied with `set_parameters`.
    pub applied: Option<CameraParameters>,
    /// Accepted `set_parameters` calls.
    pub set_parameters_calls: u32,
    /// Last display orientation set, in degrees.
    pub display_orientation: Option<u32>,
    /// Surface the preview is bound to.
    pub preview_surface: Option<PreviewSurface>,
    /// Accepted `take_picture` calls.
    pub pictures_requested: u32,
    /// Captures held back because `hang_captures` is set.
    pub pending_pictures: usize,
}

struct MockState {
    probe: MockProbe,
    picture_sizes: Vec<Size>,
    preview_sizes: Vec<Size>,
    focus_modes: Vec<String>,
    current: CameraParameters,
    fail_open: bool,
    fail_preview: bool,
    hang_captures: bool,
    corrupt_captures: bool,
    preview_callback: Option<PreviewCallback>,
    pending: Vec<PictureCallback>,
}

impl MockState {
    fn capabilities(&self) -> CameraParameters {
        CameraParameters {
            supported_picture_sizes: self.picture_sizes.clone(),
            supported_preview_sizes: self.preview_sizes.clone(),
            supported_focus_modes: self.focus_modes.clone(),
            ..self.current.clone()
        }
    }
}

/// A camera driver backed by synthetic images.
///
/// Cloning yields another handle onto the same simulated hardware, so a
/// test can hand one clone to the session and keep one for inspection.
#[derive(Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Creates a driver with a typical phone-camera capability set.
    pub fn new() -> Self {
        let state = MockState {
            probe: MockProbe::default(),
            picture_sizes: vec![
                Size::new(640, 480),
                Size::new(3264, 2448),
                Size::new(1280, 960),
                Size::new(2048, 1536),
                Size::new(320, 240),
                Size::new(1600, 1200),
                Size::new(800, 600),
            ],
            preview_sizes: vec![
                Size::new(176, 144),
                Size::new(320, 240),
                Size::new(640, 480),
                Size::new(720, 480),
                Size::new(800, 480),
                Size::new(1280, 720),
                Size::new(1408, 792),
                Size::new(1920, 1080),
            ],
            focus_modes: vec!["auto".to_string(), "fixed".to_string(), "infinity".to_string()],
            current: CameraParameters::default(),
            fail_open: false,
            fail_preview: false,
            hang_captures: false,
            corrupt_captures: false,
            preview_callback: None,
            pending: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Replaces the advertised picture sizes.
    pub fn with_picture_sizes(self, sizes: Vec<Size>) -> Self {
        self.lock().picture_sizes = sizes;
        self
    }

    /// Replaces the advertised preview sizes.
    pub fn with_preview_sizes(self, sizes: Vec<Size>) -> Self {
        self.lock().preview_sizes = sizes;
        self
    }

    /// Replaces the advertised focus modes.
    pub fn with_focus_modes(self, modes: &[&str]) -> Self {
        self.lock().focus_modes = modes.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Makes subsequent opens fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Makes subsequent `start_preview` calls fail.
    pub fn set_fail_preview(&self, fail: bool) {
        self.lock().fail_preview = fail;
    }

    /// Holds still captures back until [`Self::complete_pending_pictures`].
    pub fn set_hang_captures(&self, hang: bool) {
        self.lock().hang_captures = hang;
    }

    /// Delivers bytes that do not decode as an image.
    pub fn set_corrupt_captures(&self, corrupt: bool) {
        self.lock().corrupt_captures = corrupt;
    }

    /// Returns a snapshot of the simulated hardware state.
    pub fn probe(&self) -> MockProbe {
        let state = self.lock();
        let mut probe = state.probe.clone();
        probe.pending_pictures = state.pending.len();
        probe
    }

    /// Delivers one preview tick to the installed callback, from the
    /// calling thread. Returns false if no preview is running.
    pub fn emit_preview_frame(&self, data: &[u8]) -> bool {
        let callback = {
            let mut state = self.lock();
            if !state.probe.preview_running {
                return false;
            }
            state.preview_callback.take()
        };

        let Some(mut callback) = callback else {
            return false;
        };
        callback(data);

        let mut state = self.lock();
        if state.preview_callback.is_none() {
            state.preview_callback = Some(callback);
        }
        true
    }

    /// Releases captures held back by `hang_captures`.
    pub fn complete_pending_pictures(&self) -> usize {
        let (pending, picture_size) = {
            let mut state = self.lock();
            let pending: Vec<_> = state.pending.drain(..).collect();
            (pending, state.current.picture_size)
        };
        let count = pending.len();
        for on_picture in pending {
            on_picture(synthetic_still(picture_size.unwrap_or(Size::new(64, 48))));
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the hardware state from others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver for MockDriver {
    fn open(&mut self, facing: CameraFacing) -> Result<Box<dyn CameraDevice>, DeviceError> {
        let mut state = self.lock();
        if state.fail_open {
            return Err(DeviceError::OpenFailed(format!("{} camera busy", facing)));
        }
        if state.probe.device_open {
            return Err(DeviceError::OpenFailed("camera already in use".to_string()));
        }

        state.probe.opens += 1;
        state.probe.device_open = true;
        state.current = CameraParameters::default();
        tracing::debug!(%facing, "MockDriver opened camera");

        Ok(Box::new(MockDevice {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

/// Handle returned by [`MockDriver::open`].
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
    released: bool,
}

impl MockDevice {
    fn live(&self) -> Result<MutexGuard<'_, MockState>, DeviceError> {
        if self.released {
            return Err(DeviceError::Released);
        }
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl CameraDevice for MockDevice {
    fn parameters(&self) -> CameraParameters {
        match self.live() {
            Ok(state) => state.capabilities(),
            Err(_) => CameraParameters::default(),
        }
    }

    fn set_parameters(&mut self, params: &CameraParameters) -> Result<(), DeviceError> {
        let mut state = self.live()?;
        if let Some(size) = params.picture_size {
            if !state.picture_sizes.contains(&size) {
                return Err(DeviceError::InvalidParameters(format!(
                    "unsupported picture size {}",
                    size
                )));
            }
        }
        if let Some(size) = params.preview_size {
            if !state.preview_sizes.contains(&size) {
                return Err(DeviceError::InvalidParameters(format!(
                    "unsupported preview size {}",
                    size
                )));
            }
        }
        state.current = params.clone();
        state.probe.applied = Some(params.clone());
        state.probe.set_parameters_calls += 1;
        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), DeviceError> {
        self.live()?.probe.display_orientation = Some(degrees);
        Ok(())
    }

    fn set_preview_display(&mut self, surface: &PreviewSurface) -> Result<(), DeviceError> {
        self.live()?.probe.preview_surface = Some(*surface);
        Ok(())
    }

    fn set_preview_callback(&mut self, callback: Option<PreviewCallback>) {
        if let Ok(mut state) = self.live() {
            state.preview_callback = callback;
        }
    }

    fn start_preview(&mut self) -> Result<(), DeviceError> {
        let mut state = self.live()?;
        if state.fail_preview {
            return Err(DeviceError::PreviewFailed("surface rejected".to_string()));
        }
        if state.probe.preview_surface.is_none() {
            return Err(DeviceError::PreviewFailed("no preview display".to_string()));
        }
        state.probe.preview_running = true;
        state.probe.preview_starts += 1;
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), DeviceError> {
        self.live()?.probe.preview_running = false;
        Ok(())
    }

    fn take_picture(&mut self, on_picture: PictureCallback) -> Result<(), DeviceError> {
        let mut state = self.live()?;
        if !state.probe.preview_running {
            return Err(DeviceError::CaptureFailed("preview not running".to_string()));
        }
        state.probe.pictures_requested += 1;
        // A still capture interrupts the preview until the client restarts it
        state.probe.preview_running = false;

        if state.hang_captures {
            state.pending.push(on_picture);
            return Ok(());
        }

        let corrupt = state.corrupt_captures;
        let size = state.current.picture_size.unwrap_or(Size::new(64, 48));
        drop(state);

        thread::Builder::new()
            .name("mock-shutter".to_string())
            .spawn(move || {
                let bytes = if corrupt {
                    vec![0xFF, 0xD8, 0x00, 0x01, 0x02]
                } else {
                    synthetic_still(size)
                };
                on_picture(bytes);
            })
            .map_err(|e| DeviceError::CaptureFailed(e.to_string()))?;
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.probe.releases += 1;
        state.probe.device_open = false;
        state.probe.preview_running = false;
        state.preview_callback = None;
        tracing::debug!("MockDevice released");
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.release();
    }
}

/// Encodes a gradient test pattern as JPEG.
fn synthetic_still(size: Size) -> Vec<u8> {
    let pattern = RgbImage::from_fn(size.width, size.height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    imaging::encode(&DynamicImage::ImageRgb8(pattern), ImageFormat::Jpeg).unwrap_or_default()
}
