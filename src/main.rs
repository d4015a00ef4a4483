//! Hidden Camera CLI
//!
//! Runs a headless capture session against the in-process mock driver
//! and prints the path of every image it saves.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use hidden_camera::{
    config::default_image_file,
    metrics::{MetricsCallbacks, SessionMetrics},
    CameraCallbacks, CameraConfig, CameraError, CameraFacing, CameraResolution, CameraRotation,
    CameraSession, ConfigError, FileConfig, ImageFormat, MockDriver, PreviewFrame,
    PreviewSurface, SessionConfig, SessionState, UiLoop,
};
use tracing::{info, warn};

/// Mock preview tick rate.
const PREVIEW_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Parser)]
#[command(name = "hidden-camera", version, about = "Headless still capture")]
struct Cli {
    /// TOML file with [camera] and [session] tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// back or front
    #[arg(long)]
    facing: Option<CameraFacing>,

    /// high, medium or low
    #[arg(long)]
    resolution: Option<CameraResolution>,

    /// 0, 90, 180 or 270
    #[arg(long)]
    rotation: Option<CameraRotation>,

    #[arg(long)]
    focus_mode: Option<String>,

    /// jpeg or png
    #[arg(long)]
    format: Option<ImageFormat>,

    /// Output file, or a directory to get one timestamped file per capture
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of stills to take
    #[arg(short = 'n', long, default_value_t = 1)]
    captures: u32,

    /// Keep capturing at this interval until Ctrl-C
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    print_metrics: bool,

    /// Serve Prometheus metrics on this port while running
    /// (requires the `metrics` feature)
    #[arg(long)]
    metrics_port: Option<u16>,
}

/// Prints saved paths and counts reported errors.
#[derive(Default)]
struct Reporter {
    errors: AtomicU64,
}

impl CameraCallbacks for Reporter {
    fn on_camera_error(&self, error: CameraError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!(%error, "Camera error");
    }

    fn on_image_capture(&self, image_file: &Path) {
        println!("{}", image_file.display());
    }

    fn on_preview_frame(&self, _frame: &PreviewFrame<'_>) {}
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Hidden Camera v{}", hidden_camera::VERSION);

    let cli = Cli::parse();
    let (camera, settings) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    let output_dir = cli.output.as_ref().filter(|p| p.is_dir()).cloned();

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!(error = %e, "Ctrl-C handler unavailable");
        }
    }

    let metrics = match SessionMetrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = cli.metrics_port {
        spawn_metrics_server(port, Arc::clone(&metrics));
    }

    let callbacks = Arc::new(MetricsCallbacks::new(Reporter::default(), Arc::clone(&metrics)));
    let driver = MockDriver::new();
    let (mut ui, handle) = UiLoop::new();
    let mut session =
        match CameraSession::new(driver.clone(), callbacks.clone(), handle, settings.clone()) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("Invalid session configuration: {}", e);
                std::process::exit(2);
            }
        };

    info!(
        facing = %camera.facing(),
        resolution = %camera.resolution(),
        output = %camera.image_file().display(),
        "Starting session"
    );
    session.start(camera.clone());
    session.on_surface_ready(Some(&PreviewSurface::new(1, 1)));

    let preview = spawn_preview_ticks(driver, settings.preview_target().area(), Arc::clone(&running));

    let continuous = cli.interval_ms.map(Duration::from_millis);
    let wait = settings.capture_timeout() + Duration::from_secs(1);
    let mut taken = 0u32;

    while running.load(Ordering::SeqCst) && (continuous.is_some() || taken < cli.captures) {
        if let Some(dir) = &output_dir {
            if taken > 0 {
                // A new file means a new session configuration
                match camera
                    .to_builder()
                    .image_file(default_image_file(dir, camera.image_format()))
                    .build()
                {
                    Ok(next) => session.start(next),
                    Err(e) => {
                        warn!(error = %e, "Cannot build next capture configuration");
                        break;
                    }
                }
            }
        }

        match session.capture_picture() {
            Ok(()) => {
                metrics.record_capture_requested();
                ui.run_until(|| session.state() != SessionState::Capturing, wait);
            }
            Err(e) => warn!(error = %e, "Capture not started"),
        }
        taken += 1;

        if session.state() == SessionState::Closed {
            break;
        }
        if let Some(interval) = continuous {
            ui.run_for(interval);
        }
    }

    running.store(false, Ordering::SeqCst);
    session.stop();
    if preview.and_then(|h| h.join().ok()).is_none() {
        warn!("Preview ticker did not shut down cleanly");
    }

    let snapshot = metrics.snapshot();
    info!(
        requested = snapshot.captures_requested,
        saved = snapshot.images_saved,
        frames = snapshot.preview_frames,
        "Done"
    );

    if cli.print_metrics {
        match metrics.encode() {
            Ok(text) => print!("{}", text),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
    }

    if callbacks.inner().errors.load(Ordering::Relaxed) > 0 {
        std::process::exit(1);
    }
}

/// Merges the optional config file with command-line overrides.
fn load_config(cli: &Cli) -> Result<(CameraConfig, SessionConfig), ConfigError> {
    let (mut builder, settings) = match &cli.config {
        Some(path) => {
            let file = FileConfig::from_file(path)?;
            (file.camera.to_builder(), file.session)
        }
        None => (CameraConfig::builder(), SessionConfig::default()),
    };

    if let Some(facing) = cli.facing {
        builder = builder.facing(facing);
    }
    if let Some(resolution) = cli.resolution {
        builder = builder.resolution(resolution);
    }
    if let Some(rotation) = cli.rotation {
        builder = builder.image_rotation(rotation);
    }
    if let Some(focus_mode) = &cli.focus_mode {
        builder = builder.focus_mode(focus_mode.clone());
    }
    if let Some(format) = cli.format {
        builder = builder.image_format(format);
    }
    let mut camera = match &cli.output {
        Some(output) if !output.is_dir() => builder.image_file(output.clone()).build()?,
        _ => builder.build()?,
    };
    if let Some(dir) = cli.output.as_ref().filter(|p| p.is_dir()) {
        // Name the file only once the format is settled
        camera = camera
            .to_builder()
            .image_file(default_image_file(dir, camera.image_format()))
            .build()?;
    }

    settings.validate()?;
    Ok((camera, settings))
}

/// Feeds blank NV21-sized preview buffers to the mock driver.
fn spawn_preview_ticks(
    driver: MockDriver,
    pixels: u64,
    running: Arc<AtomicBool>,
) -> Option<thread::JoinHandle<()>> {
    let frame = vec![0u8; (pixels * 3 / 2) as usize];
    let spawned = thread::Builder::new()
        .name("mock-preview".to_string())
        .spawn(move || {
            while running.load(Ordering::SeqCst) {
                driver.emit_preview_frame(&frame);
                thread::sleep(PREVIEW_INTERVAL);
            }
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Preview ticker unavailable");
            None
        }
    }
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(port: u16, metrics: Arc<SessionMetrics>) {
    use hidden_camera::metrics::{MetricsServer, MetricsServerConfig};

    let spawned = thread::Builder::new()
        .name("metrics-server".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "Failed to start metrics runtime");
                    return;
                }
            };
            let server = MetricsServer::new(MetricsServerConfig::with_port(port), metrics);
            if let Err(e) = runtime.block_on(server.run()) {
                warn!(error = %e, "Metrics server stopped");
            }
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Metrics server thread unavailable");
    }
}

#[cfg(not(feature = "metrics"))]
fn spawn_metrics_server(port: u16, _metrics: Arc<SessionMetrics>) {
    warn!(port, "Built without the metrics feature, not serving metrics");
}
