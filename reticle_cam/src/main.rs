use anyhow::{Context, anyhow, bail};
use image::{GrayImage, RgbImage};
use motion_reticle::core_modules::recorder::{LogHeader, Recorder};
use motion_reticle::session::{
    DisplayFrame, DisplaySink, FrameSource, InputSource, Session, SessionConfig, Window,
};
use motion_reticle::{Result, TrackerError};
use opencv::{
    core::{self, Mat, Point, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::collections::HashSet;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}. Closing app!");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<()> {
    // --- 1. Configuration ---
    let mut config = SessionConfig::from_env()?;

    // --- 2. Camera ---
    let source = CameraSource::open(
        config.camera_index,
        config.pipeline.image_width,
        config.pipeline.image_height,
    )?;
    // The driver may have picked a different resolution than the one requested.
    config.pipeline.image_width = source.width;
    config.pipeline.image_height = source.height;

    // --- 3. Recording log ---
    let header = LogHeader::today(config.nominal_frame_rate(), &config.author);
    let recorder = Recorder::create(&config.log_path, &header)?;

    // --- 4. Main loop ---
    let session = Session::new(&config, source, HighGuiDisplay::default(), HighGuiInput, recorder)?;
    let summary = session.run()?;

    info!(
        frames = summary.frames_processed,
        fps = ?summary.frame_rate,
        "clean shutdown"
    );
    Ok(())
}

/// A V4L/DirectShow/AVFoundation camera opened through OpenCV.
struct CameraSource {
    capture: VideoCapture,
    width: u32,
    height: u32,
}

impl CameraSource {
    fn open(index: i32, width: u32, height: u32) -> Result<Self> {
        let unavailable = || TrackerError::DeviceUnavailable { index };

        let mut capture = VideoCapture::new(index, videoio::CAP_ANY).map_err(|_| unavailable())?;
        if !capture.is_opened().unwrap_or(false) {
            return Err(unavailable());
        }

        // Resolution is best effort: a refusal is logged, not fatal.
        for (prop, value) in [
            (videoio::CAP_PROP_FRAME_WIDTH, width),
            (videoio::CAP_PROP_FRAME_HEIGHT, height),
        ] {
            match capture.set(prop, value as f64) {
                Ok(true) => {}
                Ok(false) => warn!(prop, value, "camera ignored resolution request"),
                Err(e) => warn!(prop, value, error = %e, "camera rejected resolution request"),
            }
        }

        let actual_width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(|_| unavailable())? as u32;
        let actual_height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(|_| unavailable())? as u32;
        info!(index, width = actual_width, height = actual_height, "camera opened");

        Ok(Self {
            capture,
            width: actual_width,
            height: actual_height,
        })
    }

    fn grab(&mut self) -> anyhow::Result<RgbImage> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            bail!("camera returned no frame");
        }

        // OpenCV hands out BGR; the pipeline works on RGB.
        let mut rgb = Mat::default();
        imgproc::cvt_color(&frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
        let size = rgb.size()?;
        let data = rgb.data_bytes()?.to_vec();
        RgbImage::from_raw(size.width as u32, size.height as u32, data)
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", size.width, size.height))
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<RgbImage> {
        self.grab()
            .map_err(|e| TrackerError::Capture(format!("{e:#}")))
    }
}

/// HighGUI windows, created lazily on first show.
#[derive(Default)]
struct HighGuiDisplay {
    open: HashSet<Window>,
}

impl HighGuiDisplay {
    fn ensure_open(&mut self, window: Window) -> anyhow::Result<()> {
        if self.open.insert(window) {
            highgui::named_window(window.title(), highgui::WINDOW_AUTOSIZE)?;
            if window == Window::Camera {
                highgui::move_window(window.title(), 0, 0)?;
            }
        }
        Ok(())
    }

    fn render(&mut self, window: Window, frame: DisplayFrame<'_>) -> anyhow::Result<()> {
        self.ensure_open(window)?;
        let mat = match frame {
            DisplayFrame::Color {
                frame,
                caption,
                anchor,
            } => {
                let mut bgr = color_to_mat(frame)?;
                if let Some(text) = caption {
                    imgproc::put_text(
                        &mut bgr,
                        text,
                        Point::new(anchor.x, anchor.y),
                        imgproc::FONT_HERSHEY_PLAIN,
                        1.0,
                        Scalar::new(255.0, 0.0, 0.0, 0.0),
                        2,
                        imgproc::LINE_8,
                        false,
                    )?;
                }
                bgr
            }
            DisplayFrame::Luma(frame) => luma_to_mat(frame)?,
        };
        highgui::imshow(window.title(), &mat).context("imshow")?;
        Ok(())
    }
}

impl DisplaySink for HighGuiDisplay {
    fn show(&mut self, window: Window, frame: DisplayFrame<'_>) -> Result<()> {
        self.render(window, frame)
            .map_err(|e| TrackerError::Display(format!("{}: {e:#}", window.title())))
    }

    fn close(&mut self, window: Window) -> Result<()> {
        if self.open.remove(&window) {
            highgui::destroy_window(window.title())
                .map_err(|e| TrackerError::Display(e.to_string()))?;
        }
        Ok(())
    }

    fn close_all(&mut self) -> Result<()> {
        self.open.clear();
        highgui::destroy_all_windows().map_err(|e| TrackerError::Display(e.to_string()))
    }
}

fn color_to_mat(frame: &RgbImage) -> anyhow::Result<Mat> {
    let size = core::Size::new(frame.width() as i32, frame.height() as i32);
    let mut rgb = Mat::new_size_with_default(size, core::CV_8UC3, Scalar::all(0.0))?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn luma_to_mat(frame: &GrayImage) -> anyhow::Result<Mat> {
    let size = core::Size::new(frame.width() as i32, frame.height() as i32);
    let mut gray = Mat::new_size_with_default(size, core::CV_8UC1, Scalar::all(0.0))?;
    gray.data_bytes_mut()?.copy_from_slice(frame.as_raw());
    Ok(gray)
}

/// Key polling through HighGUI's event loop, which also keeps the windows responsive.
struct HighGuiInput;

impl InputSource for HighGuiInput {
    fn poll_key(&mut self, timeout: Duration) -> Option<i32> {
        let millis = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        match highgui::wait_key(millis) {
            Ok(key) if key >= 0 => Some(key & 0xFF),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "key poll failed");
                None
            }
        }
    }
}
