// THEORY:
// The `session` module is the loop driver. It owns every piece of mutable loop
// state (pipeline, mode controller, recorder, frame-rate meter) in one struct and
// talks to the outside world only through three narrow traits: a `FrameSource`,
// a `DisplaySink` and an `InputSource`. The camera binary implements them with
// OpenCV; the tests implement them with scripted fakes.
//
// Scheduling is a single-threaded cooperative tick:
//
//   capture -> process -> render -> record -> poll one key -> apply it
//
// The key poll blocks for at most the configured interval and is also what paces
// the loop. Pausing runs a nested poll loop at the same interval that captures
// nothing until the pause key is seen again.

use crate::core_modules::frame_rate::FrameRateMeter;
use crate::core_modules::mode_controller::{KeyBindings, ModeController, ModeFlags, Transition};
use crate::core_modules::overlay::{self, ReticleStyle};
use crate::core_modules::recorder::Recorder;
use crate::error::{Result, TrackerError};
use crate::pipeline::{PipelineConfig, SelectionRule, TargetPosition, TrackingPipeline};
use image::{GrayImage, RgbImage};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Cycles per frame-rate measurement.
const FRAME_RATE_WINDOW: u32 = 1000;

/// Supplies successive color frames. Fails when the device stops delivering.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<RgbImage>;
}

/// The named windows the session may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Camera,
    Difference,
    Threshold,
}

impl Window {
    pub fn title(&self) -> &'static str {
        match self {
            Window::Camera => "Camera",
            Window::Difference => "Difference",
            Window::Threshold => "Threshold",
        }
    }
}

/// A frame handed to a display sink.
#[derive(Debug, Clone, Copy)]
pub enum DisplayFrame<'a> {
    /// The camera frame, with the reticle already drawn and an optional caption
    /// to be rendered at `anchor`.
    Color {
        frame: &'a RgbImage,
        caption: Option<&'a str>,
        anchor: TargetPosition,
    },
    Luma(&'a GrayImage),
}

/// Shows frames in named windows, creating them on first use.
pub trait DisplaySink {
    fn show(&mut self, window: Window, frame: DisplayFrame<'_>) -> Result<()>;
    fn close(&mut self, window: Window) -> Result<()>;
    fn close_all(&mut self) -> Result<()>;
}

/// Non-blocking key input with a bounded wait.
pub trait InputSource {
    fn poll_key(&mut self, timeout: Duration) -> Option<i32>;
}

/// Everything needed to start a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub camera_index: i32,
    pub poll_interval: Duration,
    pub log_path: PathBuf,
    pub author: String,
    pub bindings: KeyBindings,
    pub pipeline: PipelineConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            poll_interval: Duration::from_millis(50),
            log_path: PathBuf::from("tracking_log.csv"),
            author: "unknown".to_string(),
            bindings: KeyBindings::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `MR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `MR_*` name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        override_parsed(&lookup, "MR_CAMERA", &mut config.camera_index)?;
        override_parsed(&lookup, "MR_WIDTH", &mut config.pipeline.image_width)?;
        override_parsed(&lookup, "MR_HEIGHT", &mut config.pipeline.image_height)?;
        override_parsed(&lookup, "MR_THRESHOLD", &mut config.pipeline.threshold_level)?;
        override_parsed(&lookup, "MR_BLUR", &mut config.pipeline.blur_size)?;

        let mut poll_ms = config.poll_interval.as_millis() as u64;
        override_parsed(&lookup, "MR_POLL_MS", &mut poll_ms)?;
        config.poll_interval = Duration::from_millis(poll_ms);

        if let Some(rule) = lookup("MR_SELECT") {
            config.pipeline.selection_rule = match rule.trim() {
                "last" => SelectionRule::LastFound,
                "largest" => SelectionRule::LargestArea,
                other => {
                    return Err(TrackerError::InvalidConfig(format!(
                        "MR_SELECT must be `last` or `largest`, got `{other}`"
                    )));
                }
            };
        }
        if let Some(path) = lookup("MR_LOG") {
            config.log_path = PathBuf::from(path);
        }
        if let Some(author) = lookup("MR_AUTHOR") {
            config.author = author;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(TrackerError::InvalidConfig(
                "poll interval must be at least 1 ms".to_string(),
            ));
        }
        self.pipeline.validate()
    }

    /// Nominal cycle rate implied by the poll interval, for the log header.
    pub fn nominal_frame_rate(&self) -> u32 {
        let millis = self.poll_interval.as_millis().max(1);
        (1000 / millis) as u32
    }
}

fn override_parsed<F, T>(lookup: &F, name: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *target = raw.trim().parse().map_err(|_| {
            TrackerError::InvalidConfig(format!("{name} has an unparseable value `{raw}`"))
        })?;
    }
    Ok(())
}

/// Whether the loop should keep going after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Terminate,
}

/// Final state handed back when a session ends.
#[derive(Debug)]
pub struct SessionSummary<W> {
    pub frames_processed: u64,
    pub position: TargetPosition,
    pub flags: ModeFlags,
    pub frame_rate: Option<f64>,
    /// The recording log's writer, flushed.
    pub log: W,
}

pub struct Session<S, D, I, W>
where
    S: FrameSource,
    D: DisplaySink,
    I: InputSource,
    W: Write,
{
    source: S,
    display: D,
    input: I,
    recorder: Recorder<W>,
    pipeline: TrackingPipeline,
    controller: ModeController,
    reticle: ReticleStyle,
    poll_interval: Duration,
    frame_rate: FrameRateMeter,
    frames_processed: u64,
}

impl<S, D, I, W> Session<S, D, I, W>
where
    S: FrameSource,
    D: DisplaySink,
    I: InputSource,
    W: Write,
{
    pub fn new(
        config: &SessionConfig,
        source: S,
        display: D,
        input: I,
        recorder: Recorder<W>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            display,
            input,
            recorder,
            pipeline: TrackingPipeline::new(config.pipeline.clone())?,
            controller: ModeController::new(config.bindings.clone()),
            reticle: ReticleStyle::default(),
            poll_interval: config.poll_interval,
            frame_rate: FrameRateMeter::new(FRAME_RATE_WINDOW),
            frames_processed: 0,
        })
    }

    /// Prints the legend and primes the background model with a first frame.
    pub fn start(&mut self) -> Result<()> {
        println!("{}", self.controller.bindings().legend());
        let first = self.source.next_frame()?;
        self.pipeline.prime(&first)?;
        info!(
            width = first.width(),
            height = first.height(),
            "background primed, entering main loop"
        );
        Ok(())
    }

    /// One full cycle: capture, process, render, record, then poll and apply one key.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let flags = self.controller.flags();

        let mut frame = self.source.next_frame()?;
        let report = self.pipeline.process(&frame, flags.tracking_enabled)?;
        self.frames_processed += 1;

        let caption = if flags.tracking_enabled {
            let position = report.position;
            let tracker = self.pipeline.tracker();
            debug!(
                x = position.x,
                y = position.y,
                lock = tracker.has_lock(),
                detections = tracker.detections(),
                frames_since_seen = tracker.frames_since_seen(),
                "X: {}   Y: {}",
                position.x,
                position.y
            );
            overlay::draw_reticle(&mut frame, position, &self.reticle);

            if flags.recording_enabled {
                self.recorder.record(position)?;
            }
            Some(overlay::caption(position))
        } else {
            None
        };

        self.display.show(
            Window::Camera,
            DisplayFrame::Color {
                frame: &frame,
                caption: caption.as_deref(),
                anchor: report.position,
            },
        )?;
        if flags.show_difference {
            self.display
                .show(Window::Difference, DisplayFrame::Luma(&report.motion.difference))?;
        }
        if flags.show_threshold {
            self.display
                .show(Window::Threshold, DisplayFrame::Luma(&report.motion.mask))?;
        }

        if let Some(rate) = self.frame_rate.tick() {
            info!(fps = rate, "frame rate");
        }

        let key = self.input.poll_key(self.poll_interval);
        self.apply_key(key)
    }

    /// Runs `start` and then ticks until terminated, cleaning up on the way out.
    pub fn run(mut self) -> Result<SessionSummary<W>> {
        self.start()?;
        while self.tick()? == TickOutcome::Continue {}
        self.finish()
    }

    /// Closes every window and flushes the recording log.
    pub fn finish(mut self) -> Result<SessionSummary<W>> {
        self.display.close_all()?;
        info!(frames = self.frames_processed, "session finished");
        Ok(SessionSummary {
            frames_processed: self.frames_processed,
            position: self.pipeline.position(),
            flags: self.controller.flags(),
            frame_rate: self.frame_rate.rate(),
            log: self.recorder.finish()?,
        })
    }

    fn apply_key(&mut self, key: Option<i32>) -> Result<TickOutcome> {
        let transition = self.controller.handle_key(key);
        if let Some(message) = transition.message() {
            println!("{message}");
        }

        match transition {
            Transition::Terminated => {
                info!("terminate key received");
                return Ok(TickOutcome::Terminate);
            }
            Transition::ThresholdViewToggled(false) => self.display.close(Window::Threshold)?,
            Transition::DifferenceViewToggled(false) => self.display.close(Window::Difference)?,
            Transition::RecordingToggled(enabled) => {
                self.recorder.restart_sequence();
                info!(enabled, "recording toggled");
            }
            Transition::TrackingToggled(enabled) => info!(enabled, "tracking toggled"),
            Transition::MenuRequested => println!("{}", self.controller.bindings().legend()),
            Transition::Paused => self.wait_while_paused(),
            Transition::ThresholdViewToggled(true)
            | Transition::DifferenceViewToggled(true)
            | Transition::Resumed
            | Transition::Ignored => {}
        }
        Ok(TickOutcome::Continue)
    }

    /// Polls at the usual interval, capturing nothing, until the pause key comes back.
    fn wait_while_paused(&mut self) {
        info!("paused");
        loop {
            let key = self.input.poll_key(self.poll_interval);
            let transition = self.controller.handle_key(key);
            if transition == Transition::Resumed {
                if let Some(message) = transition.message() {
                    println!("{message}");
                }
                info!("resumed");
                return;
            }
        }
    }

    pub fn flags(&self) -> ModeFlags {
        self.controller.flags()
    }

    pub fn position(&self) -> TargetPosition {
        self.pipeline.position()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_the_reference_setup() {
        let config = SessionConfig::default();
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.nominal_frame_rate(), 20);
        assert_eq!(config.pipeline.image_width, 1280);
        assert_eq!(config.pipeline.image_height, 720);
        assert_eq!(config.pipeline.threshold_level, 35);
        assert_eq!(config.pipeline.blur_size, 15);
        assert_eq!(config.pipeline.selection_rule, SelectionRule::LastFound);
    }

    #[test]
    fn no_overrides_gives_defaults() {
        let config = SessionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("MR_CAMERA", "2"),
            ("MR_WIDTH", "640"),
            ("MR_HEIGHT", " 480 "),
            ("MR_POLL_MS", "25"),
            ("MR_THRESHOLD", "20"),
            ("MR_BLUR", "9"),
            ("MR_SELECT", "largest"),
            ("MR_LOG", "/tmp/run.csv"),
            ("MR_AUTHOR", "Ada"),
        ]))
        .unwrap();

        assert_eq!(config.camera_index, 2);
        assert_eq!((config.pipeline.image_width, config.pipeline.image_height), (640, 480));
        assert_eq!(config.nominal_frame_rate(), 40);
        assert_eq!(config.pipeline.threshold_level, 20);
        assert_eq!(config.pipeline.blur_size, 9);
        assert_eq!(config.pipeline.selection_rule, SelectionRule::LargestArea);
        assert_eq!(config.log_path, PathBuf::from("/tmp/run.csv"));
        assert_eq!(config.author, "Ada");
    }

    #[test]
    fn bad_values_are_reported() {
        for pairs in [
            [("MR_THRESHOLD", "300")],
            [("MR_BLUR", "8")],
            [("MR_SELECT", "biggest")],
            [("MR_POLL_MS", "0")],
            [("MR_CAMERA", "front")],
        ] {
            let err = SessionConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, TrackerError::InvalidConfig(_)), "{pairs:?}");
        }
    }

    #[test]
    fn window_titles_are_distinct() {
        let titles = [Window::Camera, Window::Difference, Window::Threshold].map(|w| w.title());
        assert_eq!(titles, ["Camera", "Difference", "Threshold"]);
    }
}
