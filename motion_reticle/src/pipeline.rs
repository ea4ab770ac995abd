// THEORY:
// The `pipeline` module is the top-level API of the tracking engine. It chains the
// stages into one call per frame:
//
//   color frame -> MotionExtractor -> (tracking on) BlobSelector -> Tracker
//
// The extractor runs on every frame so its background model never falls behind;
// region extraction and the tracker update only run while tracking is enabled.
// With tracking off the reported position is whatever the tracker last held.

use crate::core_modules::blob_selector::blob_selector;
use crate::core_modules::motion_extractor::MotionExtractor;
use crate::core_modules::tracker::Tracker;
use crate::error::{Result, TrackerError};
use image::RgbImage;

// Re-export key data structures for the public API.
pub use crate::core_modules::blob_selector::SelectionRule;
pub use crate::core_modules::motion_extractor::MotionFrames;
pub use crate::core_modules::region::{BoundingBox, Region};
pub use crate::core_modules::tracker::TargetPosition;

/// Configuration for the TrackingPipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub image_width: u32,
    pub image_height: u32,
    /// Difference level (0..255) at or above which a pixel counts as moving.
    pub threshold_level: u8,
    /// Side of the square box blur kernel. Must be odd.
    pub blur_size: u32,
    pub selection_rule: SelectionRule,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_width: 1280,
            image_height: 720,
            threshold_level: 35,
            blur_size: 15,
            selection_rule: SelectionRule::LastFound,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(TrackerError::InvalidConfig(format!(
                "frame size {}x{} is empty",
                self.image_width, self.image_height
            )));
        }
        if self.blur_size == 0 || self.blur_size % 2 == 0 {
            return Err(TrackerError::InvalidConfig(format!(
                "blur size must be odd and positive, got {}",
                self.blur_size
            )));
        }
        Ok(())
    }
}

/// The result of pushing one frame through the pipeline.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub motion: MotionFrames,
    /// External regions in extraction order. Empty while tracking is disabled.
    pub regions: Vec<Region>,
    /// The selected region's box, if tracking ran and found one.
    pub detection: Option<BoundingBox>,
    /// Position to render and record for this frame.
    pub position: TargetPosition,
}

pub struct TrackingPipeline {
    extractor: MotionExtractor,
    tracker: Tracker,
    config: PipelineConfig,
}

impl TrackingPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: MotionExtractor::new(&config),
            tracker: Tracker::new(),
            config,
        })
    }

    /// Seeds the background model with a frame that is not analyzed.
    pub fn prime(&mut self, frame: &RgbImage) -> Result<()> {
        self.extractor.prime(frame)
    }

    pub fn process(&mut self, frame: &RgbImage, tracking_enabled: bool) -> Result<FrameReport> {
        // Stage 1: Temporal Analysis
        let motion = self.extractor.extract(frame)?;

        if !tracking_enabled {
            return Ok(FrameReport {
                motion,
                regions: Vec::new(),
                detection: None,
                position: self.tracker.position(),
            });
        }

        // Stage 2: Spatial Grouping
        let regions = blob_selector::find_external_regions(&motion.mask);
        let detection = blob_selector::select_region(&regions, self.config.selection_rule)
            .map(|region| region.bounding_box);

        // Stage 3: Position State
        let position = self.tracker.update(detection.as_ref());
        tracing::trace!(regions = regions.len(), ?detection, "frame analyzed");

        Ok(FrameReport {
            motion,
            regions,
            detection,
            position,
        })
    }

    pub fn position(&self) -> TargetPosition {
        self.tracker.position()
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
